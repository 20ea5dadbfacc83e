//! Pipeline errors.
//!
//! Every failure of [`Pipeline::build`](crate::PipelineBuilder::build) or
//! [`Pipeline::execute`](crate::Pipeline::execute) is reported as an [`Error`].
//! The variants carry enough context to tell apart a broken query, an input
//! that could not be converted, an expired deadline and a misconfigured call.

use core::fmt;
use std::time::Duration;

/// Boxed error returned by caller-supplied hooks (encoders, callbacks, marshalers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while building or executing a pipeline.
#[derive(Debug)]
pub enum Error {
    /// The query failed to parse, compile or evaluate.
    Query(QueryError),

    /// The input or a variable could not be converted into the value model.
    Conversion(ConversionError),

    /// The execution deadline passed before all results were delivered.
    Timeout(TimeoutError),

    /// The options passed to `build` or `execute` are inconsistent.
    Config(String),

    /// The encoder or callback rejected a result. Returned unchanged.
    Sink(BoxError),
}

impl Error {
    /// Returns the query error, if this is one.
    pub fn as_query(&self) -> Option<&QueryError> {
        match self {
            Error::Query(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the conversion error, if this is one.
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            Error::Conversion(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the timeout error, if this is one.
    pub fn as_timeout(&self) -> Option<&TimeoutError> {
        match self {
            Error::Timeout(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the error produced by the sink, if the sink failed.
    pub fn as_sink(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Error::Sink(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    /// Consumes the error, returning the sink's error if the sink failed.
    pub fn into_sink(self) -> Result<BoxError, Self> {
        match self {
            Error::Sink(e) => Ok(e),
            other => Err(other),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Query(e) => e.fmt(f),
            Error::Conversion(e) => e.fmt(f),
            Error::Timeout(e) => e.fmt(f),
            Error::Config(msg) => f.write_str(msg),
            Error::Sink(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e.source(),
            Error::Conversion(e) => e.source(),
            Error::Timeout(_) | Error::Config(_) => None,
            Error::Sink(e) => e.source(),
        }
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        Error::Query(e)
    }
}

impl From<ConversionError> for Error {
    fn from(e: ConversionError) -> Self {
        Error::Conversion(e)
    }
}

impl From<TimeoutError> for Error {
    fn from(e: TimeoutError) -> Self {
        Error::Timeout(e)
    }
}

// ============================================================================
// QueryError
// ============================================================================

/// A failure to parse, compile or run a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryError {
    /// The query text as given to the pipeline.
    pub query: String,
    /// Short description of the stage that failed.
    pub message: &'static str,
    /// What went wrong.
    pub cause: QueryCause,
}

impl QueryError {
    pub(crate) fn parse(query: &str, errors: Vec<String>) -> Self {
        QueryError {
            query: query.to_string(),
            message: "failed to parse query",
            cause: QueryCause::Syntax(errors),
        }
    }

    pub(crate) fn compile(query: &str, errors: Vec<String>) -> Self {
        QueryError {
            query: query.to_string(),
            message: "failed to compile query",
            cause: QueryCause::Compile(errors),
        }
    }

    pub(crate) fn runtime(query: &str, error: String) -> Self {
        QueryError {
            query: query.to_string(),
            message: "execution error",
            cause: QueryCause::Runtime(error),
        }
    }

    pub(crate) fn cancelled(query: &str) -> Self {
        QueryError {
            query: query.to_string(),
            message: "execution error",
            cause: QueryCause::Cancelled,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jq query error in '{}': {}", self.query, self.message)
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// The underlying reason for a [`QueryError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCause {
    /// The query text is not valid syntax.
    Syntax(Vec<String>),
    /// The query refers to unknown filters or variables.
    Compile(Vec<String>),
    /// The engine raised an error while producing results.
    Runtime(String),
    /// The caller's context was cancelled.
    Cancelled,
}

impl fmt::Display for QueryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryCause::Syntax(errs) | QueryCause::Compile(errs) => f.write_str(&errs.join("; ")),
            QueryCause::Runtime(msg) => f.write_str(msg),
            QueryCause::Cancelled => f.write_str("context cancelled"),
        }
    }
}

impl std::error::Error for QueryCause {}

// ============================================================================
// ConversionError
// ============================================================================

/// A value that could not be converted into the query engine's value model.
#[derive(Debug)]
pub struct ConversionError {
    /// Rust type name of the offending value.
    pub type_name: &'static str,
    /// What the value was being converted for, e.g. `jq-compatible` or `variable name`.
    pub target: String,
    /// The error reported by the marshaling strategy.
    pub cause: BoxError,
}

impl ConversionError {
    pub(crate) fn new(type_name: &'static str, target: impl Into<String>, cause: BoxError) -> Self {
        ConversionError {
            type_name,
            target: target.into(),
            cause,
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to convert {} to {}: {}",
            self.type_name, self.target, self.cause
        )
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref())
    }
}

// ============================================================================
// TimeoutError
// ============================================================================

/// The execution deadline passed before the result stream was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError {
    /// The timeout that was in effect.
    pub duration: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution timeout after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let err = QueryError::parse(".foo[", vec!["unexpected end of input".into()]);
        assert_eq!(
            err.to_string(),
            "jq query error in '.foo[': failed to parse query"
        );
        assert_eq!(err.cause.to_string(), "unexpected end of input");
    }

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError::new("Widget", "variable limit", "unsupported key".into());
        assert_eq!(
            err.to_string(),
            "failed to convert Widget to variable limit: unsupported key"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = TimeoutError {
            duration: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "execution timeout after 50ms");

        let err = TimeoutError {
            duration: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "execution timeout after 30s");
    }

    #[test]
    fn test_sink_error_is_transparent() {
        let err = Error::Sink("disk full".into());
        assert_eq!(err.to_string(), "disk full");
        let inner = err.into_sink().unwrap();
        assert_eq!(inner.to_string(), "disk full");
    }

    #[test]
    fn test_accessors() {
        let err = Error::from(TimeoutError {
            duration: Duration::from_secs(1),
        });
        assert!(err.as_timeout().is_some());
        assert!(err.as_query().is_none());
        assert!(err.as_conversion().is_none());
        assert!(err.as_sink().is_none());
    }
}
