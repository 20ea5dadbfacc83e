//! Pipelines and the execution engine.
//!
//! A [`Pipeline`] is built once from a query and defaults, then executed any
//! number of times, concurrently if needed. Each call to
//! [`Pipeline::execute`] walks the same stages:
//!
//! 1. resolve the sink (encoder or callback) and merge the encode options;
//! 2. convert the input with the pipeline's marshaling strategy;
//! 3. convert the variables and compile the query against their sorted names;
//! 4. stream results to the sink, checking the context between results.
//!
//! Every error ends the call. No result is delivered after an error.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::context::{Context, Interrupt};
use crate::encode::{Encoder, JsonEncoder, YamlEncoder};
use crate::error::{ConversionError, Error, QueryError, TimeoutError};
use crate::marshal::{Input, InputMarshaler, MarshalStrategy};
use crate::normalize::Normalizer;
use crate::options::{
    Callback, CompilerOption, EncodeOption, ExecuteOptions, Format, JsonStyle,
};
use crate::query::Query;
use crate::value::Value;

#[cfg(feature = "message")]
use crate::marshal::message::{MessageMarshaler, MessageOptions};

/// Target label for input conversion errors.
const INPUT_TARGET: &str = "jq-compatible";

/// A reusable query pipeline.
///
/// ```
/// use jqpipe::{Context, ExecuteOptions, Format, Pipeline};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Item { name: &'static str, active: bool }
///
/// let pipeline = Pipeline::new(".[] | select(.active) | .name")?;
/// let items = vec![
///     Item { name: "a", active: true },
///     Item { name: "b", active: false },
/// ];
///
/// let mut out = Vec::new();
/// pipeline.execute(
///     &Context::background(),
///     &items,
///     ExecuteOptions::new().writer(&mut out, Format::Json),
/// )?;
/// assert_eq!(out, b"\"a\"\n");
/// # Ok::<(), jqpipe::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    query: Option<Query>,
    encode_options: Vec<EncodeOption>,
    strategy: MarshalStrategy,
    json_style: JsonStyle,
}

/// Builder for [`Pipeline`]. Calls apply in order; list options append.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    query: String,
    encode_options: Vec<EncodeOption>,
    compiler_options: Vec<CompilerOption>,
    strategy: MarshalStrategy,
    json_style: JsonStyle,
}

impl PipelineBuilder {
    /// The jq filter to run. An empty query passes the input through.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Encode options applied to every execution, before per-call options.
    pub fn default_encode_options(mut self, options: impl IntoIterator<Item = EncodeOption>) -> Self {
        self.encode_options.extend(options);
        self
    }

    pub fn compiler_options(mut self, options: impl IntoIterator<Item = CompilerOption>) -> Self {
        self.compiler_options.extend(options);
        self
    }

    /// Convert inputs and variables with `marshaler` instead of the default
    /// normalizer.
    pub fn input_marshaler(mut self, marshaler: impl InputMarshaler + 'static) -> Self {
        self.strategy = MarshalStrategy::Custom(Arc::new(marshaler));
        self
    }

    /// Render protobuf `DynamicMessage` inputs with the protobuf JSON mapping.
    #[cfg(feature = "message")]
    pub fn message_input(self, options: MessageOptions) -> Self {
        self.message_marshaler(MessageMarshaler::new(options))
    }

    /// Render protobuf inputs with a configured [`MessageMarshaler`].
    #[cfg(feature = "message")]
    pub fn message_marshaler(mut self, marshaler: MessageMarshaler) -> Self {
        self.strategy = MarshalStrategy::Message(marshaler);
        self
    }

    /// JSON layout used when an execution does not choose one.
    pub fn default_json_style(mut self, style: JsonStyle) -> Self {
        self.json_style = style;
        self
    }

    /// Validate the query and produce the pipeline.
    pub fn build(self) -> Result<Pipeline, Error> {
        let query = if self.query.is_empty() {
            None
        } else {
            Some(Query::parse(&self.query, &self.compiler_options)?)
        };
        tracing::debug!(
            query = %self.query,
            strategy = self.strategy.name(),
            "pipeline built"
        );
        Ok(Pipeline {
            query,
            encode_options: self.encode_options,
            strategy: self.strategy,
            json_style: self.json_style,
        })
    }
}

/// Where the results of one execution go.
enum Sink<'a> {
    Encoder(Box<dyn Encoder + 'a>),
    Callback(Callback<'a>),
}

impl Sink<'_> {
    fn deliver(&mut self, value: Value) -> Result<(), Error> {
        let result = match self {
            Sink::Encoder(encoder) => encoder.encode(&value),
            Sink::Callback(callback) => callback(value),
        };
        result.map_err(Error::Sink)
    }

    fn kind(&self) -> &'static str {
        match self {
            Sink::Encoder(_) => "encoder",
            Sink::Callback(_) => "callback",
        }
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// A pipeline running `query` with default settings.
    pub fn new(query: impl Into<String>) -> Result<Pipeline, Error> {
        Pipeline::builder().query(query).build()
    }

    /// The query text, or `None` for a pass-through pipeline.
    pub fn query(&self) -> Option<&str> {
        self.query.as_ref().map(Query::text)
    }

    /// Run the pipeline on `input`, delivering every result to the sink
    /// configured in `options`.
    ///
    /// Timeout and cancellation are checked between results only; see
    /// [`ExecuteOptions::timeout`].
    pub fn execute(
        &self,
        ctx: &Context,
        input: &dyn Input,
        mut options: ExecuteOptions<'_>,
    ) -> Result<(), Error> {
        let encode_options: Vec<EncodeOption> = self
            .encode_options
            .iter()
            .cloned()
            .chain(options.encode_options.drain(..))
            .collect();

        let mut sink = self.resolve_sink(&mut options, &encode_options)?;
        let normalizer = Normalizer::new(&encode_options);

        tracing::debug!(
            query = self.query().unwrap_or(""),
            sink = sink.kind(),
            variables = options.variables.len(),
            timeout = ?options.timeout,
            "executing pipeline"
        );

        let value = self
            .strategy
            .marshal(input, &normalizer)
            .map_err(|e| ConversionError::new(input.type_name(), INPUT_TARGET, e))?;

        let timeout = options.timeout;
        let ctx = if timeout > Duration::ZERO {
            ctx.with_timeout(timeout)
        } else {
            ctx.clone()
        };

        let Some(query) = &self.query else {
            check(&ctx, "", timeout)?;
            tracing::trace!("delivering input unchanged");
            return sink.deliver(value);
        };

        let mut variables = BTreeMap::new();
        for (name, var) in &options.variables {
            let converted = self
                .strategy
                .marshal(var.as_ref(), &normalizer)
                .map_err(|e| ConversionError::new(var.type_name(), format!("variable {}", name), e))?;
            variables.insert(name.clone(), converted);
        }

        let compiled = query.compile(variables)?;
        let mut results = compiled.run(value);
        let mut delivered = 0usize;
        loop {
            check(&ctx, query.text(), timeout)?;
            let Some(result) = results.next() else {
                break;
            };
            let value = result.map_err(|e| QueryError::runtime(query.text(), e))?;
            tracing::trace!(index = delivered, "delivering result");
            sink.deliver(value)?;
            delivered += 1;
        }

        tracing::debug!(results = delivered, "pipeline finished");
        Ok(())
    }

    /// Pick the encoder or callback for this call and configure the encoder.
    fn resolve_sink<'a>(
        &self,
        options: &mut ExecuteOptions<'a>,
        encode_options: &[EncodeOption],
    ) -> Result<Sink<'a>, Error> {
        let writer = options.writer.take();
        let encoder = match (options.encoder.take(), writer) {
            (Some(encoder), _) => Some(encoder),
            (None, Some((writer, format))) => {
                let (pretty, raw) = options.json_flags(self.json_style);
                let encoder: Box<dyn Encoder + 'a> = match format {
                    Format::Json => Box::new(JsonEncoder::new(writer).pretty(pretty).raw(raw)),
                    Format::Yaml => Box::new(YamlEncoder::new(writer)),
                };
                Some(encoder)
            }
            (None, None) => None,
        };

        match (encoder, options.callback.take()) {
            (Some(_), Some(_)) => Err(Error::Config(
                "cannot specify both encoder and callback".to_string(),
            )),
            (None, None) => Err(Error::Config(
                "no output method specified: use writer, encoder, or callback".to_string(),
            )),
            (Some(mut encoder), None) => {
                encoder.set_options(encode_options);
                Ok(Sink::Encoder(encoder))
            }
            (None, Some(callback)) => Ok(Sink::Callback(callback)),
        }
    }
}

/// Map a context interrupt to the error reported for it.
fn check(ctx: &Context, query: &str, timeout: Duration) -> Result<(), Error> {
    match ctx.check() {
        Ok(()) => Ok(()),
        Err(Interrupt::DeadlineExceeded) => {
            tracing::debug!(?timeout, "execution deadline exceeded");
            Err(TimeoutError { duration: timeout }.into())
        }
        Err(Interrupt::Cancelled) => Err(QueryError::cancelled(query).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_pipeline_is_send_sync() {
        assert_send_sync::<Pipeline>();
    }

    #[test]
    fn test_build_rejects_bad_query() {
        let err = Pipeline::new(".foo[").unwrap_err();
        let query = err.as_query().unwrap();
        assert_eq!(query.query, ".foo[");
        assert_eq!(query.message, "failed to parse query");
    }

    #[test]
    fn test_empty_query_is_pass_through() {
        let pipeline = Pipeline::new("").unwrap();
        assert_eq!(pipeline.query(), None);
    }

    #[test]
    fn test_missing_sink() {
        let pipeline = Pipeline::new(".").unwrap();
        let err = pipeline
            .execute(&Context::background(), &1i64, ExecuteOptions::new())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "no output method specified: use writer, encoder, or callback"
        );
    }

    #[test]
    fn test_writer_and_callback_conflict() {
        let pipeline = Pipeline::new(".").unwrap();
        let mut out = Vec::new();
        let err = pipeline
            .execute(
                &Context::background(),
                &1i64,
                ExecuteOptions::new()
                    .writer(&mut out, Format::Json)
                    .callback(|_| Ok::<(), Error>(())),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot specify both encoder and callback");
        assert!(out.is_empty());
    }

    #[test]
    fn test_cancelled_context() {
        let pipeline = Pipeline::new(".[]").unwrap();
        let ctx = Context::background();
        ctx.cancel();
        let mut seen = 0;
        let err = pipeline
            .execute(
                &ctx,
                &vec![1i64, 2],
                ExecuteOptions::new().callback(|_| {
                    seen += 1;
                    Ok::<(), Error>(())
                }),
            )
            .unwrap_err();
        let query = err.as_query().unwrap();
        assert_eq!(query.message, "execution error");
        assert_eq!(query.cause, crate::error::QueryCause::Cancelled);
        assert_eq!(seen, 0);
    }
}
