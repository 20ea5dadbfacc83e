//! Option types for building pipelines and configuring individual executions.
//!
//! Options are applied in the order they are given. List-valued options
//! (encode options, variables added one at a time) accumulate; scalar options
//! are overwritten by later calls.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::encode::Encoder;
use crate::error::BoxError;
use crate::marshal::Input;
use crate::value::Value;

/// Default per-execution timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output document format for [`ExecuteOptions::writer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// One JSON text per result.
    #[default]
    Json,
    /// One YAML document per result.
    Yaml,
}

// ============================================================================
// JsonStyle
// ============================================================================

/// Pipeline-level default JSON layout, combined with `|`.
///
/// `COMPACT` is the empty set. Per-call settings on [`ExecuteOptions`] take
/// precedence over this default.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JsonStyle(u8);

impl JsonStyle {
    /// Single-line output.
    pub const COMPACT: JsonStyle = JsonStyle(0);
    /// Two-space indented output.
    pub const PRETTY: JsonStyle = JsonStyle(1);
    /// Strings written without quotes.
    pub const RAW: JsonStyle = JsonStyle(1 << 1);

    pub const fn contains(self, other: JsonStyle) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_pretty(self) -> bool {
        self.contains(Self::PRETTY)
    }

    pub const fn is_raw(self) -> bool {
        self.contains(Self::RAW)
    }
}

impl BitOr for JsonStyle {
    type Output = JsonStyle;

    fn bitor(self, rhs: JsonStyle) -> JsonStyle {
        JsonStyle(self.0 | rhs.0)
    }
}

impl BitOrAssign for JsonStyle {
    fn bitor_assign(&mut self, rhs: JsonStyle) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for JsonStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_pretty(), self.is_raw()) {
            (false, false) => f.write_str("JsonStyle(COMPACT)"),
            (true, false) => f.write_str("JsonStyle(PRETTY)"),
            (false, true) => f.write_str("JsonStyle(RAW)"),
            (true, true) => f.write_str("JsonStyle(PRETTY | RAW)"),
        }
    }
}

// ============================================================================
// EncodeOption
// ============================================================================

/// Hook turning a normalized value of one type into encoded bytes.
///
/// The bytes are read back as JSON; output that is not valid JSON becomes a
/// string.
pub type MarshalFn = Arc<dyn Fn(&Value) -> Result<Vec<u8>, BoxError> + Send + Sync>;

/// Format-specific encoding options.
///
/// `Indent`, `IndentSequence` and `LiteralStyleIfMultiline` shape YAML output.
/// `CustomMarshaler` changes how values of a given type are normalized.
#[derive(Clone)]
pub enum EncodeOption {
    /// Spaces per nested YAML mapping level (default 2).
    Indent(usize),
    /// Indent sequences that are values of a mapping key (default off).
    IndentSequence(bool),
    /// Write multi-line strings as YAML literal blocks.
    LiteralStyleIfMultiline(bool),
    /// Replace the normalized form of values whose serde type name is
    /// `type_name`.
    CustomMarshaler {
        type_name: String,
        marshal: MarshalFn,
    },
}

impl EncodeOption {
    /// Register a custom marshaler for the serde type named `type_name`.
    ///
    /// The name is the one serde reports: the struct or enum identifier, or
    /// the value of `#[serde(rename = "...")]`.
    pub fn custom_marshaler<F>(type_name: impl Into<String>, marshal: F) -> Self
    where
        F: Fn(&Value) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        EncodeOption::CustomMarshaler {
            type_name: type_name.into(),
            marshal: Arc::new(marshal),
        }
    }
}

impl fmt::Debug for EncodeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeOption::Indent(n) => f.debug_tuple("Indent").field(n).finish(),
            EncodeOption::IndentSequence(on) => f.debug_tuple("IndentSequence").field(on).finish(),
            EncodeOption::LiteralStyleIfMultiline(on) => f
                .debug_tuple("LiteralStyleIfMultiline")
                .field(on)
                .finish(),
            EncodeOption::CustomMarshaler { type_name, .. } => f
                .debug_struct("CustomMarshaler")
                .field("type_name", type_name)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// CompilerOption
// ============================================================================

/// Options applied when a query is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerOption {
    /// Extra `def` statements made available to the query.
    Definitions(String),
    /// Bind `$ENV` to an object built from these pairs.
    Environ(Vec<(String, String)>),
}

impl CompilerOption {
    /// Bind `$ENV` to the current process environment.
    pub fn process_environ() -> Self {
        CompilerOption::Environ(std::env::vars().collect())
    }
}

// ============================================================================
// ExecuteOptions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JsonLayout {
    Compact,
    Pretty,
}

pub(crate) type Callback<'a> = Box<dyn FnMut(Value) -> Result<(), BoxError> + 'a>;

/// Per-call options for [`Pipeline::execute`](crate::Pipeline::execute).
///
/// Exactly one way of consuming results must be chosen: an encoder (given
/// directly or built from a writer and a [`Format`]) or a callback.
///
/// ```
/// use jqpipe::{ExecuteOptions, Format};
///
/// let mut out = Vec::new();
/// let opts = ExecuteOptions::new()
///     .writer(&mut out, Format::Yaml)
///     .variable("limit", 10i64);
/// # drop(opts);
/// ```
pub struct ExecuteOptions<'a> {
    pub(crate) writer: Option<(Box<dyn io::Write + 'a>, Format)>,
    pub(crate) encoder: Option<Box<dyn Encoder + 'a>>,
    pub(crate) callback: Option<Callback<'a>>,
    pub(crate) variables: BTreeMap<String, Box<dyn Input + 'a>>,
    pub(crate) timeout: Duration,
    pub(crate) encode_options: Vec<EncodeOption>,
    pub(crate) layout: Option<JsonLayout>,
    pub(crate) raw: bool,
}

impl<'a> ExecuteOptions<'a> {
    pub fn new() -> Self {
        ExecuteOptions {
            writer: None,
            encoder: None,
            callback: None,
            variables: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
            encode_options: Vec::new(),
            layout: None,
            raw: false,
        }
    }

    /// Write results to `writer` using the built-in encoder for `format`.
    ///
    /// Ignored when an explicit [`encoder`](Self::encoder) is also set.
    pub fn writer(mut self, writer: impl io::Write + 'a, format: Format) -> Self {
        self.writer = Some((Box::new(writer), format));
        self
    }

    /// Hand results to a caller-supplied encoder.
    pub fn encoder(mut self, encoder: impl Encoder + 'a) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    /// Hand each result to `callback`. An error stops the execution and is
    /// returned as [`Error::Sink`](crate::Error::Sink).
    pub fn callback<F, E>(mut self, mut callback: F) -> Self
    where
        F: FnMut(Value) -> Result<(), E> + 'a,
        E: Into<BoxError>,
    {
        self.callback = Some(Box::new(move |value| callback(value).map_err(Into::into)));
        self
    }

    /// Replace the set of query variables. Names are given without `$`.
    pub fn variables<K, V, I>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Input + 'a,
    {
        self.variables = variables
            .into_iter()
            .map(|(k, v)| (k.into(), Box::new(v) as Box<dyn Input + 'a>))
            .collect();
        self
    }

    /// Add or replace a single query variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Input + 'a) -> Self {
        self.variables.insert(name.into(), Box::new(value));
        self
    }

    /// Deadline for the whole execution. `Duration::ZERO` disables it.
    ///
    /// The deadline is checked before each result is pulled from the query,
    /// not while the engine computes one. A filter that runs a long time
    /// before yielding (or never yields) overruns it, and a sink that blocks
    /// past it is only reported once it returns.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Append encode options after the pipeline defaults.
    pub fn encode_options(mut self, options: impl IntoIterator<Item = EncodeOption>) -> Self {
        self.encode_options.extend(options);
        self
    }

    /// Single-line JSON. Once requested, [`pretty_json`](Self::pretty_json)
    /// has no effect.
    pub fn compact_json(mut self) -> Self {
        self.layout = Some(JsonLayout::Compact);
        self
    }

    /// Two-space indented JSON, unless compact output was requested.
    pub fn pretty_json(mut self) -> Self {
        if self.layout != Some(JsonLayout::Compact) {
            self.layout = Some(JsonLayout::Pretty);
        }
        self
    }

    /// Write string results without quotes. Other results are compact.
    pub fn raw_json(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Resolve the JSON layout against the pipeline default.
    pub(crate) fn json_flags(&self, default: JsonStyle) -> (bool, bool) {
        let pretty = match self.layout {
            Some(JsonLayout::Compact) => false,
            Some(JsonLayout::Pretty) => true,
            None => default.is_pretty(),
        };
        (pretty, self.raw || default.is_raw())
    }
}

impl Default for ExecuteOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecuteOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteOptions")
            .field("writer", &self.writer.as_ref().map(|(_, format)| format))
            .field("encoder", &self.encoder.is_some())
            .field("callback", &self.callback.is_some())
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .field("encode_options", &self.encode_options)
            .field("layout", &self.layout)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_style_bits() {
        assert!(!JsonStyle::COMPACT.is_pretty());
        assert!(!JsonStyle::COMPACT.is_raw());
        let style = JsonStyle::PRETTY | JsonStyle::RAW;
        assert!(style.is_pretty());
        assert!(style.is_raw());
        assert_eq!(format!("{:?}", style), "JsonStyle(PRETTY | RAW)");
    }

    #[test]
    fn test_compact_is_sticky() {
        let a = ExecuteOptions::new().compact_json().pretty_json();
        let b = ExecuteOptions::new().pretty_json().compact_json();
        assert_eq!(a.json_flags(JsonStyle::PRETTY), (false, false));
        assert_eq!(b.json_flags(JsonStyle::PRETTY), (false, false));
    }

    #[test]
    fn test_pipeline_default_is_weaker() {
        let opts = ExecuteOptions::new();
        assert_eq!(opts.json_flags(JsonStyle::PRETTY), (true, false));
        assert_eq!(opts.json_flags(JsonStyle::RAW), (false, true));

        let opts = ExecuteOptions::new().pretty_json();
        assert_eq!(opts.json_flags(JsonStyle::COMPACT), (true, false));
    }

    #[test]
    fn test_variables_replace_and_add() {
        let opts = ExecuteOptions::new()
            .variable("a", 1i64)
            .variables([("b", 2i64), ("c", 3i64)])
            .variable("d", "x".to_string());
        let names: Vec<_> = opts.variables.keys().cloned().collect();
        assert_eq!(names, ["b", "c", "d"]);
    }

    #[test]
    fn test_defaults() {
        let opts = ExecuteOptions::default();
        assert_eq!(opts.timeout, DEFAULT_TIMEOUT);
        assert!(opts.encode_options.is_empty());
        assert!(opts.writer.is_none() && opts.encoder.is_none() && opts.callback.is_none());
    }

    #[test]
    fn test_encode_option_debug() {
        let opt = EncodeOption::custom_marshaler("Point", |_| Ok(b"null".to_vec()));
        assert_eq!(format!("{:?}", opt), "CustomMarshaler { type_name: \"Point\", .. }");
        assert_eq!(format!("{:?}", EncodeOption::Indent(4)), "Indent(4)");
    }
}
