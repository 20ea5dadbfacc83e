//! Output encoders for pipeline results.
//!
//! An [`Encoder`] receives every result of a query, one at a time, and writes
//! it somewhere. Two built-in encoders cover the common formats:
//!
//! | Encoder | Document layout |
//! |---------|-----------------|
//! | [`JsonEncoder`] | one JSON text per result, each ending in `\n` |
//! | [`YamlEncoder`] | one block-style YAML document per result, `---` between documents |
//!
//! Both emit object keys in sorted order.
//!
//! Callers can plug in their own encoder through
//! [`ExecuteOptions::encoder`](crate::ExecuteOptions::encoder). The pipeline
//! hands it the merged encode options once, before the first result, via
//! [`Encoder::set_options`].

pub(crate) mod stream;

use std::io;

use crate::error::BoxError;
use crate::options::EncodeOption;
use crate::value::Value;

use stream::YamlStyle;

/// A sink that writes pipeline results.
pub trait Encoder {
    /// Encode one result.
    fn encode(&mut self, value: &Value) -> Result<(), BoxError>;

    /// Apply encode options before the first result. Ignored by default.
    fn set_options(&mut self, _options: &[EncodeOption]) {}
}

impl<E: Encoder + ?Sized> Encoder for &mut E {
    fn encode(&mut self, value: &Value) -> Result<(), BoxError> {
        (**self).encode(value)
    }

    fn set_options(&mut self, options: &[EncodeOption]) {
        (**self).set_options(options)
    }
}

impl<E: Encoder + ?Sized> Encoder for Box<E> {
    fn encode(&mut self, value: &Value) -> Result<(), BoxError> {
        (**self).encode(value)
    }

    fn set_options(&mut self, options: &[EncodeOption]) {
        (**self).set_options(options)
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Writes each result as a JSON text followed by a newline.
///
/// Compact by default. In raw mode string results are written verbatim and
/// every other result is written compactly, whatever the pretty setting.
#[derive(Debug)]
pub struct JsonEncoder<W> {
    writer: W,
    pretty: bool,
    raw: bool,
    buf: String,
}

impl<W: io::Write> JsonEncoder<W> {
    pub fn new(writer: W) -> Self {
        JsonEncoder {
            writer,
            pretty: false,
            raw: false,
            buf: String::new(),
        }
    }

    /// Indent nested values by two spaces per level.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Write string results without quotes or escaping.
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Encoder for JsonEncoder<W> {
    fn encode(&mut self, value: &Value) -> Result<(), BoxError> {
        self.buf.clear();
        match value {
            Value::String(s) if self.raw => self.buf.push_str(s),
            _ => {
                let indent = (self.pretty && !self.raw).then_some(2);
                stream::write_json(&mut self.buf, value, indent)?;
            }
        }
        self.buf.push('\n');
        self.writer.write_all(self.buf.as_bytes())?;
        Ok(())
    }
}

// ============================================================================
// YAML
// ============================================================================

/// Writes each result as a block-style YAML document.
///
/// Documents after the first are preceded by a `---` line, so N results
/// produce N-1 separators.
#[derive(Debug)]
pub struct YamlEncoder<W> {
    writer: W,
    style: YamlStyle,
    documents: usize,
    buf: String,
}

impl<W: io::Write> YamlEncoder<W> {
    pub fn new(writer: W) -> Self {
        YamlEncoder {
            writer,
            style: YamlStyle::default(),
            documents: 0,
            buf: String::new(),
        }
    }

    /// Apply encode options. Later options override earlier ones.
    pub fn with_options(mut self, options: &[EncodeOption]) -> Self {
        self.set_options(options);
        self
    }

    /// Number of documents written so far.
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> Encoder for YamlEncoder<W> {
    fn encode(&mut self, value: &Value) -> Result<(), BoxError> {
        self.buf.clear();
        if self.documents > 0 {
            self.buf.push_str("---\n");
        }
        stream::write_yaml(&mut self.buf, value, &self.style)?;
        self.buf.push('\n');
        self.writer.write_all(self.buf.as_bytes())?;
        self.documents += 1;
        Ok(())
    }

    fn set_options(&mut self, options: &[EncodeOption]) {
        for option in options {
            match option {
                EncodeOption::Indent(n) => self.style.indent = (*n).max(1),
                EncodeOption::IndentSequence(on) => self.style.indent_sequence = *on,
                EncodeOption::LiteralStyleIfMultiline(on) => self.style.literal_multiline = *on,
                EncodeOption::CustomMarshaler { .. } => {}
            }
        }
    }
}
