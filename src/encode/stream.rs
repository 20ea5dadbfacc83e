//! Text writers shared by the JSON and YAML encoders.
//!
//! Both writers stream a [`Value`] into any `core::fmt::Write` without building
//! an intermediate DOM. Object keys are always emitted in sorted order so the
//! output is stable regardless of how the value was built.

use core::fmt::Write;

use crate::value::Value;

// ============================================================================
// JSON
// ============================================================================

/// Write `value` as JSON.
///
/// `indent` of `None` writes compact JSON; `Some(n)` writes one element per
/// line indented by `n` spaces per level, with `": "` after keys.
pub(crate) fn write_json<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    indent: Option<usize>,
) -> core::fmt::Result {
    write_json_at(out, value, indent, 0)
}

fn write_json_at<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    indent: Option<usize>,
    depth: usize,
) -> core::fmt::Result {
    match value {
        Value::Null => out.write_str("null"),
        Value::Bool(true) => out.write_str("true"),
        Value::Bool(false) => out.write_str("false"),
        Value::Int(n) => write!(out, "{}", n),
        Value::BigInt(n) => write!(out, "{}", n),
        Value::Float(f) => {
            if f.is_nan() || f.is_infinite() {
                // JSON has no NaN or Infinity
                out.write_str("null")
            } else {
                write_float(out, *f)
            }
        }
        Value::String(s) => write_json_string(out, s),
        Value::Array(arr) => {
            if arr.is_empty() {
                return out.write_str("[]");
            }
            out.write_char('[')?;
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                newline_and_indent(out, indent, depth + 1)?;
                write_json_at(out, elem, indent, depth + 1)?;
            }
            newline_and_indent(out, indent, depth)?;
            out.write_char(']')
        }
        Value::Object(obj) => {
            if obj.is_empty() {
                return out.write_str("{}");
            }
            out.write_char('{')?;
            for (i, (key, val)) in sorted_entries(obj).into_iter().enumerate() {
                if i > 0 {
                    out.write_char(',')?;
                }
                newline_and_indent(out, indent, depth + 1)?;
                write_json_string(out, key)?;
                out.write_str(if indent.is_some() { ": " } else { ":" })?;
                write_json_at(out, val, indent, depth + 1)?;
            }
            newline_and_indent(out, indent, depth)?;
            out.write_char('}')
        }
    }
}

fn newline_and_indent<W: Write + ?Sized>(
    out: &mut W,
    indent: Option<usize>,
    depth: usize,
) -> core::fmt::Result {
    match indent {
        Some(step) => {
            out.write_char('\n')?;
            write_indent(out, step * depth)
        }
        None => Ok(()),
    }
}

/// Write a string as a JSON string literal with escaping.
pub(crate) fn write_json_string<W: Write + ?Sized>(out: &mut W, s: &str) -> core::fmt::Result {
    out.write_char('"')?;

    let bytes = s.as_bytes();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        let escape: Option<&str> = match b {
            b'"' => Some("\\\""),
            b'\\' => Some("\\\\"),
            b'\n' => Some("\\n"),
            b'\r' => Some("\\r"),
            b'\t' => Some("\\t"),
            0x00..=0x1f | 0x7f => None,
            _ => continue,
        };

        // Copy the safe span before this byte. Escapable bytes are all ASCII,
        // so `i` is always a char boundary.
        if start < i {
            out.write_str(&s[start..i])?;
        }
        match escape {
            Some(e) => out.write_str(e)?,
            None => {
                out.write_str("\\u00")?;
                const HEX: &[u8; 16] = b"0123456789abcdef";
                out.write_char(HEX[(b >> 4) as usize] as char)?;
                out.write_char(HEX[(b & 0xf) as usize] as char)?;
            }
        }
        start = i + 1;
    }

    if start < bytes.len() {
        out.write_str(&s[start..])?;
    }
    out.write_char('"')
}

/// Write a finite float. Integral values print without a fraction; magnitudes
/// of 1e21 and up or below 1e-5 use exponent notation.
fn write_float<W: Write + ?Sized>(out: &mut W, f: f64) -> core::fmt::Result {
    let abs = f.abs();
    if abs != 0.0 && !(1e-5..1e21).contains(&abs) {
        write!(out, "{:e}", f)
    } else {
        write!(out, "{}", f)
    }
}

fn sorted_entries(obj: &indexmap::IndexMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = obj.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

// ============================================================================
// YAML
// ============================================================================

/// Layout settings for block-style YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct YamlStyle {
    /// Spaces per nested mapping level.
    pub indent: usize,
    /// Indent sequences that are values of a mapping key.
    pub indent_sequence: bool,
    /// Write strings containing newlines as `|` block scalars.
    pub literal_multiline: bool,
}

impl Default for YamlStyle {
    fn default() -> Self {
        YamlStyle {
            indent: 2,
            indent_sequence: false,
            literal_multiline: false,
        }
    }
}

/// Write `value` as one block-style YAML document (no trailing newline).
pub(crate) fn write_yaml<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    style: &YamlStyle,
) -> core::fmt::Result {
    write_yaml_node(out, value, 0, style)
}

/// Write a node whose first line is already positioned. Continuation lines
/// are indented to `col`.
fn write_yaml_node<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    col: usize,
    style: &YamlStyle,
) -> core::fmt::Result {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            for (i, elem) in arr.iter().enumerate() {
                if i > 0 {
                    out.write_char('\n')?;
                    write_indent(out, col)?;
                }
                out.write_str("- ")?;
                // Nested containers start on the dash line
                write_yaml_node(out, elem, col + 2, style)?;
            }
            Ok(())
        }
        Value::Object(obj) if !obj.is_empty() => {
            for (i, (key, val)) in sorted_entries(obj).into_iter().enumerate() {
                if i > 0 {
                    out.write_char('\n')?;
                    write_indent(out, col)?;
                }
                write_yaml_string(out, key)?;
                out.write_char(':')?;
                match val {
                    Value::Object(inner) if !inner.is_empty() => {
                        out.write_char('\n')?;
                        write_indent(out, col + style.indent)?;
                        write_yaml_node(out, val, col + style.indent, style)?;
                    }
                    Value::Array(inner) if !inner.is_empty() => {
                        let seq_col = if style.indent_sequence {
                            col + style.indent
                        } else {
                            col
                        };
                        out.write_char('\n')?;
                        write_indent(out, seq_col)?;
                        write_yaml_node(out, val, seq_col, style)?;
                    }
                    _ => {
                        out.write_char(' ')?;
                        write_yaml_scalar(out, val, col + style.indent, style)?;
                    }
                }
            }
            Ok(())
        }
        _ => write_yaml_scalar(out, value, col.max(style.indent), style),
    }
}

/// Write a scalar (or empty container). `block_col` is the indentation used
/// for the body of a literal block scalar.
fn write_yaml_scalar<W: Write + ?Sized>(
    out: &mut W,
    value: &Value,
    block_col: usize,
    style: &YamlStyle,
) -> core::fmt::Result {
    match value {
        Value::Null => out.write_str("null"),
        Value::Bool(true) => out.write_str("true"),
        Value::Bool(false) => out.write_str("false"),
        Value::Int(n) => write!(out, "{}", n),
        Value::BigInt(n) => write!(out, "{}", n),
        Value::Float(f) => {
            if f.is_nan() {
                out.write_str(".nan")
            } else if f.is_infinite() {
                out.write_str(if *f > 0.0 { ".inf" } else { "-.inf" })
            } else {
                write_float(out, *f)
            }
        }
        Value::String(s) => {
            if style.literal_multiline && s.contains('\n') && can_write_literal(s) {
                write_yaml_literal(out, s, block_col)
            } else {
                write_yaml_string(out, s)
            }
        }
        Value::Array(_) => out.write_str("[]"),
        Value::Object(_) => out.write_str("{}"),
    }
}

/// A literal block keeps content verbatim, so lines that would be read back
/// differently (leading space sets the indentation, extra trailing newlines,
/// control characters) must stay double-quoted.
fn can_write_literal(s: &str) -> bool {
    let body = s.strip_suffix('\n').unwrap_or(s);
    !body.ends_with('\n')
        && !body.starts_with(' ')
        && !body.contains("\n ")
        && !body.contains('\r')
        && !body.chars().any(|c| c < ' ' && c != '\n' && c != '\t')
}

fn write_yaml_literal<W: Write + ?Sized>(out: &mut W, s: &str, col: usize) -> core::fmt::Result {
    let (body, header) = match s.strip_suffix('\n') {
        Some(body) => (body, "|"),
        None => (s, "|-"),
    };
    out.write_str(header)?;
    for line in body.split('\n') {
        out.write_char('\n')?;
        if !line.is_empty() {
            write_indent(out, col)?;
            out.write_str(line)?;
        }
    }
    Ok(())
}

/// Write indentation spaces.
fn write_indent<W: Write + ?Sized>(out: &mut W, spaces: usize) -> core::fmt::Result {
    for _ in 0..spaces {
        out.write_char(' ')?;
    }
    Ok(())
}

/// Write a string as a YAML scalar, plain when unambiguous and double-quoted
/// otherwise.
pub(crate) fn write_yaml_string<W: Write + ?Sized>(out: &mut W, s: &str) -> core::fmt::Result {
    if s.is_empty() {
        return out.write_str("\"\"");
    }

    if needs_yaml_quoting(s) {
        write_yaml_double_quoted(out, s)
    } else {
        out.write_str(s)
    }
}

/// Check if a string would not read back as the same plain string.
fn needs_yaml_quoting(s: &str) -> bool {
    let bytes = s.as_bytes();

    // Indicators that cannot start a plain scalar
    let first = bytes[0];
    if matches!(
        first,
        b'-' | b'?'
            | b':'
            | b','
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b'#'
            | b'&'
            | b'*'
            | b'!'
            | b'|'
            | b'>'
            | b'\''
            | b'"'
            | b'%'
            | b'@'
            | b'`'
    ) {
        return true;
    }

    if bytes[0] == b' ' || bytes[bytes.len() - 1] == b' ' {
        return true;
    }

    // Keywords a YAML 1.1 reader would resolve to another type
    let lower = s.to_lowercase();
    if matches!(
        lower.as_str(),
        "null"
            | "~"
            | "true"
            | "false"
            | "yes"
            | "no"
            | "y"
            | "n"
            | "on"
            | "off"
            | ".inf"
            | "-.inf"
            | "+.inf"
            | ".nan"
    ) {
        return true;
    }

    if looks_like_number(s) {
        return true;
    }

    bytes
        .iter()
        .any(|&b| b < 0x20 || b == 0x7f || b == b':' || b == b'#')
}

/// Check if a string looks like a number.
fn looks_like_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if bytes[i] == b'-' || bytes[i] == b'+' {
        i += 1;
        if i >= bytes.len() {
            return false;
        }
    }

    // `.5` is a float in YAML
    if !bytes[i].is_ascii_digit() && bytes[i] != b'.' {
        return false;
    }

    let mut has_dot = false;
    let mut has_exp = false;
    let mut has_digit = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => has_digit = true,
            b'.' if !has_dot && !has_exp => has_dot = true,
            b'e' | b'E' if !has_exp && has_digit => {
                has_exp = true;
                if i + 1 < bytes.len() && (bytes[i + 1] == b'-' || bytes[i + 1] == b'+') {
                    i += 1;
                }
            }
            // Hex and octal forms
            b'x' | b'o' if i == 1 && bytes[0] == b'0' => {}
            b'a'..=b'f' | b'A'..=b'F' if s.starts_with("0x") => has_digit = true,
            _ => return false,
        }
        i += 1;
    }

    has_digit
}

fn write_yaml_double_quoted<W: Write + ?Sized>(out: &mut W, s: &str) -> core::fmt::Result {
    out.write_char('"')?;

    for ch in s.chars() {
        match ch {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if c < ' ' || c == '\x7f' => {
                let b = c as u8;
                out.write_str("\\x")?;
                const HEX: &[u8; 16] = b"0123456789abcdef";
                out.write_char(HEX[(b >> 4) as usize] as char)?;
                out.write_char(HEX[(b & 0xf) as usize] as char)?;
            }
            c => out.write_char(c)?,
        }
    }

    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(value: &Value) -> String {
        let mut buf = String::new();
        write_json(&mut buf, value, None).unwrap();
        buf
    }

    fn pretty(value: &Value) -> String {
        let mut buf = String::new();
        write_json(&mut buf, value, Some(2)).unwrap();
        buf
    }

    fn yaml(value: &Value) -> String {
        yaml_with(value, &YamlStyle::default())
    }

    fn yaml_with(value: &Value, style: &YamlStyle) -> String {
        let mut buf = String::new();
        write_yaml(&mut buf, value, style).unwrap();
        buf
    }

    fn obj(pairs: &[(&str, Value)]) -> Value {
        Value::object_from(pairs.iter().cloned())
    }

    // ========================================================================
    // JSON
    // ========================================================================

    #[test]
    fn test_json_scalars() {
        assert_eq!(json(&Value::Null), "null");
        assert_eq!(json(&Value::Bool(true)), "true");
        assert_eq!(json(&Value::Int(-123)), "-123");
        assert_eq!(json(&Value::Float(3.125)), "3.125");
        assert_eq!(json(&Value::Float(2.0)), "2");
        assert_eq!(json(&Value::Float(f64::NAN)), "null");
        assert_eq!(json(&Value::Float(f64::INFINITY)), "null");
        assert_eq!(json(&Value::Float(1e300)), "1e300");
    }

    #[test]
    fn test_json_float_exponent_threshold() {
        assert_eq!(json(&Value::Float(1e17)), "100000000000000000");
        assert_eq!(json(&Value::Float(1.5e20)), "150000000000000000000");
        assert_eq!(json(&Value::Float(1e21)), "1e21");
        assert_eq!(json(&Value::Float(-2.5e21)), "-2.5e21");
        assert_eq!(json(&Value::Float(0.00001)), "0.00001");
        assert_eq!(json(&Value::Float(1e-7)), "1e-7");
    }

    #[test]
    fn test_json_string_escaping() {
        assert_eq!(json(&Value::from("hello\nworld")), "\"hello\\nworld\"");
        assert_eq!(json(&Value::from("tab\there")), "\"tab\\there\"");
        assert_eq!(json(&Value::from("quote\"here")), "\"quote\\\"here\"");
        assert_eq!(json(&Value::from("bell\u{7}")), "\"bell\\u0007\"");
        assert_eq!(json(&Value::from("héllo")), "\"héllo\"");
    }

    #[test]
    fn test_json_object_sorted() {
        let v = obj(&[("name", Value::from("Alice")), ("age", Value::Int(30))]);
        assert_eq!(json(&v), r#"{"age":30,"name":"Alice"}"#);
    }

    #[test]
    fn test_json_pretty() {
        let v = obj(&[
            ("foo", Value::from("bar")),
            ("list", Value::from(vec![1i64, 2])),
            ("empty", Value::Array(vec![])),
        ]);
        assert_eq!(
            pretty(&v),
            "{\n  \"empty\": [],\n  \"foo\": \"bar\",\n  \"list\": [\n    1,\n    2\n  ]\n}"
        );
    }

    // ========================================================================
    // YAML
    // ========================================================================

    #[test]
    fn test_yaml_sequence_not_indented_under_key() {
        let v = obj(&[
            ("name", Value::from("test")),
            ("items", Value::from(vec!["a", "b", "c"])),
        ]);
        assert_eq!(yaml(&v), "items:\n- a\n- b\n- c\nname: test");
    }

    #[test]
    fn test_yaml_indent_sequence() {
        let v = obj(&[("items", Value::from(vec!["a", "b"]))]);
        let style = YamlStyle {
            indent_sequence: true,
            ..YamlStyle::default()
        };
        assert_eq!(yaml_with(&v, &style), "items:\n  - a\n  - b");
    }

    #[test]
    fn test_yaml_nested_mapping() {
        let v = obj(&[("outer", obj(&[("b", Value::Int(2)), ("a", Value::Int(1))]))]);
        assert_eq!(yaml(&v), "outer:\n  a: 1\n  b: 2");

        let style = YamlStyle {
            indent: 4,
            ..YamlStyle::default()
        };
        assert_eq!(yaml_with(&v, &style), "outer:\n    a: 1\n    b: 2");
    }

    #[test]
    fn test_yaml_sequence_of_mappings() {
        let v = Value::Array(vec![
            obj(&[("id", Value::Int(1)), ("tags", Value::from(vec!["x"]))]),
            obj(&[("id", Value::Int(2))]),
        ]);
        assert_eq!(yaml(&v), "- id: 1\n  tags:\n  - x\n- id: 2");
    }

    #[test]
    fn test_yaml_nested_sequence() {
        let v = Value::Array(vec![Value::from(vec![1i64, 2]), Value::Int(3)]);
        assert_eq!(yaml(&v), "- - 1\n  - 2\n- 3");
    }

    #[test]
    fn test_yaml_empty_containers() {
        let v = obj(&[("a", Value::Array(vec![])), ("b", Value::object())]);
        assert_eq!(yaml(&v), "a: []\nb: {}");
    }

    #[test]
    fn test_yaml_quoting() {
        assert_eq!(yaml(&Value::from("plain")), "plain");
        assert_eq!(yaml(&Value::from("")), "\"\"");
        assert_eq!(yaml(&Value::from("true")), "\"true\"");
        assert_eq!(yaml(&Value::from("123")), "\"123\"");
        assert_eq!(yaml(&Value::from("1.5e3")), "\"1.5e3\"");
        assert_eq!(yaml(&Value::from("a: b")), "\"a: b\"");
        assert_eq!(yaml(&Value::from("- x")), "\"- x\"");
        assert_eq!(yaml(&Value::from("two\nlines")), "\"two\\nlines\"");
    }

    #[test]
    fn test_yaml_legacy_bool_keys_quoted() {
        let v = Value::object_from([("n", Value::Int(0)), ("id", Value::Int(1))]);
        assert_eq!(yaml(&v), "id: 1\n\"n\": 0");
        assert_eq!(yaml(&Value::from("y")), "\"y\"");
    }

    #[test]
    fn test_yaml_literal_multiline() {
        let style = YamlStyle {
            literal_multiline: true,
            ..YamlStyle::default()
        };
        let v = obj(&[("text", Value::from("line1\nline2"))]);
        assert_eq!(yaml_with(&v, &style), "text: |-\n  line1\n  line2");

        let v = obj(&[("text", Value::from("line1\n\nline3\n"))]);
        assert_eq!(yaml_with(&v, &style), "text: |\n  line1\n\n  line3");

        // Leading spaces would change the block's indentation
        let v = obj(&[("text", Value::from(" indented\nx"))]);
        assert_eq!(yaml_with(&v, &style), "text: \" indented\\nx\"");
    }

    #[test]
    fn test_yaml_special_floats() {
        assert_eq!(yaml(&Value::Float(f64::NAN)), ".nan");
        assert_eq!(yaml(&Value::Float(f64::NEG_INFINITY)), "-.inf");
        assert_eq!(yaml(&Value::Float(0.5)), "0.5");
    }

    #[test]
    fn test_looks_like_number() {
        assert!(looks_like_number("42"));
        assert!(looks_like_number("-1.5"));
        assert!(looks_like_number("1e10"));
        assert!(looks_like_number(".5"));
        assert!(looks_like_number("0x1F"));
        assert!(!looks_like_number("1.2.3"));
        assert!(!looks_like_number("abc"));
        assert!(!looks_like_number("-"));
        assert!(!looks_like_number("."));
    }
}
