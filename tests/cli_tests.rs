//! Integration tests for the jqpipe CLI
//!
//! Run with: cargo test --features cli --test cli_tests

#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::Result;
use tempfile::NamedTempFile;

/// Run jqpipe with input from stdin
fn run_stdin(args: &[&str], input: &str) -> Result<(String, i32)> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jqpipe"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = cmd.stdin.take() {
        // The process may exit before reading, e.g. on a query error
        let _ = stdin.write_all(input.as_bytes());
    }

    let output = cmd.wait_with_output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let exit_code = output.status.code().unwrap_or(-1);

    Ok((stdout, exit_code))
}

/// Run jqpipe on a temporary file with the given suffix
fn run_file(args: &[&str], content: &str, suffix: &str) -> Result<(String, i32)> {
    let mut file: NamedTempFile = tempfile::Builder::new().suffix(suffix).tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;

    let output = Command::new(env!("CARGO_BIN_EXE_jqpipe"))
        .args(args)
        .arg(file.path())
        .output()?;

    let stdout = String::from_utf8(output.stdout)?;
    let exit_code = output.status.code().unwrap_or(-1);

    Ok((stdout, exit_code))
}

// ============================================================================
// Output layouts
// ============================================================================

#[test]
fn test_pretty_by_default() -> Result<()> {
    let (out, code) = run_stdin(&["."], r#"{"b":1,"a":[true]}"#)?;
    assert_eq!(code, 0);
    assert_eq!(out, "{\n  \"a\": [\n    true\n  ],\n  \"b\": 1\n}\n");
    Ok(())
}

#[test]
fn test_compact_output() -> Result<()> {
    let (out, code) = run_stdin(&["-c", ".items[] | select(.on)"], r#"{"items":[{"on":true,"n":1},{"on":false,"n":2}]}"#)?;
    assert_eq!(code, 0);
    assert_eq!(out, "{\"n\":1,\"on\":true}\n");
    Ok(())
}

#[test]
fn test_raw_output() -> Result<()> {
    let (out, code) = run_stdin(&["-r", ".[]"], r#"["a b", "c"]"#)?;
    assert_eq!(code, 0);
    assert_eq!(out, "a b\nc\n");
    Ok(())
}

#[test]
fn test_default_query_is_identity() -> Result<()> {
    let (out, code) = run_stdin(&["-c"], "[1,2]")?;
    assert_eq!(code, 0);
    assert_eq!(out, "[1,2]\n");
    Ok(())
}

#[test]
fn test_multiple_input_documents() -> Result<()> {
    let (out, code) = run_stdin(&["-c", ".n"], "{\"n\":1}\n{\"n\":2}\n")?;
    assert_eq!(code, 0);
    assert_eq!(out, "1\n2\n");
    Ok(())
}

#[test]
fn test_yaml_output() -> Result<()> {
    let (out, code) = run_stdin(&["-o", "yaml", ".[]"], r#"[{"a":1},{"b":["x"]}]"#)?;
    assert_eq!(code, 0);
    assert_eq!(out, "a: 1\n---\nb:\n- x\n");
    Ok(())
}

#[test]
fn test_yaml_output_across_inputs() -> Result<()> {
    let (out, code) = run_stdin(&["-o", "yaml", "."], "1\n2\n3\n")?;
    assert_eq!(code, 0);
    assert_eq!(out, "1\n---\n2\n---\n3\n");
    Ok(())
}

#[test]
fn test_yaml_indent_flags() -> Result<()> {
    let (out, code) = run_stdin(
        &["-o", "yaml", "--indent", "4", "--indent-sequence", "."],
        r#"{"a":{"b":[1]}}"#,
    )?;
    assert_eq!(code, 0);
    assert_eq!(out, "a:\n    b:\n        - 1\n");
    Ok(())
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_arg_binds_string() -> Result<()> {
    let (out, code) = run_stdin(&["-c", "--arg", "who", "world", "{greeting: $who}"], "null")?;
    assert_eq!(code, 0);
    assert_eq!(out, "{\"greeting\":\"world\"}\n");
    Ok(())
}

#[test]
fn test_argjson_binds_value() -> Result<()> {
    let (out, code) = run_stdin(
        &["-c", "--argjson", "lim", "2", "[.[] | select(. > $lim)]"],
        "[1,2,3,4]",
    )?;
    assert_eq!(code, 0);
    assert_eq!(out, "[3,4]\n");
    Ok(())
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_yaml_file_input() -> Result<()> {
    let (out, code) = run_file(&["-c", ".servers[].port"], "servers:\n  - port: 80\n  - port: 443\n", ".yaml")?;
    assert_eq!(code, 0);
    assert_eq!(out, "80\n443\n");
    Ok(())
}

#[test]
fn test_json_file_input() -> Result<()> {
    let (out, code) = run_file(&["-r", ".name"], r#"{"name":"demo"}"#, ".json")?;
    assert_eq!(code, 0);
    assert_eq!(out, "demo\n");
    Ok(())
}

// ============================================================================
// Exit codes
// ============================================================================

#[test]
fn test_bad_query_exit_code() -> Result<()> {
    let (out, code) = run_stdin(&[".foo["], "{}")?;
    assert_eq!(code, 3);
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn test_unknown_variable_exit_code() -> Result<()> {
    let (_, code) = run_stdin(&["$missing"], "{}")?;
    assert_eq!(code, 3);
    Ok(())
}

#[test]
fn test_runtime_error_exit_code() -> Result<()> {
    let (_, code) = run_stdin(&["error(\"boom\")"], "{}")?;
    assert_eq!(code, 5);
    Ok(())
}

#[test]
fn test_invalid_input_exit_code() -> Result<()> {
    let (_, code) = run_stdin(&["."], "{not json")?;
    assert_eq!(code, 2);
    Ok(())
}
