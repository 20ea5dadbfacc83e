//! Reads the input documents, runs the pipeline on each and maps errors to
//! exit codes.

use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use jqpipe::{
    Context, EncodeOption, Error, ExecuteOptions, Format, JsonStyle, Pipeline, QueryCause, Value,
    YamlEncoder,
};
use serde::Deserialize;

use crate::{Cli, FormatArg};

/// Exit codes follow jq's conventions.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USAGE_ERROR: i32 = 2; // Usage problem or system error
    pub const COMPILE_ERROR: i32 = 3; // Query parse or compile error
    pub const RUNTIME_ERROR: i32 = 5; // Evaluation, conversion or timeout error
}

/// Pick the exit code for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(Error::Query(q)) => match q.cause {
            QueryCause::Syntax(_) | QueryCause::Compile(_) => exit_codes::COMPILE_ERROR,
            QueryCause::Runtime(_) | QueryCause::Cancelled => exit_codes::RUNTIME_ERROR,
        },
        Some(Error::Conversion(_)) | Some(Error::Timeout(_)) => exit_codes::RUNTIME_ERROR,
        Some(Error::Config(_)) | Some(Error::Sink(_)) | None => exit_codes::USAGE_ERROR,
    }
}

pub fn run(cli: &Cli) -> Result<i32> {
    let query = cli.query.clone().unwrap_or_else(|| ".".to_string());
    let style = if cli.compact_output {
        JsonStyle::COMPACT
    } else {
        JsonStyle::PRETTY
    };
    let pipeline = Pipeline::builder()
        .query(query)
        .default_encode_options(encode_options(cli))
        .default_json_style(style)
        .build()?;

    let input_format = match (cli.input_format, &cli.file) {
        (Some(format), _) => format,
        (None, Some(path)) => format_from_extension(path),
        (None, None) => FormatArg::Json,
    };
    let bytes = match &cli.file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?,
        None => read_stdin()?,
    };
    let documents = parse_documents(&bytes, input_format)?;
    tracing::debug!(documents = documents.len(), ?input_format, "read input");

    let variables = variables(cli)?;
    let ctx = Context::background();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    // One YAML encoder across all documents keeps the `---` separators going
    let mut yaml = YamlEncoder::new(Vec::new());

    for document in &documents {
        let mut opts = ExecuteOptions::new()
            .variables(variables.iter().cloned())
            .timeout(Duration::from_millis(cli.timeout_ms));
        if cli.raw_output {
            opts = opts.raw_json();
        }

        match cli.output_format {
            FormatArg::Json => {
                pipeline.execute(&ctx, document, opts.writer(&mut out, Format::Json))?;
            }
            FormatArg::Yaml => {
                pipeline.execute(&ctx, document, opts.encoder(&mut yaml))?;
                let buf = std::mem::take(yaml.get_mut());
                out.write_all(&buf).context("Failed to write output")?;
            }
        }
    }

    out.flush().context("Failed to write output")?;
    Ok(exit_codes::SUCCESS)
}

fn encode_options(cli: &Cli) -> Vec<EncodeOption> {
    let mut options = Vec::new();
    if let Some(indent) = cli.indent {
        options.push(EncodeOption::Indent(indent));
    }
    if cli.indent_sequence {
        options.push(EncodeOption::IndentSequence(true));
    }
    if cli.literal_multiline {
        options.push(EncodeOption::LiteralStyleIfMultiline(true));
    }
    options
}

/// Collect `--arg` and `--argjson` bindings.
fn variables(cli: &Cli) -> Result<Vec<(String, Value)>> {
    let mut vars = Vec::new();
    for pair in cli.args.chunks(2) {
        if let [name, value] = pair {
            vars.push((name.clone(), Value::String(value.clone())));
        }
    }
    for pair in cli.json_args.chunks(2) {
        if let [name, text] = pair {
            let value: Value = serde_json::from_str(text)
                .with_context(|| format!("Invalid JSON text passed to --argjson {}", name))?;
            vars.push((name.clone(), value));
        }
    }
    Ok(vars)
}

fn format_from_extension(path: &Path) -> FormatArg {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FormatArg::Yaml,
        _ => FormatArg::Json,
    }
}

/// Split the input into documents: a stream of JSON texts, or a YAML stream.
fn parse_documents(bytes: &[u8], format: FormatArg) -> Result<Vec<Value>> {
    match format {
        FormatArg::Json => serde_json::Deserializer::from_slice(bytes)
            .into_iter::<Value>()
            .map(|doc| doc.context("Failed to parse JSON input"))
            .collect(),
        FormatArg::Yaml => serde_yaml::Deserializer::from_slice(bytes)
            .map(|doc| Value::deserialize(doc).context("Failed to parse YAML input"))
            .collect(),
    }
}

fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    io::stdin()
        .read_to_end(&mut buf)
        .context("Failed to read from stdin")?;
    Ok(buf)
}
