//! jqpipe command-line tool: run a jq filter over JSON or YAML documents.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

mod logging;
mod runner;

#[derive(Debug, Parser)]
#[command(name = "jqpipe")]
#[command(about = "Run jq filters over JSON and YAML documents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// jq filter to apply (defaults to the identity filter `.`)
    pub query: Option<String>,

    /// Input file (defaults to stdin)
    pub file: Option<PathBuf>,

    /// Input format (defaults to the file extension, or json for stdin)
    #[arg(short, long)]
    pub input_format: Option<FormatArg>,

    /// Output format
    #[arg(short, long, default_value = "json")]
    pub output_format: FormatArg,

    /// Write each JSON result on a single line
    #[arg(short = 'c', long)]
    pub compact_output: bool,

    /// Write string results without quotes
    #[arg(short, long)]
    pub raw_output: bool,

    /// Bind $NAME to the string VALUE
    #[arg(long = "arg", num_args = 2, value_names = ["NAME", "VALUE"], action = clap::ArgAction::Append)]
    pub args: Vec<String>,

    /// Bind $NAME to the parsed JSON text
    #[arg(long = "argjson", num_args = 2, value_names = ["NAME", "JSON"], action = clap::ArgAction::Append)]
    pub json_args: Vec<String>,

    /// Abort after this many milliseconds per document (0 disables)
    #[arg(long, default_value = "30000")]
    pub timeout_ms: u64,

    /// Spaces per YAML indentation level
    #[arg(long)]
    pub indent: Option<usize>,

    /// Indent YAML sequences nested under a key
    #[arg(long)]
    pub indent_sequence: bool,

    /// Write multi-line YAML strings as literal blocks
    #[arg(long)]
    pub literal_multiline: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for jqpipe::Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => jqpipe::Format::Json,
            FormatArg::Yaml => jqpipe::Format::Yaml,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let code = match runner::run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("jqpipe: error: {:#}", err);
            runner::exit_code(&err)
        }
    };
    std::process::exit(code);
}
