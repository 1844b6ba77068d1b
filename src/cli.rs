use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Validate, filter, and submit CSV feedback files for analysis",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that a file has a feedback column and enough non-empty rows
    Validate(ValidateArgs),
    /// Drop rows with empty feedback and write the remaining CSV
    Filter(FilterArgs),
    /// Validate, filter, and submit a file to the analysis service
    Upload(UploadArgs),
    /// List the columns of a file and which ones look like feedback
    Columns(ColumnsArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV file ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML configuration file
    #[arg(short = 'c', long = "config", env = "FEEDBACK_INGEST_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Use this column instead of the detected feedback column
    #[arg(long = "column")]
    pub column: Option<String>,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Use this column instead of the detected feedback column
    #[arg(long = "column")]
    pub column: Option<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Use this column instead of the detected feedback column
    #[arg(long = "column")]
    pub column: Option<String>,
    /// Base URL of the analysis API (overrides the config file)
    #[arg(long = "api-url", env = "FEEDBACK_API_URL")]
    pub api_url: Option<String>,
    /// Bearer token for the analysis API
    #[arg(long = "token", env = "FEEDBACK_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Stop before submission and write the filtered CSV instead
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Destination for the filtered CSV in dry-run mode (stdout if omitted)
    #[arg(short = 'o', long = "output", requires = "dry_run")]
    pub output: Option<PathBuf>,
    /// Print the analysis report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
