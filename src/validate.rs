use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::{
    cli::{FilterArgs, InputArgs, ValidateArgs},
    config::Config,
    ingest::{self, ParseOptions, ParsedTable},
    io_utils,
};

/// A parsed input file together with the configuration it was read under.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub path: PathBuf,
    pub file_name: String,
    pub config: Config,
    pub table: ParsedTable,
}

pub fn load_input(args: &InputArgs) -> Result<LoadedInput> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let encoding_label = args
        .input_encoding
        .as_deref()
        .or(config.ingest.encoding.as_deref());
    let encoding = io_utils::resolve_encoding(encoding_label)?;
    let delimiter = io_utils::resolve_input_delimiter(
        &args.input,
        args.delimiter.or(config.ingest.delimiter_byte()),
    );
    info!(
        "Reading '{}' with delimiter '{}' ({})",
        args.input.display(),
        io_utils::printable_delimiter(delimiter),
        encoding.name()
    );
    let table = parse_path(&args.input, &ParseOptions { delimiter, encoding })?;
    Ok(LoadedInput {
        path: args.input.clone(),
        file_name: io_utils::upload_file_name(&args.input),
        config,
        table,
    })
}

pub fn parse_path(path: &Path, options: &ParseOptions) -> Result<ParsedTable> {
    let bytes = io_utils::read_input(path)?;
    let table = ingest::parse_table(&bytes, options)
        .with_context(|| format!("Parsing {path:?}"))?;
    Ok(table)
}

#[derive(Debug, Serialize)]
struct ValidationSummary<'a> {
    column: &'a str,
    detected_column: &'a str,
    headers: &'a [String],
    alias_matches: &'a [String],
    valid_rows: usize,
    total_rows: usize,
}

pub fn execute_validate(args: &ValidateArgs) -> Result<()> {
    let input = load_input(&args.input)?;
    let validation = ingest::validate_headers(&input.table, &input.config.ingest)
        .with_context(|| format!("Validating {:?}", input.path))?;
    let column = validation.resolve_column(args.column.as_deref())?;

    let column_index = input
        .table
        .column_index(&column)
        .context("Resolved column missing from table")?;
    let valid_rows = input.table.non_empty_count(column_index);

    if args.json {
        let summary = ValidationSummary {
            column: &column,
            detected_column: &validation.column,
            headers: &validation.headers,
            alias_matches: &validation.alias_matches,
            valid_rows,
            total_rows: input.table.row_count(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("column: {column}");
        println!("headers: {}", validation.headers.join(", "));
        println!("valid rows: {valid_rows} of {}", input.table.row_count());
    }
    info!("✓ {:?} is ready for analysis using column '{}'", input.path, column);
    Ok(())
}

pub fn execute_filter(args: &FilterArgs) -> Result<()> {
    let input = load_input(&args.input)?;
    let validation = ingest::validate_headers(&input.table, &input.config.ingest)
        .with_context(|| format!("Validating {:?}", input.path))?;
    let column = validation.resolve_column(args.column.as_deref())?;
    let payload = ingest::filter_and_serialize(&input.table, &column)?;

    io_utils::write_output(args.output.as_deref(), payload.csv_text.as_bytes())?;
    let destination = args
        .output
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    info!(
        "Kept {} row(s) using column '{}', {} -> {}",
        payload.kept_rows,
        payload.column,
        payload.summary(),
        destination
    );
    Ok(())
}
