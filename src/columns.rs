//! Column listing for a feedback file.
//!
//! Renders each header with its position, whether it matches a feedback
//! alias, and how many rows have a non-empty value, so a user can pick a
//! `--column` override.

use anyhow::Result;
use log::info;

use crate::{
    cli::ColumnsArgs,
    config::IngestConfig,
    ingest::ParsedTable,
    table,
    validate::load_input,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let input = load_input(&args.input)?;

    if input.table.headers().is_empty() {
        info!("{:?} does not contain a header row", input.path);
        return Ok(());
    }

    let rows = column_rows(&input.table, &input.config.ingest);
    let headers = vec![
        "#".to_string(),
        "name".to_string(),
        "feedback".to_string(),
        "non-empty".to_string(),
    ];
    table::print_table(&headers, &rows);
    info!(
        "Listed {} column(s) across {} row(s) from {:?}",
        input.table.headers().len(),
        input.table.row_count(),
        input.path
    );
    Ok(())
}

pub fn column_rows(table: &ParsedTable, config: &IngestConfig) -> Vec<Vec<String>> {
    let mut first_match_seen = false;
    table
        .headers()
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            let marker = if config.is_alias(header) {
                if first_match_seen {
                    "alias"
                } else {
                    first_match_seen = true;
                    "default"
                }
            } else {
                ""
            };
            vec![
                (idx + 1).to_string(),
                header.clone(),
                marker.to_string(),
                table.non_empty_count(idx).to_string(),
            ]
        })
        .collect()
}
