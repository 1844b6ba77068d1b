//! Feedback CSV ingestion and validation.
//!
//! An upload goes through three steps, all over an in-memory [`ParsedTable`]:
//!
//! 1. [`parse_table()`] decodes the input, takes the first record as the
//!    header row, drops rows whose fields are all blank, and rejects rows
//!    whose field count differs from the header.
//! 2. [`validate_headers()`] locates the feedback column by alias and checks
//!    that enough rows carry non-empty feedback.
//! 3. [`filter_and_serialize()`] drops rows with blank feedback in the chosen
//!    column and writes the survivors back out as CSV for submission.
//!
//! Row numbers in errors are the zero-based index of the data row (counted
//! after blank rows are skipped) plus two, which lines up with the line a
//! person sees in the file when the header sits on line 1.

use std::fmt;

use encoding_rs::{DecoderResult, Encoding, UTF_8};
use itertools::Itertools;
use log::{debug, warn};
use thiserror::Error;

use crate::{config::IngestConfig, io_utils};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCountMismatch {
    TooFew,
    TooMany,
}

impl fmt::Display for FieldCountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldCountMismatch::TooFew => f.write_str("too few fields"),
            FieldCountMismatch::TooMany => f.write_str("too many fields"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error(
        "Row {row} has an inconsistent number of columns ({mismatch}: expected {expected}, found {found}). \
         Please ensure all rows have the same number of columns and are properly comma-separated."
    )]
    MalformedRow {
        row: usize,
        mismatch: FieldCountMismatch,
        expected: usize,
        found: usize,
    },
    #[error("CSV parsing error: {message} at row {row}")]
    Parse { row: usize, message: String },
    #[error(
        "CSV file must contain exactly one of these column headers: {} (case insensitive). Found columns: {}",
        quoted_list(.accepted),
        .found.join(", ")
    )]
    NoReviewColumn {
        found: Vec<String>,
        accepted: Vec<String>,
    },
    #[error(
        "CSV file contains only {found} valid reviews. A minimum of {required} non-empty reviews \
         is required for accurate analysis. Please add more reviews with text content."
    )]
    InsufficientData { found: usize, required: usize },
    #[error("Column '{column}' is not present in the file. Found columns: {}", .headers.join(", "))]
    UnknownColumn {
        column: String,
        headers: Vec<String>,
    },
    #[error("Failed to serialize filtered rows: {0}")]
    Serialize(String),
}

/// Aliases are stored lowercase; the message shows them capitalized.
fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("\"{}\"", capitalize(value)))
        .join(", ")
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_row(data_index: usize) -> usize {
    data_index + 2
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
        }
    }
}

/// Header row plus data rows of one uploaded file.
///
/// Every row holds exactly `headers().len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: u8,
}

impl ParsedTable {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Position of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn non_empty_count(&self, column_index: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| has_text(row.get(column_index)))
            .count()
    }
}

fn has_text(cell: Option<&String>) -> bool {
    cell.is_some_and(|value| !value.trim().is_empty())
}

fn is_blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn decode_input(bytes: &[u8], encoding: &'static Encoding) -> Result<String, IngestError> {
    let mut decoder = encoding.new_decoder();
    let mut text = String::with_capacity(
        decoder
            .max_utf8_buffer_length_without_replacement(bytes.len())
            .unwrap_or(bytes.len()),
    );
    let mut remaining = bytes;
    loop {
        let (result, read) =
            decoder.decode_to_string_without_replacement(remaining, &mut text, true);
        remaining = &remaining[read..];
        match result {
            DecoderResult::InputEmpty => return Ok(text),
            DecoderResult::OutputFull => text.reserve(remaining.len().max(4) * 3),
            DecoderResult::Malformed(_, _) => {
                // `text` holds everything before the offending bytes.
                return Err(IngestError::Parse {
                    row: text.matches('\n').count() + 1,
                    message: format!("input is not valid {}", decoder.encoding().name()),
                });
            }
        }
    }
}

/// Parses `bytes` into a [`ParsedTable`].
///
/// Empty input, or input made only of blank lines, yields a table with no
/// headers and no rows.
pub fn parse_table(bytes: &[u8], options: &ParseOptions) -> Result<ParsedTable, IngestError> {
    let text = decode_input(bytes, options.encoding)?;
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), options.delimiter);

    let mut headers: Option<Vec<String>> = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for result in reader.records() {
        let data_index = rows.len();
        let record = result.map_err(|err| IngestError::Parse {
            row: if headers.is_some() {
                display_row(data_index)
            } else {
                1
            },
            message: err.to_string(),
        })?;
        if is_blank_record(&record) {
            continue;
        }
        if headers.is_none() {
            headers = Some(record.iter().map(|field| field.to_string()).collect());
            continue;
        }
        let expected = headers.as_ref().map_or(0, Vec::len);
        let found = record.len();
        if found != expected {
            let mismatch = if found < expected {
                FieldCountMismatch::TooFew
            } else {
                FieldCountMismatch::TooMany
            };
            return Err(IngestError::MalformedRow {
                row: display_row(data_index),
                mismatch,
                expected,
                found,
            });
        }
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    let table = ParsedTable {
        headers: headers.unwrap_or_default(),
        rows,
        delimiter: options.delimiter,
    };
    debug!(
        "Parsed {} header(s) and {} data row(s)",
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Outcome of a successful [`validate_headers()`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderValidation {
    /// Feedback column chosen automatically, in its original spelling.
    pub column: String,
    /// Every header of the file, in file order.
    pub headers: Vec<String>,
    /// Every alias-matching header in file order; more than one is ambiguous.
    pub alias_matches: Vec<String>,
    /// Rows with non-empty feedback in `column`.
    pub valid_rows: usize,
}

impl HeaderValidation {
    pub fn is_ambiguous(&self) -> bool {
        self.alias_matches.len() > 1
    }

    /// Picks the column to filter on: the caller's override when given,
    /// otherwise the automatically resolved column.
    ///
    /// An override is matched exactly first, then case-insensitively after
    /// trimming, and always resolves to the header as spelled in the file.
    pub fn resolve_column(&self, override_column: Option<&str>) -> Result<String, IngestError> {
        let Some(requested) = override_column else {
            return Ok(self.column.clone());
        };
        if let Some(exact) = self.headers.iter().find(|header| *header == requested) {
            return Ok(exact.clone());
        }
        let wanted = requested.trim().to_lowercase();
        self.headers
            .iter()
            .find(|header| header.trim().to_lowercase() == wanted)
            .cloned()
            .ok_or_else(|| IngestError::UnknownColumn {
                column: requested.to_string(),
                headers: self.headers.clone(),
            })
    }
}

/// Finds the feedback column and enforces the minimum row count.
pub fn validate_headers(
    table: &ParsedTable,
    config: &IngestConfig,
) -> Result<HeaderValidation, IngestError> {
    let alias_matches = table
        .headers
        .iter()
        .filter(|header| config.is_alias(header))
        .cloned()
        .collect::<Vec<_>>();

    let Some(column) = alias_matches.first().cloned() else {
        return Err(IngestError::NoReviewColumn {
            found: table.headers.clone(),
            accepted: config.aliases.clone(),
        });
    };
    if alias_matches.len() > 1 {
        warn!(
            "Multiple feedback columns found ({}); using '{}'. Pass an explicit column to choose another",
            alias_matches.join(", "),
            column
        );
    }

    let column_index = table
        .column_index(&column)
        .ok_or_else(|| IngestError::UnknownColumn {
            column: column.clone(),
            headers: table.headers.clone(),
        })?;
    let valid_rows = table.non_empty_count(column_index);
    debug!("Feedback column '{column}' has {valid_rows} non-empty value(s)");

    if valid_rows < config.min_valid_rows {
        return Err(IngestError::InsufficientData {
            found: valid_rows,
            required: config.min_valid_rows,
        });
    }

    Ok(HeaderValidation {
        column,
        headers: table.headers.clone(),
        alias_matches,
        valid_rows,
    })
}

/// Filtered CSV ready for submission plus the counts shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredPayload {
    pub column: String,
    pub csv_text: String,
    pub total_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
}

impl FilteredPayload {
    pub fn summary(&self) -> String {
        format!(
            "{} rows removed of {} total",
            self.dropped_rows, self.total_rows
        )
    }
}

/// Drops rows whose `column` cell is blank and re-serializes the rest.
///
/// Header order and every other cell are preserved as read.
pub fn filter_and_serialize(
    table: &ParsedTable,
    column: &str,
) -> Result<FilteredPayload, IngestError> {
    let column_index = table
        .column_index(column)
        .ok_or_else(|| IngestError::UnknownColumn {
            column: column.to_string(),
            headers: table.headers.clone(),
        })?;

    let mut writer = io_utils::open_csv_writer(Vec::new(), table.delimiter);
    writer
        .write_record(table.headers.iter())
        .map_err(|err| IngestError::Serialize(err.to_string()))?;

    let mut kept_rows = 0usize;
    for row in &table.rows {
        if !has_text(row.get(column_index)) {
            continue;
        }
        writer
            .write_record(row.iter())
            .map_err(|err| IngestError::Serialize(err.to_string()))?;
        kept_rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| IngestError::Serialize(err.to_string()))?;
    let csv_text = String::from_utf8(bytes).map_err(|err| IngestError::Serialize(err.to_string()))?;

    let total_rows = table.rows.len();
    Ok(FilteredPayload {
        column: column.to_string(),
        csv_text,
        total_rows,
        kept_rows,
        dropped_rows: total_rows - kept_rows,
    })
}
