//! One upload attempt, end to end.
//!
//! Validation must succeed before anything is filtered, and nothing is sent
//! unless both validation and filtering succeed. The attempt is registered
//! with the session so that a superseded attempt cannot overwrite the
//! outcome of a newer one.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use thiserror::Error;

use crate::{
    analysis::{AnalysisReport, RowCounts},
    cli::UploadArgs,
    ingest::{self, FilteredPayload, IngestError},
    io_utils,
    session::{AttemptOutcome, SessionContext},
    transport::{HttpTransport, TransportError, UploadRequest, UploadTransport},
    validate::{LoadedInput, load_input},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttemptError {
    #[error("Please upload a CSV file")]
    NotCsv { file_name: String },
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Refuses anything not named `*.csv`. Stdin is accepted as-is.
pub fn ensure_csv(path: &Path) -> Result<(), AttemptError> {
    let file_name = io_utils::upload_file_name(path);
    if io_utils::is_dash(path) || file_name.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(AttemptError::NotCsv { file_name })
    }
}

/// Validates `input` and produces the payload that would be submitted.
pub fn prepare_payload(
    input: &LoadedInput,
    column_override: Option<&str>,
) -> Result<FilteredPayload, AttemptError> {
    ensure_csv(&input.path)?;
    let validation = ingest::validate_headers(&input.table, &input.config.ingest)?;
    let column = validation.resolve_column(column_override)?;
    let payload = ingest::filter_and_serialize(&input.table, &column)?;
    // An override column is held to the same minimum as the detected one.
    let required = input.config.ingest.min_valid_rows;
    if payload.kept_rows < required {
        return Err(IngestError::InsufficientData {
            found: payload.kept_rows,
            required,
        }
        .into());
    }
    info!(
        "Prepared '{}' using column '{}': {}",
        input.file_name,
        payload.column,
        payload.summary()
    );
    Ok(payload)
}

pub fn run_attempt<T>(
    session: &mut SessionContext,
    transport: &T,
    input: &LoadedInput,
    column_override: Option<&str>,
) -> Result<AnalysisReport, AttemptError>
where
    T: UploadTransport + ?Sized,
{
    let ticket = session.uploads_mut().begin(input.file_name.clone());
    let result = prepare_payload(input, column_override).and_then(|payload| {
        let request = UploadRequest {
            file_name: input.file_name.clone(),
            csv_text: payload.csv_text.clone(),
            column: payload.column.clone(),
        };
        let response = transport.submit(&request, session.access_token())?;
        Ok(AnalysisReport::from_response(
            &response,
            RowCounts::from(&payload),
        ))
    });

    match result {
        Ok(report) => {
            let outcome = AttemptOutcome::Succeeded {
                message: report.success_message(),
            };
            if session.uploads_mut().complete(&ticket, outcome) {
                session.store_report(report.clone());
            }
            Ok(report)
        }
        Err(err) => {
            if matches!(err, AttemptError::Transport(TransportError::Unauthorized { .. })) {
                session.revoke_token();
            }
            let outcome = AttemptOutcome::Failed {
                message: err.to_string(),
            };
            session.uploads_mut().complete(&ticket, outcome);
            Err(err)
        }
    }
}

pub fn execute(args: &UploadArgs) -> Result<()> {
    ensure_csv(&args.input.input)?;
    let input = load_input(&args.input)?;

    if args.dry_run {
        let payload = prepare_payload(&input, args.column.as_deref())
            .with_context(|| format!("Preparing {:?}", input.path))?;
        io_utils::write_output(args.output.as_deref(), payload.csv_text.as_bytes())?;
        info!(
            "Dry run: {} row(s) would be submitted using column '{}'",
            payload.kept_rows, payload.column
        );
        return Ok(());
    }

    let mut api = input.config.api.clone();
    if let Some(url) = &args.api_url {
        api.base_url = url.clone();
    }
    let transport = HttpTransport::new(&api)?;
    let mut session = SessionContext::start(args.token.clone());

    let report = run_attempt(&mut session, &transport, &input, args.column.as_deref())
        .with_context(|| format!("Uploading {:?}", input.path))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    info!("{}", report.success_message());
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!(
        "sentiment: {} positive, {} negative",
        report.sentiment.positive, report.sentiment.negative
    );
    if !report.topics.is_empty() {
        let headers = vec![
            "topic".to_string(),
            "positive".to_string(),
            "negative".to_string(),
            "total".to_string(),
            "keywords".to_string(),
        ];
        let rows = report
            .topics
            .iter()
            .map(|topic| {
                vec![
                    topic.name.clone(),
                    topic.positive.to_string(),
                    topic.negative.to_string(),
                    topic.total.to_string(),
                    topic.keywords.join(", "),
                ]
            })
            .collect::<Vec<_>>();
        crate::table::print_table(&headers, &rows);
    }
    for path in &report.visualizations {
        println!("visualization: {path}");
    }
}
