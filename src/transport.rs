//! Submission of filtered payloads to the analysis service.
//!
//! The payload is posted as `multipart/form-data` with two fields: `file`
//! (the filtered CSV, `text/csv`) and `columnName` (the feedback column).

use std::time::Duration;

use log::{debug, info};
use reqwest::{
    StatusCode,
    blocking::{
        Client,
        multipart::{Form, Part},
    },
    header::ACCEPT,
};
use thiserror::Error;

use crate::{analysis::BatchResponse, config::ApiConfig};

pub const BATCH_ENDPOINT: &str = "analyze/batch";
const FALLBACK_DETAIL: &str = "Error processing file. Please try again.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: No response from server. Please check your connection. ({0})")]
    Network(String),
    #[error("Not authorized: {detail}")]
    Unauthorized { detail: String },
    #[error("{detail} (HTTP {status})")]
    Server { status: u16, detail: String },
    #[error("Request error: {0}")]
    Request(String),
    #[error("Invalid response from analysis service: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub csv_text: String,
    pub column: String,
}

pub trait UploadTransport {
    fn submit(
        &self,
        request: &UploadRequest,
        access_token: Option<&str>,
    ) -> Result<BatchResponse, TransportError>;
}

pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint(BATCH_ENDPOINT),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl UploadTransport for HttpTransport {
    fn submit(
        &self,
        request: &UploadRequest,
        access_token: Option<&str>,
    ) -> Result<BatchResponse, TransportError> {
        let part = Part::text(request.csv_text.clone())
            .file_name(request.file_name.clone())
            .mime_str("text/csv")
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("columnName", request.column.clone());

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }

        info!(
            "Submitting '{}' ({} bytes, column '{}') to {}",
            request.file_name,
            request.csv_text.len(),
            request.column,
            self.endpoint
        );
        let response = builder.send().map_err(|err| {
            if err.is_connect() || err.is_timeout() {
                TransportError::Network(err.to_string())
            } else {
                TransportError::Request(err.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| TransportError::InvalidResponse(err.to_string()))?;
        debug!("Analysis service answered {status} with {} byte(s)", body.len());
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }
        serde_json::from_str(&body).map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }
}

/// Maps a non-success response to a [`TransportError`], preferring the
/// service's own `detail` message when the body carries one.
pub fn classify_failure(status: StatusCode, body: &str) -> TransportError {
    let detail = extract_detail(body).unwrap_or_else(|| FALLBACK_DETAIL.to_string());
    if status == StatusCode::UNAUTHORIZED {
        TransportError::Unauthorized { detail }
    } else {
        TransportError::Server {
            status: status.as_u16(),
            detail,
        }
    }
}

fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        serde_json::Value::String(_) | serde_json::Value::Null => None,
        // Validation failures come back as a list of objects.
        other => Some(other.to_string()),
    }
}
