//! Upload-flow state.
//!
//! [`SessionContext`] holds everything that outlives a single upload: the
//! access token and the most recent analysis report. It is created when a
//! session starts and cleared on logout or when results are dismissed.
//!
//! [`UploadSession`] sequences upload attempts. Each attempt gets a ticket
//! with a strictly increasing sequence number, and only the outcome of the
//! most recently started attempt is recorded. A slow attempt that finishes
//! after a newer one was started is discarded.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::analysis::AnalysisReport;

#[derive(Debug, Default)]
pub struct SessionContext {
    access_token: Option<String>,
    report: Option<AnalysisReport>,
    uploads: UploadSession,
}

impl SessionContext {
    pub fn start(access_token: Option<String>) -> Self {
        let access_token = access_token.filter(|token| !token.trim().is_empty());
        debug!(
            "Session started ({})",
            if access_token.is_some() {
                "authenticated"
            } else {
                "anonymous"
            }
        );
        Self {
            access_token,
            ..Self::default()
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    pub fn uploads(&self) -> &UploadSession {
        &self.uploads
    }

    pub fn uploads_mut(&mut self) -> &mut UploadSession {
        &mut self.uploads
    }

    pub fn store_report(&mut self, report: AnalysisReport) {
        self.report = Some(report);
    }

    /// Forgets the token after the backend rejected it.
    pub fn revoke_token(&mut self) {
        if self.access_token.take().is_some() {
            info!("Access token rejected; cleared from session");
        }
    }

    pub fn clear_results(&mut self) {
        self.report = None;
        self.uploads.clear();
    }

    pub fn logout(&mut self) {
        self.access_token = None;
        self.clear_results();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTicket {
    sequence: u64,
    label: String,
    started_at: DateTime<Utc>,
}

impl AttemptTicket {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded { message: String },
    Failed { message: String },
}

impl AttemptOutcome {
    pub fn message(&self) -> &str {
        match self {
            AttemptOutcome::Succeeded { message } | AttemptOutcome::Failed { message } => message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedAttempt {
    pub ticket: AttemptTicket,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Default)]
pub struct UploadSession {
    next_sequence: u64,
    in_flight: Option<AttemptTicket>,
    last: Option<CompletedAttempt>,
}

impl UploadSession {
    pub fn begin(&mut self, label: impl Into<String>) -> AttemptTicket {
        self.next_sequence += 1;
        let ticket = AttemptTicket {
            sequence: self.next_sequence,
            label: label.into(),
            started_at: Utc::now(),
        };
        if let Some(previous) = self.in_flight.replace(ticket.clone()) {
            debug!(
                "Attempt #{} ({}) superseded by #{}",
                previous.sequence, previous.label, ticket.sequence
            );
        }
        ticket
    }

    pub fn is_current(&self, ticket: &AttemptTicket) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|current| current.sequence == ticket.sequence)
    }

    /// Records the outcome if `ticket` is still the latest attempt.
    /// Returns `false` when the outcome was stale and discarded.
    pub fn complete(&mut self, ticket: &AttemptTicket, outcome: AttemptOutcome) -> bool {
        if !self.is_current(ticket) {
            debug!(
                "Discarding stale outcome of attempt #{} ({})",
                ticket.sequence, ticket.label
            );
            return false;
        }
        self.in_flight = None;
        self.last = Some(CompletedAttempt {
            ticket: ticket.clone(),
            outcome,
        });
        true
    }

    pub fn in_flight(&self) -> Option<&AttemptTicket> {
        self.in_flight.as_ref()
    }

    pub fn last(&self) -> Option<&CompletedAttempt> {
        self.last.as_ref()
    }

    /// Drops pending and completed state; sequence numbers keep increasing.
    pub fn clear(&mut self) {
        self.in_flight = None;
        self.last = None;
    }
}
