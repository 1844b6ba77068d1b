//! Interpretation of the batch-analysis response.
//!
//! The backend answers `POST /analyze/batch` with a JSON document whose
//! `results` object carries per-topic sentiment counts and the paths of
//! rendered visualizations. Only the fields needed for the terminal summary
//! are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::ingest::FilteredPayload;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub results: Option<BatchResults>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchResults {
    #[serde(default)]
    pub topic_sentiment: Vec<TopicSentiment>,
    #[serde(default)]
    pub visualizations: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicSentiment {
    #[serde(default)]
    pub topic_label: String,
    #[serde(default)]
    pub positive_count: u64,
    #[serde(default)]
    pub negative_count: u64,
    #[serde(default)]
    pub total_documents: u64,
    #[serde(default)]
    pub topic_keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SentimentTotals {
    pub positive: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub name: String,
    pub positive: u64,
    pub negative: u64,
    pub total: u64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub processed_rows: usize,
}

impl From<&FilteredPayload> for RowCounts {
    fn from(payload: &FilteredPayload) -> Self {
        Self {
            total_rows: payload.total_rows,
            dropped_rows: payload.dropped_rows,
            processed_rows: payload.kept_rows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub sentiment: SentimentTotals,
    pub topics: Vec<TopicSummary>,
    pub visualizations: Vec<String>,
    pub rows: RowCounts,
}

impl AnalysisReport {
    pub fn from_response(response: &BatchResponse, rows: RowCounts) -> Self {
        let Some(results) = response.results.as_ref() else {
            return Self {
                rows,
                ..Self::default()
            };
        };

        let sentiment = results
            .topic_sentiment
            .iter()
            .fold(SentimentTotals::default(), |mut acc, topic| {
                acc.positive += topic.positive_count;
                acc.negative += topic.negative_count;
                acc
            });
        let topics = results
            .topic_sentiment
            .iter()
            .map(|topic| TopicSummary {
                name: topic.topic_label.clone(),
                positive: topic.positive_count,
                negative: topic.negative_count,
                total: topic.total_documents,
                keywords: topic.topic_keywords.clone(),
            })
            .collect();
        let visualizations = results
            .visualizations
            .iter()
            .map(|path| static_path(path.as_str()))
            .collect();

        Self {
            sentiment,
            topics,
            visualizations,
            rows,
        }
    }

    pub fn success_message(&self) -> String {
        if self.rows.dropped_rows > 0 {
            format!(
                "File analyzed successfully! {} empty rows were removed from {} total rows.",
                self.rows.dropped_rows, self.rows.total_rows
            )
        } else {
            "File analyzed successfully!".to_string()
        }
    }
}

/// Visualization paths are served from `/static`.
pub fn static_path(path: &str) -> String {
    if path.starts_with("/static") {
        path.to_string()
    } else {
        format!("/static/{}", path.trim_start_matches('/'))
    }
}
