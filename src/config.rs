//! Configuration for ingestion and the analysis API.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```yaml
//! ingest:
//!   min_valid_rows: 250
//!   aliases: [review, feedback]
//! api:
//!   base_url: https://analysis.example.com/api/v1
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_VALID_ROWS: usize = 100;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_ALIASES: [&str; 6] = [
    "review", "reviews", "feedback", "text", "comment", "comments",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Minimum number of rows with a non-empty feedback cell.
    pub min_valid_rows: usize,
    /// Accepted feedback column names, compared lowercase after trimming.
    pub aliases: Vec<String>,
    /// Falls back to the input's extension when absent.
    pub delimiter: Option<char>,
    /// Encoding label understood by `encoding_rs`; UTF-8 when absent.
    pub encoding: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            min_valid_rows: DEFAULT_MIN_VALID_ROWS,
            aliases: DEFAULT_ALIASES.iter().map(|a| a.to_string()).collect(),
            delimiter: None,
            encoding: None,
        }
    }
}

impl IngestConfig {
    pub fn is_alias(&self, header: &str) -> bool {
        let normalized = header.trim().to_lowercase();
        self.aliases.iter().any(|alias| *alias == normalized)
    }

    pub fn delimiter_byte(&self) -> Option<u8> {
        self.delimiter.map(|ch| ch as u8)
    }

    fn normalize(&mut self) -> Result<()> {
        for alias in &mut self.aliases {
            *alias = alias.trim().to_lowercase();
        }
        self.aliases.retain(|alias| !alias.is_empty());
        if self.aliases.is_empty() {
            return Err(anyhow!("At least one feedback column alias must be configured"));
        }
        if self.delimiter.is_some_and(|ch| !ch.is_ascii()) {
            return Err(anyhow!("Delimiter must be ASCII"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let mut config: Config =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config.ingest.normalize()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
