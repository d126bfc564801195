use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::summary::RunSummary;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid backfill window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Article already stored: {0}")]
    DuplicateUrl(String),

    /// A persistence failure stopped the run. Everything counted in `summary`
    /// was committed before the failure and stays durable.
    #[error("Collection run aborted after saving {} articles: {source}", summary.saved)]
    RunAborted {
        summary: Box<RunSummary>,
        #[source]
        source: Box<Error>,
    },

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Partial run statistics, if this error aborted a collection run.
    pub fn partial_summary(&self) -> Option<&RunSummary> {
        match self {
            Error::RunAborted { summary, .. } => Some(summary),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
