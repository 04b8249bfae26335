use std::time::Duration;

use thiserror::Error;

use crate::models::{JobId, JobStatus};

/// Failures while driving the browser or reading a listing
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    NavigationTimeout { selector: String, timeout: Duration },

    #[error("unsupported listing url: {0}")]
    UnsupportedUrl(String),

    #[error("scrape worker failed: {0}")]
    Worker(String),
}

/// A raw field bag that cannot become a canonical record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {0} not found")]
    NotFound(JobId),
}

#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback rejected with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Everything that can end a job in the failed state
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error("persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Job(#[from] JobError),
}
