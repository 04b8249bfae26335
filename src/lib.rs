//! Scrape property listings from JavaScript-rendered portals into canonical
//! records, one headless browser session per job.

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod normalize;
pub mod scrapers;
pub mod store;

pub use error::{NormalizationError, PipelineError, ScrapeError};
pub use jobs::JobRunner;
pub use models::{JobRequest, JobStatus, PropertyRecord, RawFieldBag, Source};
