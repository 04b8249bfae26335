use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PropertyId, Source};
use crate::error::JobError;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Allowed edges: pending -> in_progress -> completed | failed
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::InProgress, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Submission payload accepted from the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub url: String,
    pub source: Source,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default, alias = "property_id")]
    pub external_property_id: Option<i64>,
    #[serde(default, alias = "task_id")]
    pub external_task_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: JobId,
    pub url: String,
    pub source: Source,
    pub status: JobStatus,
    pub callback_url: Option<String>,
    pub external_property_id: Option<i64>,
    pub external_task_id: Option<i64>,
    /// Store id of the record this job produced
    pub property_id: Option<PropertyId>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScrapeJob {
    pub fn new(id: JobId, request: JobRequest) -> Self {
        let now = Utc::now();
        Self {
            id,
            url: request.url,
            source: request.source,
            status: JobStatus::Pending,
            callback_url: request.callback_url,
            external_property_id: request.external_property_id,
            external_task_id: request.external_task_id,
            property_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition_to(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition_to(JobStatus::InProgress)
    }

    /// Completion always carries the persisted record's id
    pub fn complete(&mut self, property_id: PropertyId) -> Result<(), JobError> {
        self.transition_to(JobStatus::Completed)?;
        self.property_id = Some(property_id);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition_to(JobStatus::Failed)?;
        self.error = Some(message.into());
        Ok(())
    }
}
