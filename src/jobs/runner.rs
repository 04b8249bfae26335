use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::error::{JobError, PipelineError, ScrapeError};
use crate::jobs::callback::{
    self, CallbackPayload, DeliveryOutcome, ProgressUpdate, STAGE_ERROR, STAGE_SCRAPING,
};
use crate::models::{JobId, JobRequest, JobStatus, PropertyId, ScrapeJob, StoredProperty};
use crate::normalize::normalize;
use crate::scrapers::{self, ScrapeOptions, SessionLauncher};
use crate::store::{JobStore, PropertyStore};

/// Drives scrape jobs from `pending` to a terminal state.
///
/// One `run` call owns its job and its browser session for the whole run;
/// several runs may proceed at once on separate jobs.
pub struct JobRunner {
    launcher: Arc<dyn SessionLauncher>,
    jobs: Arc<dyn JobStore>,
    properties: Arc<dyn PropertyStore>,
    notifier: Arc<dyn callback::Notifier>,
    options: ScrapeOptions,
}

impl JobRunner {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        jobs: Arc<dyn JobStore>,
        properties: Arc<dyn PropertyStore>,
        notifier: Arc<dyn callback::Notifier>,
        options: ScrapeOptions,
    ) -> Self {
        Self {
            launcher,
            jobs,
            properties,
            notifier,
            options,
        }
    }

    /// Record a new pending job and hand back its id
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, PipelineError> {
        let job = self.jobs.create(request).await?;
        info!(job_id = job.id, source = %job.source, url = %job.url, "Scrape job submitted");
        Ok(job.id)
    }

    pub async fn status(&self, job_id: JobId) -> Result<JobStatus, PipelineError> {
        Ok(self.load(job_id).await?.status)
    }

    /// The stored record of a completed job; `None` while it is not completed
    pub async fn result(&self, job_id: JobId) -> Result<Option<StoredProperty>, PipelineError> {
        let job = self.load(job_id).await?;
        match (job.status, job.property_id) {
            (JobStatus::Completed, Some(property_id)) => Ok(self.properties.get(property_id).await?),
            _ => Ok(None),
        }
    }

    /// Run a pending job to completion or failure.
    ///
    /// Scrape, normalization and persistence errors end the job as `failed`
    /// and are not returned; `Err` means the job itself could not be loaded
    /// or its failed state could not be recorded either.
    #[instrument(skip(self), fields(source = tracing::field::Empty, url = tracing::field::Empty))]
    pub async fn run(&self, job_id: JobId) -> Result<ScrapeJob, PipelineError> {
        let mut job = self.load(job_id).await?;
        tracing::Span::current()
            .record("source", job.source.as_str())
            .record("url", job.url.as_str());

        job.start()?;
        self.jobs.save(&job).await?;
        info!("Job started");

        self.progress(&job, ProgressUpdate::new(STAGE_SCRAPING, "Fetching details", 10))
            .await;

        let outcome = match self.process(&job).await {
            Ok(stored) => self.record_completion(&job, stored.id).await,
            Err(e) => Err(e),
        };

        let mut unrecorded = None;
        match outcome {
            Ok(completed) => {
                job = completed;
                info!(property_id = ?job.property_id, "✅ Job completed");
            }
            Err(e) => {
                let message = e.to_string();
                error!("Job failed: {}", message);
                self.progress(&job, ProgressUpdate::new(STAGE_ERROR, message.clone(), 0))
                    .await;
                job.fail(message)?;
                if let Err(e) = self.jobs.save(&job).await {
                    error!("Could not record failure of job {}: {}", job.id, e);
                    unrecorded = Some(e);
                }
            }
        }

        let terminal = CallbackPayload::Terminal {
            job_id: job.id,
            property_id: job.property_id,
            task_id: job.external_task_id,
        };
        match callback::deliver(self.notifier.as_ref(), job.callback_url.as_deref(), &terminal).await {
            DeliveryOutcome::Delivered => info!("Terminal callback sent for job {}", job.id),
            DeliveryOutcome::Skipped => {}
            DeliveryOutcome::Failed(reason) => warn!("Failed to send callback: {}", reason),
        }

        match unrecorded {
            Some(e) => Err(e.into()),
            None => Ok(job),
        }
    }

    /// Scrape, normalize, persist under the canonical listing URL
    async fn process(&self, job: &ScrapeJob) -> Result<StoredProperty, PipelineError> {
        let launcher = Arc::clone(&self.launcher);
        let options = self.options.clone();
        let (source, url) = (job.source, job.url.clone());

        // The browser pipeline blocks for its whole run
        let scraped = tokio::task::spawn_blocking(move || {
            scrapers::scrape_listing(launcher.as_ref(), source, &url, &options)
        })
        .await
        .map_err(|e| ScrapeError::Worker(e.to_string()))??;

        self.progress(job, ProgressUpdate::new(STAGE_SCRAPING, "Fetching completed", 100))
            .await;

        let record = normalize(job.source, scraped.url.as_str(), &scraped.fields)?;
        Ok(self.properties.upsert(record).await?)
    }

    /// Persist the completed state; on error the in-progress job is untouched
    /// and can still be failed. The record itself stays stored.
    async fn record_completion(
        &self,
        job: &ScrapeJob,
        property_id: PropertyId,
    ) -> Result<ScrapeJob, PipelineError> {
        let mut completed = job.clone();
        completed.complete(property_id)?;
        self.jobs.save(&completed).await?;
        Ok(completed)
    }

    async fn progress(&self, job: &ScrapeJob, update: ProgressUpdate) {
        let payload = CallbackPayload::Progress {
            job_id: job.id,
            progress: update,
        };
        if let DeliveryOutcome::Failed(reason) =
            callback::deliver(self.notifier.as_ref(), job.callback_url.as_deref(), &payload).await
        {
            warn!("Progress update dropped: {}", reason);
        }
    }

    async fn load(&self, job_id: JobId) -> Result<ScrapeJob, PipelineError> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or_else(|| JobError::NotFound(job_id).into())
    }
}
