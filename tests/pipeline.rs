mod common;

use async_trait::async_trait;
use common::{FixtureLauncher, RecordingNotifier};
use listing_scout::error::{JobError, PipelineError, StoreError};
use listing_scout::jobs::{CallbackPayload, JobRunner};
use listing_scout::models::{JobId, ScrapeJob};
use listing_scout::store::{JobStore, PropertyStore, RecordStore};
use listing_scout::{JobRequest, JobStatus, Source};
use std::sync::Arc;

const OTM_LISTING: &str = "https://www.onthemarket.com/details/14627179/";
const OTM_PHOTOS: &str = "https://www.onthemarket.com/details/14627179/#/photos/1";
const OTM_FLOORPLANS: &str = "https://www.onthemarket.com/details/14627179/#/floorplans/1";

const RM_LISTING: &str = "https://www.rightmove.co.uk/properties/123456";
const RM_MEDIA: &str = "https://www.rightmove.co.uk/properties/123456#/media?channel=RES_BUY";
const RM_FLOORPLAN: &str = "https://www.rightmove.co.uk/properties/123456#/floorplan?activePlan=1&channel=RES_BUY";

const ZOOPLA_LISTING: &str = "https://www.zoopla.co.uk/for-sale/details/66012345/";

const CALLBACK: &str = "https://crm.example.test/hooks/scrape";

fn onthemarket_pages() -> FixtureLauncher {
    FixtureLauncher::new(&[
        (OTM_LISTING, include_str!("fixtures/onthemarket_listing.html")),
        (OTM_PHOTOS, include_str!("fixtures/onthemarket_photos.html")),
        (OTM_FLOORPLANS, include_str!("fixtures/onthemarket_floorplans.html")),
    ])
}

fn request(url: &str, source: Source) -> JobRequest {
    JobRequest {
        url: url.to_string(),
        source,
        callback_url: Some(CALLBACK.to_string()),
        external_property_id: Some(501),
        external_task_id: Some(77),
    }
}

/// (stage, progress) of every progress callback, in send order
fn progress_steps(notifier: &RecordingNotifier) -> Vec<(String, u8)> {
    notifier
        .payloads()
        .into_iter()
        .filter_map(|payload| match payload {
            CallbackPayload::Progress { progress, .. } => Some((progress.stage, progress.progress)),
            CallbackPayload::Terminal { .. } => None,
        })
        .collect()
}

fn terminal(notifier: &RecordingNotifier) -> CallbackPayload {
    notifier.payloads().last().cloned().expect("terminal callback")
}

#[tokio::test]
async fn onthemarket_listing_completes_end_to_end() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    assert_eq!(runner.status(job_id).await.unwrap(), JobStatus::Pending);

    let job = runner.run(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error, None);

    let stored = runner.result(job_id).await.unwrap().expect("stored record");
    assert_eq!(job.property_id, Some(stored.id));
    let record = &stored.record;
    assert_eq!(record.source, Source::OnTheMarket);
    assert_eq!(record.url, OTM_LISTING);
    assert_eq!(record.address, "Church Street, Bath BA1");
    assert_eq!(record.price.to_string(), "350000.00");
    assert_eq!(record.bedrooms, Some(2));
    assert_eq!(record.bathrooms, Some(1));
    assert_eq!(record.size.as_deref(), Some("742 sq ft"));
    assert_eq!(record.agent, None);
    assert_eq!(record.features.len(), 3);
    assert_eq!(
        record.images,
        vec![
            "https://media.onthemarket.com/properties/14627179/1234-0-1024x1024.jpg",
            "https://media.onthemarket.com/properties/14627179/1234-1-1024x1024.jpg",
        ]
    );
    assert_eq!(
        record.floorplans,
        vec!["https://media.onthemarket.com/properties/14627179/1234-fp-0.gif"]
    );

    assert_eq!(
        progress_steps(&notifier),
        vec![("scraping".to_string(), 10), ("scraping".to_string(), 100)]
    );
    assert_eq!(
        terminal(&notifier),
        CallbackPayload::Terminal {
            job_id,
            property_id: Some(stored.id),
            task_id: Some(77),
        }
    );
    assert!(notifier.sent().iter().all(|(url, _)| url == CALLBACK));

    // One session for the listing and both gallery routes
    assert_eq!(launcher.opened(), 1);
    assert_eq!(launcher.closed(), 1);
    assert_eq!(launcher.visited(), vec![OTM_LISTING, OTM_FLOORPLANS, OTM_PHOTOS]);
}

#[tokio::test]
async fn unparseable_price_fails_without_writing() {
    let launcher = Arc::new(FixtureLauncher::new(&[
        (RM_LISTING, include_str!("fixtures/rightmove_poa.html")),
        (RM_MEDIA, include_str!("fixtures/rightmove_gallery.html")),
        (RM_FLOORPLAN, include_str!("fixtures/rightmove_gallery.html")),
    ]));
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(RM_LISTING, Source::Rightmove)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("Price on application"));
    assert_eq!(job.property_id, None);
    assert!(store.find_by_url(RM_LISTING).await.unwrap().is_none());
    assert!(runner.result(job_id).await.unwrap().is_none());

    let steps = progress_steps(&notifier);
    assert_eq!(steps.last(), Some(&("error".to_string(), 0)));
    assert_eq!(
        terminal(&notifier),
        CallbackPayload::Terminal {
            job_id,
            property_id: None,
            task_id: Some(77),
        }
    );
    assert_eq!(launcher.opened(), launcher.closed());
}

#[tokio::test]
async fn rightmove_listing_collects_gallery_and_floorplans() {
    let launcher = Arc::new(FixtureLauncher::new(&[
        (RM_LISTING, include_str!("fixtures/rightmove_listing.html")),
        (RM_MEDIA, include_str!("fixtures/rightmove_gallery.html")),
        (RM_FLOORPLAN, include_str!("fixtures/rightmove_floorplan.html")),
    ]));
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(RM_LISTING, Source::Rightmove)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let record = runner.result(job_id).await.unwrap().unwrap().record;
    assert_eq!(record.address, "Flat 4, 18 Queen Square, Bristol BS1");
    assert_eq!(record.price.to_string(), "1250000.00");
    assert_eq!((record.bedrooms, record.bathrooms), (Some(3), Some(2)));
    assert_eq!(record.house_type.as_deref(), Some("Penthouse"));
    assert_eq!(record.agent.as_deref(), Some("Queen Square Estates"));
    assert_eq!(record.features, vec!["Roof terrace", "Lift access"]);
    assert_eq!(
        record.images,
        vec![
            "https://media.rightmove.co.uk/dir/crop/10:9-16:9/property-photo/1a2b/123456/IMG_00_0000.jpeg",
            "https://media.rightmove.co.uk/dir/crop/10:9-16:9/property-photo/1a2b/123456/IMG_01_0000.jpeg",
        ]
    );
    assert_eq!(
        record.floorplans,
        vec!["https://media.rightmove.co.uk/dir/property-floorplan/1a2b/123456/FLP_00_0000.png"]
    );

    assert_eq!(launcher.visited(), vec![RM_LISTING, RM_MEDIA, RM_FLOORPLAN]);
    assert_eq!((launcher.opened(), launcher.closed()), (1, 1));
}

#[tokio::test]
async fn url_variants_share_one_record() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher, store.clone(), notifier);

    let mut ids = Vec::new();
    for url in [
        OTM_LISTING,
        " https://www.onthemarket.com/details/14627179/ ",
        "https://WWW.onthemarket.com/details/14627179/#/photos/1",
    ] {
        let job_id = runner.submit(request(url, Source::OnTheMarket)).await.unwrap();
        let job = runner.run(job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed, "url {url:?}");
        ids.push(job.property_id.unwrap());
    }

    assert!(ids.iter().all(|id| *id == ids[0]));
    let stored = PropertyStore::get(store.as_ref(), ids[0]).await.unwrap().unwrap();
    assert_eq!(stored.record.url, OTM_LISTING);
}

/// Job store whose saves of completed jobs always fail
struct CompletionLostStore(Arc<RecordStore>);

#[async_trait]
impl JobStore for CompletionLostStore {
    async fn create(&self, request: JobRequest) -> Result<ScrapeJob, StoreError> {
        self.0.create(request).await
    }

    async fn get(&self, id: JobId) -> Result<Option<ScrapeJob>, StoreError> {
        JobStore::get(self.0.as_ref(), id).await
    }

    async fn save(&self, job: &ScrapeJob) -> Result<(), StoreError> {
        if job.status == JobStatus::Completed {
            return Err(StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.0.save(job).await
    }
}

#[tokio::test]
async fn unrecorded_completion_fails_the_job() {
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = JobRunner::new(
        Arc::new(onthemarket_pages()),
        Arc::new(CompletionLostStore(store.clone())),
        store.clone(),
        notifier.clone(),
        common::fast_options(),
    );

    let job_id = runner.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("disk full"));
    assert_eq!(runner.status(job_id).await.unwrap(), JobStatus::Failed);
    // The record was written before the job state; a rerun updates it in place
    assert!(store.find_by_url(OTM_LISTING).await.unwrap().is_some());

    assert_eq!(progress_steps(&notifier).last(), Some(&("error".to_string(), 0)));
    assert_eq!(
        terminal(&notifier),
        CallbackPayload::Terminal {
            job_id,
            property_id: None,
            task_id: Some(77),
        }
    );
}

#[tokio::test]
async fn rescraping_a_url_updates_the_same_record() {
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());

    let first = common::runner(Arc::new(onthemarket_pages()), store.clone(), notifier.clone());
    let job_id = first.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    let first_id = first.run(job_id).await.unwrap().property_id.unwrap();

    let reduced = include_str!("fixtures/onthemarket_listing.html").replace("£350,000", "£335,000");
    let second = common::runner(
        Arc::new(FixtureLauncher::new(&[
            (OTM_LISTING, reduced.as_str()),
            (OTM_PHOTOS, include_str!("fixtures/onthemarket_photos.html")),
            (OTM_FLOORPLANS, include_str!("fixtures/onthemarket_floorplans.html")),
        ])),
        store.clone(),
        notifier.clone(),
    );
    let job_id = second.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    let updated = second.run(job_id).await.unwrap().property_id.unwrap();

    assert_eq!(updated, first_id);
    let stored = store.find_by_url(OTM_LISTING).await.unwrap().unwrap();
    assert_eq!(stored.id, first_id);
    assert_eq!(stored.record.price.to_string(), "335000.00");
}

#[tokio::test]
async fn zoopla_reads_media_from_the_listing_page() {
    let launcher = Arc::new(FixtureLauncher::new(&[(
        ZOOPLA_LISTING,
        include_str!("fixtures/zoopla_listing.html"),
    )]));
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(ZOOPLA_LISTING, Source::Zoopla)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let record = runner.result(job_id).await.unwrap().unwrap().record;
    assert_eq!(record.price.to_string(), "289950.00");
    assert_eq!(record.bedrooms, Some(3));
    assert_eq!(record.agent.as_deref(), Some("Peak Estates"));
    assert_eq!(record.images.len(), 2);
    assert!(record.floorplans.is_empty());
    assert_eq!(launcher.visited(), vec![ZOOPLA_LISTING]);
}

#[tokio::test]
async fn missing_anchor_times_out_and_fails_the_job() {
    let launcher = Arc::new(FixtureLauncher::new(&[(
        ZOOPLA_LISTING,
        "<html><body><div id=\"__next\">Loading...</div></body></html>",
    )]));
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(ZOOPLA_LISTING, Source::Zoopla)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("main"));
    assert_eq!(launcher.opened(), 1);
    assert_eq!(launcher.closed(), 1);
}

#[tokio::test]
async fn browser_launch_failure_fails_the_job() {
    let launcher = Arc::new(FixtureLauncher::failing());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("chrome binary not found"));
    assert_eq!(launcher.opened(), 0);
}

#[tokio::test]
async fn unsupported_url_fails_before_launching() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store.clone(), notifier.clone());

    let job_id = runner
        .submit(request("https://www.onthemarket.com/for-sale/property/bath/", Source::OnTheMarket))
        .await
        .unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("property id not found"));
    assert_eq!(launcher.opened(), 0);
}

#[tokio::test]
async fn callback_failures_do_not_change_the_outcome() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::failing());
    let runner = common::runner(launcher, store, notifier.clone());

    let job_id = runner.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    let job = runner.run(job_id).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    // 10, 100, terminal: every attempt is still made
    assert_eq!(notifier.sent().len(), 3);
}

#[tokio::test]
async fn jobs_without_callback_url_send_nothing() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher, store, notifier.clone());

    let mut req = request(OTM_LISTING, Source::OnTheMarket);
    req.callback_url = None;
    let job_id = runner.submit(req).await.unwrap();

    assert_eq!(runner.run(job_id).await.unwrap().status, JobStatus::Completed);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn terminal_jobs_cannot_be_rerun() {
    let launcher = Arc::new(onthemarket_pages());
    let store = Arc::new(RecordStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let runner = common::runner(launcher.clone(), store, notifier.clone());

    let job_id = runner.submit(request(OTM_LISTING, Source::OnTheMarket)).await.unwrap();
    runner.run(job_id).await.unwrap();
    let sent = notifier.sent().len();

    let err = runner.run(job_id).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Job(JobError::InvalidTransition {
            from: JobStatus::Completed,
            to: JobStatus::InProgress,
            ..
        })
    ));
    assert_eq!(runner.status(job_id).await.unwrap(), JobStatus::Completed);
    assert_eq!(launcher.opened(), 1);
    assert_eq!(notifier.sent().len(), sent);
}

#[tokio::test]
async fn unknown_job_is_reported() {
    let runner = common::runner(
        Arc::new(FixtureLauncher::default()),
        Arc::new(RecordStore::in_memory()),
        Arc::new(RecordingNotifier::default()),
    );

    assert!(matches!(
        runner.status(42).await,
        Err(PipelineError::Job(JobError::NotFound(42)))
    ));
    assert!(matches!(
        runner.run(42).await,
        Err(PipelineError::Job(JobError::NotFound(42)))
    ));
}
