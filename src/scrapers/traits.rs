use scraper::Html;
use std::time::Duration;

use crate::error::ScrapeError;
use crate::models::{RawFieldBag, Source};
use crate::scrapers::types::{MediaKind, SiteConfig, WaitSettings};

/// One live, rendered browser page owned by a single job
pub trait PageSession {
    /// Load `url` in the session's tab and wait for the navigation to settle
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Block until `selector` matches, failing with `NavigationTimeout`
    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Evaluate a script in the page, discarding its result
    fn run_script(&mut self, script: &str) -> Result<(), ScrapeError>;

    /// Serialized DOM of the current page
    fn content(&mut self) -> Result<String, ScrapeError>;

    /// Tear the session down. Dropping a session releases it too.
    fn close(self: Box<Self>);
}

/// Starts browser sessions, one per job
pub trait SessionLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn PageSession>, ScrapeError>;
}

/// Site specific field rules over a rendered document.
///
/// Rules are stateless; everything derived from the listing URL lives in the
/// `SiteConfig` handed to each call. A rule that matches nothing leaves its
/// field empty instead of failing.
pub trait ExtractionRules: Send + Sync {
    fn source(&self) -> Source;

    /// Derive sub-view URLs and wait settings for one listing
    fn site_config(&self, url: &str, wait: &WaitSettings) -> Result<SiteConfig, ScrapeError>;

    fn extract_listing(&self, document: &Html, config: &SiteConfig) -> RawFieldBag;

    fn extract_media(&self, kind: MediaKind, document: &Html, config: &SiteConfig) -> Vec<String>;
}
