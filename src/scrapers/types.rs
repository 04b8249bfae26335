use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::ScrapeError;
use crate::models::Source;

/// Wait tuning shared by every site
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSettings {
    /// Upper bound for the anchor element to appear
    pub anchor_timeout: Duration,
    /// Replaces each site's own settle interval when set
    pub settle: Option<Duration>,
    /// Pause after the scroll-to-bottom
    pub after_scroll: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            anchor_timeout: Duration::from_secs(10),
            settle: None,
            after_scroll: Duration::from_secs(2),
        }
    }
}

/// How to decide a view has rendered
#[derive(Debug, Clone, PartialEq)]
pub struct WaitStrategy {
    pub anchor: String,
    pub timeout: Duration,
    pub settle: Duration,
    pub after_scroll: Duration,
    /// Cookie banner button clicked before scrolling, if the site shows one
    pub consent: Option<String>,
}

impl WaitStrategy {
    pub fn new(anchor: &str, site_settle: Duration, settings: &WaitSettings) -> Self {
        Self {
            anchor: anchor.to_string(),
            timeout: settings.anchor_timeout,
            settle: settings.settle.unwrap_or(site_settle),
            after_scroll: settings.after_scroll,
            consent: None,
        }
    }

    pub fn with_consent(mut self, selector: &str) -> Self {
        self.consent = Some(selector.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Images,
    Floorplans,
}

/// Where a listing's media of one kind is rendered
#[derive(Debug, Clone, PartialEq)]
pub struct MediaView {
    pub kind: MediaKind,
    /// Separate gallery URL; `None` means the listing page itself
    pub url: Option<Url>,
    pub wait: WaitStrategy,
}

/// Everything derived once from a listing URL for one job
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub source: Source,
    pub listing_url: Url,
    pub listing_id: Option<String>,
    pub listing_wait: WaitStrategy,
    pub media: Vec<MediaView>,
}

impl SiteConfig {
    /// Parse a listing URL into its canonical form and check it belongs to
    /// `domain`. The canonical form is also the record's store key, so any
    /// fragment (a gallery route, say) is dropped.
    pub fn parse_listing_url(raw: &str, domain: &str) -> Result<Url, ScrapeError> {
        let unsupported = |reason: String| ScrapeError::UnsupportedUrl(format!("{raw}: {reason}"));

        let mut url = Url::parse(raw.trim()).map_err(|e| unsupported(e.to_string()))?;
        url.set_fragment(None);
        if !matches!(url.scheme(), "http" | "https") {
            return Err(unsupported(format!("unsupported scheme {}", url.scheme())));
        }
        let host = url.host_str().unwrap_or_default();
        if host != domain && !host.ends_with(&format!(".{domain}")) {
            return Err(unsupported(format!("expected a {domain} listing")));
        }
        Ok(url)
    }

    /// Absolute form of a possibly relative media reference
    pub fn resolve(&self, reference: &str) -> Option<String> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with("data:") {
            return None;
        }
        self.listing_url.join(reference).ok().map(String::from)
    }
}
