pub mod browser;
pub mod dom;
pub mod media;
pub mod onthemarket;
pub mod rightmove;
pub mod traits;
pub mod types;
pub mod wait;
pub mod zoopla;

pub use browser::{BrowserSettings, ChromeLauncher};
pub use onthemarket::OnTheMarketRules;
pub use rightmove::RightmoveRules;
pub use traits::{ExtractionRules, PageSession, SessionLauncher};
pub use types::{MediaKind, MediaView, SiteConfig, WaitSettings, WaitStrategy};
pub use zoopla::ZooplaRules;

use scraper::Html;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ScrapeError;
use crate::models::{RawFieldBag, Source};

/// Rule set for each supported source
pub fn rules_for(source: Source) -> &'static dyn ExtractionRules {
    static RIGHTMOVE: RightmoveRules = RightmoveRules;
    static ONTHEMARKET: OnTheMarketRules = OnTheMarketRules;
    static ZOOPLA: ZooplaRules = ZooplaRules;

    match source {
        Source::Rightmove => &RIGHTMOVE,
        Source::OnTheMarket => &ONTHEMARKET,
        Source::Zoopla => &ZOOPLA,
    }
}

/// Per-run scrape tuning
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub wait: WaitSettings,
    /// Rendered HTML snapshots are written here when set
    pub debug_dir: Option<PathBuf>,
}

/// Open a session for `url`, run `f`, and always close the session
pub fn with_session<T>(
    launcher: &dyn SessionLauncher,
    url: &str,
    f: impl FnOnce(&mut dyn PageSession) -> Result<T, ScrapeError>,
) -> Result<T, ScrapeError> {
    let mut session = launcher.open(url)?;
    let result = f(session.as_mut());
    session.close();
    result
}

/// Raw fields of one rendered listing
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedListing {
    /// Canonical listing URL, the record's store key
    pub url: Url,
    pub fields: RawFieldBag,
}

/// Render one listing and pull its raw fields, media views included.
///
/// Blocking: runs navigation and settle sleeps on the calling thread.
pub fn scrape_listing(
    launcher: &dyn SessionLauncher,
    source: Source,
    url: &str,
    options: &ScrapeOptions,
) -> Result<ScrapedListing, ScrapeError> {
    let rules = rules_for(source);
    let config = rules.site_config(url, &options.wait)?;
    let listing_url = config.listing_url.to_string();

    let fields = with_session(launcher, &listing_url, |session| {
        wait::await_ready(session, &config.listing_wait)?;
        let html = session.content()?;
        capture_debug(options, source, "listing", &html);

        let document = Html::parse_document(&html);
        let mut bag = rules.extract_listing(&document, &config);

        for view in &config.media {
            let urls = match &view.url {
                None => rules.extract_media(view.kind, &document, &config),
                Some(view_url) => {
                    debug!("Opening {:?} view {}", view.kind, view_url);
                    session.navigate(view_url.as_str())?;
                    wait::await_ready(session, &view.wait)?;
                    let html = session.content()?;
                    capture_debug(options, source, &format!("{:?}", view.kind).to_lowercase(), &html);
                    rules.extract_media(view.kind, &Html::parse_document(&html), &config)
                }
            };
            match view.kind {
                MediaKind::Images => bag.images = urls,
                MediaKind::Floorplans => bag.floorplans = urls,
            }
        }

        info!(
            "Extracted {} listing: {} images, {} floorplans",
            source,
            bag.images.len(),
            bag.floorplans.len()
        );
        Ok(bag)
    })?;

    Ok(ScrapedListing {
        url: config.listing_url,
        fields,
    })
}

fn capture_debug(options: &ScrapeOptions, source: Source, view: &str, html: &str) {
    let Some(dir) = &options.debug_dir else {
        return;
    };
    let path = dir.join(format!("{source}_{view}.html"));
    let written = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, html));
    match written {
        Ok(()) => debug!("Saved page HTML to {} ({} bytes)", path.display(), html.len()),
        Err(e) => warn!("Could not save debug HTML to {}: {}", path.display(), e),
    }
}
