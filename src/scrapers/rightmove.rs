use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ScrapeError;
use crate::models::{RawFieldBag, Source};
use crate::scrapers::dom::{self, selector};
use crate::scrapers::media::dedupe_media;
use crate::scrapers::traits::ExtractionRules;
use crate::scrapers::types::{MediaKind, MediaView, SiteConfig, WaitSettings, WaitStrategy};

const DOMAIN: &str = "rightmove.co.uk";
const ANCHOR: &str = "body";
const CONSENT: &str = "#onetrust-accept-btn-handler";
const SETTLE: Duration = Duration::from_secs(1);

static LISTING_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/properties/(\d+)").expect("valid regex"));
static FLOORPLAN_ALT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)floorplan").expect("valid regex"));
static DESCRIPTION_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)description").expect("valid regex"));
static FEATURES_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)key features").expect("valid regex"));

struct Selectors {
    address: Selector,
    price: Selector,
    key_term: Selector,
    key_term_label: Selector,
    agent: Selector,
    heading: Selector,
    list_item: Selector,
    image: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    address: selector(r#"h1[itemprop="streetAddress"]"#),
    price: selector(r#"div._1gfnqJ3Vtd1z40MlC0MzXu > span, [data-testid="primary-price"] span"#),
    key_term: selector("dt"),
    key_term_label: selector("span"),
    agent: selector("div.aboutAgent h3"),
    heading: selector("h2"),
    list_item: selector("li"),
    image: selector("img"),
});

/// Rules for rightmove.co.uk listings.
///
/// Photos and floorplans render in hash-routed overlays, so each gets its own
/// navigation within the job's session.
pub struct RightmoveRules;

impl RightmoveRules {
    /// Value of the key-facts `dd` whose `dt` label contains `label`
    fn key_fact(document: &Html, label: &str) -> Option<String> {
        document.select(&SELECTORS.key_term).find_map(|dt| {
            let labelled = dt
                .select(&SELECTORS.key_term_label)
                .any(|span| dom::joined_text(span, " ").to_uppercase().contains(label));
            if !labelled {
                return None;
            }
            dom::next_sibling_named(dt, "dd").and_then(dom::element_text)
        })
    }

    fn description(document: &Html) -> Option<String> {
        document
            .select(&SELECTORS.heading)
            .filter(|h2| DESCRIPTION_HEADING.is_match(&dom::joined_text(*h2, " ")))
            .find_map(|h2| dom::next_sibling_named(h2, "div"))
            .map(|div| dom::joined_text(div, "\n"))
            .filter(|text| !text.is_empty())
    }

    fn features(document: &Html) -> Vec<String> {
        document
            .select(&SELECTORS.heading)
            .filter(|h2| FEATURES_HEADING.is_match(&dom::joined_text(*h2, " ")))
            .find_map(|h2| dom::next_sibling_named(h2, "ul"))
            .map(|list| list.select(&SELECTORS.list_item).filter_map(dom::element_text).collect())
            .unwrap_or_default()
    }

    fn gallery_url(listing: &Url, listing_id: &str, route: &str) -> Result<Url, ScrapeError> {
        let raw = format!("/properties/{listing_id}#/{route}");
        listing
            .join(&raw)
            .map_err(|e| ScrapeError::UnsupportedUrl(format!("{listing}: {e}")))
    }
}

impl ExtractionRules for RightmoveRules {
    fn source(&self) -> Source {
        Source::Rightmove
    }

    fn site_config(&self, url: &str, wait: &WaitSettings) -> Result<SiteConfig, ScrapeError> {
        let listing_url = SiteConfig::parse_listing_url(url, DOMAIN)?;
        let listing_id = LISTING_ID
            .captures(listing_url.path())
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ScrapeError::UnsupportedUrl(format!("{url}: no Rightmove property id")))?;

        let view_wait = WaitStrategy::new(ANCHOR, SETTLE, wait);
        let media = vec![
            MediaView {
                kind: MediaKind::Images,
                url: Some(Self::gallery_url(&listing_url, &listing_id, "media?channel=RES_BUY")?),
                wait: view_wait.clone(),
            },
            MediaView {
                kind: MediaKind::Floorplans,
                url: Some(Self::gallery_url(
                    &listing_url,
                    &listing_id,
                    "floorplan?activePlan=1&channel=RES_BUY",
                )?),
                wait: view_wait,
            },
        ];

        Ok(SiteConfig {
            source: Source::Rightmove,
            listing_url,
            listing_id: Some(listing_id),
            listing_wait: WaitStrategy::new(ANCHOR, SETTLE, wait).with_consent(CONSENT),
            media,
        })
    }

    fn extract_listing(&self, document: &Html, _config: &SiteConfig) -> RawFieldBag {
        let bag = RawFieldBag {
            address: dom::first_text(document, &SELECTORS.address),
            price: dom::first_text(document, &SELECTORS.price),
            bedrooms: Self::key_fact(document, "BEDROOMS"),
            bathrooms: Self::key_fact(document, "BATHROOMS"),
            size: Self::key_fact(document, "SIZE"),
            house_type: Self::key_fact(document, "PROPERTY TYPE"),
            agent: dom::first_text(document, &SELECTORS.agent),
            description: Self::description(document),
            features: Self::features(document),
            images: Vec::new(),
            floorplans: Vec::new(),
        };
        debug!(price = ?bag.price, address = ?bag.address, "Extracted Rightmove listing fields");
        bag
    }

    fn extract_media(&self, kind: MediaKind, document: &Html, config: &SiteConfig) -> Vec<String> {
        let urls = document.select(&SELECTORS.image).filter_map(|img| {
            let src = img.value().attr("src")?;
            if !src.contains("media") {
                return None;
            }
            let wanted = match kind {
                // max_ variants are oversized duplicates of the same photo
                MediaKind::Images => !src.contains("max_"),
                MediaKind::Floorplans => img.value().attr("alt").is_some_and(|alt| FLOORPLAN_ALT.is_match(alt)),
            };
            if wanted {
                config.resolve(src)
            } else {
                None
            }
        });
        dedupe_media(urls)
    }
}
