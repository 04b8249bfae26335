use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

use crate::error::ScrapeError;
use crate::models::{RawFieldBag, Source};
use crate::scrapers::dom::{self, selector};
use crate::scrapers::media::dedupe_media;
use crate::scrapers::traits::ExtractionRules;
use crate::scrapers::types::{MediaKind, MediaView, SiteConfig, WaitSettings, WaitStrategy};

const DOMAIN: &str = "zoopla.co.uk";
const ANCHOR: &str = "main";
const SETTLE: Duration = Duration::from_secs(3);

static LISTING_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/details/(\d+)").expect("valid regex"));

struct Selectors {
    price: Selector,
    address: Selector,
    beds: Selector,
    baths: Selector,
    floor_area: Selector,
    title: Selector,
    agent: Selector,
    description: Selector,
    features: Selector,
    gallery_image: Selector,
    floorplan_image: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    price: selector(r#"[data-testid="price"]"#),
    address: selector(r#"address[data-testid="address-label"], address"#),
    beds: selector(r#"[data-testid="beds-label"]"#),
    baths: selector(r#"[data-testid="baths-label"]"#),
    floor_area: selector(r#"[data-testid="floorarea-label"]"#),
    title: selector(r#"[data-testid="title-label"], h1"#),
    agent: selector(r#"[data-testid="agent-details"] h3, div.agent-details h3"#),
    description: selector(r#"[data-testid="listing_description"]"#),
    features: selector(r#"[data-testid="listing_features"] li"#),
    gallery_image: selector(r#"[data-testid="gallery"] img"#),
    floorplan_image: selector(r#"[data-testid="floorplan"] img"#),
});

/// Rules for zoopla.co.uk listings.
///
/// Zoopla renders the gallery and floorplans inline, so media comes from the
/// listing document itself.
pub struct ZooplaRules;

impl ZooplaRules {
    /// "2 bed flat for sale" -> "2 bed flat"
    fn house_type(document: &Html) -> Option<String> {
        dom::first_text(document, &SELECTORS.title)
            .and_then(|title| title.split(" for ").next().map(|kind| kind.trim().to_string()))
            .filter(|kind| !kind.is_empty())
    }
}

impl ExtractionRules for ZooplaRules {
    fn source(&self) -> Source {
        Source::Zoopla
    }

    fn site_config(&self, url: &str, wait: &WaitSettings) -> Result<SiteConfig, ScrapeError> {
        let listing_url = SiteConfig::parse_listing_url(url, DOMAIN)?;
        let listing_id = LISTING_ID
            .captures(listing_url.path())
            .map(|caps| caps[1].to_string());

        let listing_wait = WaitStrategy::new(ANCHOR, SETTLE, wait);
        let media = [MediaKind::Images, MediaKind::Floorplans]
            .into_iter()
            .map(|kind| MediaView {
                kind,
                url: None,
                wait: listing_wait.clone(),
            })
            .collect();

        Ok(SiteConfig {
            source: Source::Zoopla,
            listing_url,
            listing_id,
            listing_wait,
            media,
        })
    }

    fn extract_listing(&self, document: &Html, _config: &SiteConfig) -> RawFieldBag {
        let bag = RawFieldBag {
            address: dom::first_text(document, &SELECTORS.address),
            price: dom::first_text(document, &SELECTORS.price),
            bedrooms: dom::first_text(document, &SELECTORS.beds),
            bathrooms: dom::first_text(document, &SELECTORS.baths),
            size: dom::first_text(document, &SELECTORS.floor_area),
            house_type: Self::house_type(document),
            agent: dom::first_text(document, &SELECTORS.agent),
            description: document
                .select(&SELECTORS.description)
                .map(|block| dom::joined_text(block, "\n"))
                .find(|text| !text.is_empty()),
            features: dom::all_texts(document, &SELECTORS.features),
            images: Vec::new(),
            floorplans: Vec::new(),
        };
        debug!(price = ?bag.price, address = ?bag.address, "Extracted Zoopla listing fields");
        bag
    }

    fn extract_media(&self, kind: MediaKind, document: &Html, config: &SiteConfig) -> Vec<String> {
        let images = match kind {
            MediaKind::Images => &SELECTORS.gallery_image,
            MediaKind::Floorplans => &SELECTORS.floorplan_image,
        };
        dedupe_media(
            document
                .select(images)
                .filter_map(dom::image_source)
                .filter_map(|src| config.resolve(src)),
        )
    }
}
