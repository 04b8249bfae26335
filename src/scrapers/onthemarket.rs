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

const DOMAIN: &str = "onthemarket.com";
const ANCHOR: &str = "body";
const CONSENT: &str = "#onetrust-accept-btn-handler";
const SETTLE: Duration = Duration::from_secs(2);

static LISTING_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/details/(\d+)").expect("valid regex"));
static SIZE_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\d+\s*(sq ft|sq m)").expect("valid regex"));

struct Selectors {
    price: Selector,
    address: Selector,
    icon_feature: Selector,
    div: Selector,
    house_type: Selector,
    agent: Selector,
    description: Selector,
    features: Selector,
    slide_image: Selector,
    floorplan_image: Selector,
}

static SELECTORS: Lazy<Selectors> = Lazy::new(|| Selectors {
    price: selector("div.otm-Price a.price"),
    address: selector("div.text-slate.h4.font-normal.leading-none.font-heading"),
    icon_feature: selector("div.otm-IconFeatures div.flex.items-center"),
    div: selector("div"),
    house_type: selector("div.otm-PropertyIcon"),
    agent: selector("section.agent-website-button a"),
    description: selector("section.property-description div.text-base.text-slate"),
    features: selector("section.otm-FeaturesList li"),
    slide_image: selector("li.slide picture img"),
    floorplan_image: selector(r#"div.carousel-root.floorplans img[alt="Floorplan"]"#),
});

/// Rules for onthemarket.com listings.
///
/// The photo and floorplan carousels are separate hash routes under
/// `/details/<id>/`.
pub struct OnTheMarketRules;

impl OnTheMarketRules {
    /// Text of the icon feature row tagged with svg `data-icon="<icon>"`
    fn icon_feature(document: &Html, icon: &str) -> Option<String> {
        let icon_selector = selector(&format!(r#"svg[data-icon="{icon}"]"#));
        document
            .select(&SELECTORS.icon_feature)
            .find(|item| item.select(&icon_selector).next().is_some())
            .and_then(dom::element_text)
    }

    fn size(document: &Html) -> Option<String> {
        document
            .select(&SELECTORS.div)
            .map(dom::own_text)
            .find(|text| SIZE_TEXT.is_match(text))
    }

    fn view_url(listing: &Url, listing_id: &str, route: &str) -> Result<Url, ScrapeError> {
        listing
            .join(&format!("/details/{listing_id}/#/{route}"))
            .map_err(|e| ScrapeError::UnsupportedUrl(format!("{listing}: {e}")))
    }
}

impl ExtractionRules for OnTheMarketRules {
    fn source(&self) -> Source {
        Source::OnTheMarket
    }

    fn site_config(&self, url: &str, wait: &WaitSettings) -> Result<SiteConfig, ScrapeError> {
        let listing_url = SiteConfig::parse_listing_url(url, DOMAIN)?;
        let listing_id = LISTING_ID
            .captures(listing_url.path())
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| {
                ScrapeError::UnsupportedUrl(format!("{url}: invalid OnTheMarket URL format, property id not found"))
            })?;

        let view_wait = WaitStrategy::new(ANCHOR, SETTLE, wait);
        let media = vec![
            MediaView {
                kind: MediaKind::Floorplans,
                url: Some(Self::view_url(&listing_url, &listing_id, "floorplans/1")?),
                wait: view_wait.clone(),
            },
            MediaView {
                kind: MediaKind::Images,
                url: Some(Self::view_url(&listing_url, &listing_id, "photos/1")?),
                wait: view_wait,
            },
        ];

        Ok(SiteConfig {
            source: Source::OnTheMarket,
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
            bedrooms: Self::icon_feature(document, "beds"),
            bathrooms: Self::icon_feature(document, "bath"),
            size: Self::size(document),
            house_type: dom::first_text(document, &SELECTORS.house_type),
            agent: dom::first_text(document, &SELECTORS.agent),
            description: document
                .select(&SELECTORS.description)
                .map(|div| dom::joined_text(div, "\n"))
                .find(|text| !text.is_empty()),
            features: dom::all_texts(document, &SELECTORS.features),
            images: Vec::new(),
            floorplans: Vec::new(),
        };
        debug!(price = ?bag.price, address = ?bag.address, "Extracted OnTheMarket listing fields");
        bag
    }

    fn extract_media(&self, kind: MediaKind, document: &Html, config: &SiteConfig) -> Vec<String> {
        let urls: Vec<String> = match kind {
            MediaKind::Images => document
                .select(&SELECTORS.slide_image)
                .filter_map(|img| img.value().attr("src"))
                .filter(|src| !src.contains("logo"))
                .filter_map(|src| config.resolve(src))
                .collect(),
            MediaKind::Floorplans => document
                .select(&SELECTORS.floorplan_image)
                .filter_map(|img| img.value().attr("src"))
                .filter_map(|src| config.resolve(src))
                .collect(),
        };
        dedupe_media(urls)
    }
}
