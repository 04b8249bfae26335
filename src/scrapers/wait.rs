//! Fixed-delay readiness heuristic.
//!
//! There is no network-idle detection: the anchor wait proves the page
//! exists, then fixed settle intervals give client-side rendering time to
//! finish. Slow pages can still be captured half rendered; this is the main
//! source of flaky extractions.

use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::scrapers::traits::PageSession;
use crate::scrapers::types::WaitStrategy;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Wait for `strategy.anchor`, settle, scroll to the bottom, settle again
pub fn await_ready(session: &mut dyn PageSession, strategy: &WaitStrategy) -> Result<(), ScrapeError> {
    session.wait_for_element(&strategy.anchor, strategy.timeout)?;
    debug!(anchor = %strategy.anchor, "Anchor present, settling");
    pause(strategy.settle);

    if let Some(consent) = &strategy.consent {
        if let Err(e) = session.run_script(&consent_script(consent)) {
            warn!(error = %e, "Could not dismiss cookie banner");
        }
    }

    // Lazy-loaded galleries only fetch once scrolled into view
    if let Err(e) = session.run_script(SCROLL_TO_BOTTOM) {
        warn!(error = %e, "Scroll to bottom failed, continuing");
    }
    pause(strategy.after_scroll);

    Ok(())
}

fn consent_script(selector: &str) -> String {
    let selector = serde_json::Value::String(selector.to_string());
    format!(
        "(() => {{ const button = document.querySelector({selector}); if (button) button.click(); }})();"
    )
}

fn pause(interval: Duration) {
    if !interval.is_zero() {
        thread::sleep(interval);
    }
}
