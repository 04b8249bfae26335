use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scrapers::{BrowserSettings, ScrapeOptions, WaitSettings};

/// Runtime configuration.
///
/// Layered as defaults, then `scout.toml` (or an explicit file), then
/// `SCOUT__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub browser: BrowserSettings,
    pub wait: WaitConfig,
    pub callback: CallbackSettings,
    pub store: StoreSettings,
    /// Directory for rendered HTML snapshots
    pub debug_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    pub anchor_timeout_secs: u64,
    /// Overrides every site's settle interval
    pub settle_ms: Option<u64>,
    pub after_scroll_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackSettings {
    pub timeout_secs: u64,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub path: PathBuf,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = BrowserSettings::default();
        let builder = Config::builder()
            .set_default("browser.headless", defaults.headless)?
            .set_default("browser.sandbox", defaults.sandbox)?
            .set_default("browser.window_width", defaults.window_width as i64)?
            .set_default("browser.window_height", defaults.window_height as i64)?
            .set_default("browser.navigation_timeout_secs", defaults.navigation_timeout_secs as i64)?
            .set_default("browser.idle_timeout_secs", defaults.idle_timeout_secs as i64)?
            .set_default("wait.anchor_timeout_secs", 10)?
            .set_default("wait.after_scroll_ms", 2000)?
            .set_default("callback.timeout_secs", 15)?
            .set_default("callback.accept_invalid_certs", false)?
            .set_default("store.path", "scout_store.json")?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("scout").required(false)),
        };

        builder
            .add_source(Environment::with_prefix("SCOUT").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            wait: WaitSettings {
                anchor_timeout: Duration::from_secs(self.wait.anchor_timeout_secs),
                settle: self.wait.settle_ms.map(Duration::from_millis),
                after_scroll: Duration::from_millis(self.wait.after_scroll_ms),
            },
            debug_dir: self.debug_dir.clone(),
        }
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback.timeout_secs)
    }
}
