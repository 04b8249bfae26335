use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::scrapers::traits::{PageSession, SessionLauncher};

/// Extra Chrome flags for running inside containers
const CHROME_ARGS: [&str; 3] = [
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-features=VizDisplayCompositor",
];

/// Launch configuration for headless Chrome
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// Chrome/Chromium binary; autodetected when unset
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub sandbox: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            sandbox: false,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            idle_timeout_secs: 120,
        }
    }
}

/// Launches one headless Chrome process per session
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn launch_options(&self) -> Result<LaunchOptions<'static>, ScrapeError> {
        let args: Vec<&'static OsStr> = CHROME_ARGS.iter().map(|arg| OsStr::new(*arg)).collect();

        LaunchOptions::default_builder()
            .headless(self.settings.headless)
            .sandbox(self.settings.sandbox)
            .window_size(Some((self.settings.window_width, self.settings.window_height)))
            .path(self.settings.chrome_path.clone())
            .idle_browser_timeout(Duration::from_secs(self.settings.idle_timeout_secs))
            .args(args)
            .build()
            .map_err(|e| ScrapeError::Launch(format!("invalid launch options: {e}")))
    }
}

impl SessionLauncher for ChromeLauncher {
    fn open(&self, url: &str) -> Result<Box<dyn PageSession>, ScrapeError> {
        info!("Launching headless Chrome...");

        let options = self.launch_options()?;
        let browser = Browser::new(options).map_err(|e| ScrapeError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Launch(format!("could not open tab: {e}")))?;
        tab.set_default_timeout(Duration::from_secs(self.settings.navigation_timeout_secs));

        // From here on the session's Drop owns the process
        let mut session = ChromeSession {
            tab,
            browser: Some(browser),
        };
        session.navigate(url)?;

        Ok(Box::new(session))
    }
}

/// A Chrome process and the single tab a job renders into
pub struct ChromeSession {
    tab: Arc<Tab>,
    browser: Option<Browser>,
}

impl ChromeSession {
    fn shutdown(&mut self) {
        if let Some(browser) = self.browser.take() {
            if let Err(e) = self.tab.close(true) {
                debug!("Tab close failed during shutdown: {}", e);
            }
            // Dropping the Browser kills the Chrome process
            drop(browser);
            info!("Closed headless Chrome session");
        }
    }
}

impl PageSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        debug!("Navigating to {}", url);
        let navigation_error = |e: anyhow::Error| ScrapeError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.tab.navigate_to(url).map_err(navigation_error)?;
        self.tab.wait_until_navigated().map_err(navigation_error)?;
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| {
                warn!("Anchor `{}` never appeared: {}", selector, e);
                ScrapeError::NavigationTimeout {
                    selector: selector.to_string(),
                    timeout,
                }
            })
    }

    fn run_script(&mut self, script: &str) -> Result<(), ScrapeError> {
        self.tab
            .evaluate(script, false)
            .map(|_| ())
            .map_err(|e| ScrapeError::Navigation {
                url: self.tab.get_url(),
                reason: format!("script failed: {e}"),
            })
    }

    fn content(&mut self) -> Result<String, ScrapeError> {
        let html = self.tab.get_content().map_err(|e| ScrapeError::Navigation {
            url: self.tab.get_url(),
            reason: format!("could not read page content: {e}"),
        })?;
        debug!("Captured {} bytes of rendered HTML", html.len());
        Ok(html)
    }

    fn close(mut self: Box<Self>) {
        self.shutdown();
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
