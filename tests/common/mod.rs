#![allow(dead_code)]

use async_trait::async_trait;
use listing_scout::error::{CallbackError, ScrapeError};
use listing_scout::jobs::{CallbackPayload, JobRunner, Notifier};
use listing_scout::scrapers::{PageSession, ScrapeOptions, SessionLauncher, WaitSettings};
use listing_scout::store::RecordStore;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Serves canned HTML per URL in place of a real browser
#[derive(Default)]
pub struct FixtureLauncher {
    pages: Arc<HashMap<String, String>>,
    fail_launch: bool,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub visited: Arc<Mutex<Vec<String>>>,
}

impl FixtureLauncher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl SessionLauncher for FixtureLauncher {
    fn open(&self, url: &str) -> Result<Box<dyn PageSession>, ScrapeError> {
        if self.fail_launch {
            return Err(ScrapeError::Launch("chrome binary not found".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut session = FixtureSession {
            pages: Arc::clone(&self.pages),
            current: None,
            closed: Arc::clone(&self.closed),
            visited: Arc::clone(&self.visited),
            released: false,
        };
        session.navigate(url)?;
        Ok(Box::new(session))
    }
}

pub struct FixtureSession {
    pages: Arc<HashMap<String, String>>,
    current: Option<String>,
    closed: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
    released: bool,
}

impl FixtureSession {
    fn html(&self) -> &str {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl PageSession for FixtureSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.visited.lock().unwrap().push(url.to_string());
        if !self.pages.contains_key(url) {
            return Err(ScrapeError::Navigation {
                url: url.to_string(),
                reason: "no fixture for url".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn wait_for_element(&mut self, selector: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let parsed = Selector::parse(selector).expect("fixture selector");
        let present = Html::parse_document(self.html()).select(&parsed).next().is_some();
        if present {
            Ok(())
        } else {
            Err(ScrapeError::NavigationTimeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    fn run_script(&mut self, _script: &str) -> Result<(), ScrapeError> {
        Ok(())
    }

    fn content(&mut self) -> Result<String, ScrapeError> {
        Ok(self.html().to_string())
    }

    fn close(mut self: Box<Self>) {
        self.release();
    }
}

impl Drop for FixtureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Keeps every callback it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    sent: Mutex<Vec<(String, CallbackPayload)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, CallbackPayload)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<CallbackPayload> {
        self.sent().into_iter().map(|(_, payload)| payload).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, url: &str, payload: &CallbackPayload) -> Result<(), CallbackError> {
        self.sent.lock().unwrap().push((url.to_string(), payload.clone()));
        if self.fail {
            return Err(CallbackError::Rejected(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(())
    }
}

/// Options with every settle interval zeroed
pub fn fast_options() -> ScrapeOptions {
    ScrapeOptions {
        wait: WaitSettings {
            anchor_timeout: Duration::from_millis(50),
            settle: Some(Duration::ZERO),
            after_scroll: Duration::ZERO,
        },
        debug_dir: None,
    }
}

pub fn runner(
    launcher: Arc<FixtureLauncher>,
    store: Arc<RecordStore>,
    notifier: Arc<RecordingNotifier>,
) -> JobRunner {
    JobRunner::new(launcher, store.clone(), store, notifier, fast_options())
}
