//! Mock implementations of network seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, ServerError};
use crate::fetch::RemoteSource;

#[derive(Debug, Clone)]
enum Scripted {
    Respond(Value),
    Fail(String),
}

/// Scripted [`RemoteSource`] keyed by URL.
///
/// Lookups try the exact URL first, then the URL with its query string
/// removed. Unscripted URLs fail with a fetch error.
///
/// # Example
///
/// ```rust,ignore
/// let source = MockSource::new().with_response("https://x.test/a.json", json!({}));
/// assert_eq!(source.call_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    scripts: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
    call_count: AtomicU32,
}

impl MockSource {
    /// Create a mock with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `url` with `value`.
    #[must_use]
    pub fn with_response(self, url: &str, value: Value) -> Self {
        self.set_response(url, value);
        self
    }

    /// Fail requests to `url` with `message`.
    #[must_use]
    pub fn with_failure(self, url: &str, message: &str) -> Self {
        self.set_failure(url, message);
        self
    }

    /// Replace the script for `url` with a response.
    pub fn set_response(&self, url: &str, value: Value) {
        self.script(url, Scripted::Respond(value));
    }

    /// Replace the script for `url` with a failure.
    pub fn set_failure(&self, url: &str, message: &str) {
        self.script(url, Scripted::Fail(message.to_string()));
    }

    /// Number of fetches made so far.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn script(&self, url: &str, scripted: Scripted) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(url.to_string(), scripted);
        }
    }

    fn lookup(&self, url: &str) -> Option<Scripted> {
        let scripts = self.scripts.lock().ok()?;
        scripts
            .get(url)
            .or_else(|| {
                let base = url.split_once('?').map_or(url, |(base, _)| base);
                scripts.get(base)
            })
            .cloned()
    }
}

#[async_trait]
impl RemoteSource for MockSource {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        match self.lookup(url) {
            Some(Scripted::Respond(value)) => Ok(value),
            Some(Scripted::Fail(message)) => Err(ServerError::fetch(url, message)),
            None => Err(ServerError::fetch(url, "no scripted response")),
        }
    }
}
