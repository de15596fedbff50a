//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{Recipe, WorkItem};
use crate::pipeline::{PipelineEvent, PipelineReporter, PipelineState};
use crate::traits::{Fetcher, ItemParser, ListingParser};

pub const SEED: &str = "https://example.com/recipes/soup";

/// `n` work items under `https://example.com/r/`.
pub fn sample_items(n: usize) -> Vec<WorkItem> {
    (0..n)
        .map(|i| WorkItem::new(format!("https://example.com/r/{i}"), format!("Recipe {i}")))
        .collect()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Concurrency {
    active: usize,
    peak: usize,
}

/// Mock fetcher with per-URL responses.
///
/// URLs without a route return a default HTML string.
#[derive(Clone, Default)]
pub struct MockFetcher {
    routes: Arc<Mutex<HashMap<String, Result<String, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
    concurrency: Arc<Mutex<Concurrency>>,
    delay: Option<Duration>,
}

/// Decrements the active count even when the fetch future is dropped.
struct ActiveGuard<'a>(&'a Mutex<Concurrency>);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap().active -= 1;
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, html: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(html.to_string()));
        self
    }

    pub fn fail(self, url: &str, message: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(AppError::HttpError(message.to_string())));
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of fetches observed in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.concurrency.lock().unwrap().peak
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        {
            let mut c = self.concurrency.lock().unwrap();
            c.active += 1;
            c.peak = c.peak.max(c.active);
        }
        let _guard = ActiveGuard(&self.concurrency);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.routes.lock().unwrap().get(url) {
            Some(response) => response.clone(),
            None => Ok("<html><body>default</body></html>".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockListingParser
// ---------------------------------------------------------------------------

/// Mock listing parser that returns a fixed set of items or an error.
#[derive(Clone)]
pub struct MockListingParser {
    result: Result<Vec<WorkItem>, AppError>,
}

impl MockListingParser {
    pub fn with_items(items: Vec<WorkItem>) -> Self {
        Self { result: Ok(items) }
    }

    pub fn with_error(message: &str) -> Self {
        Self {
            result: Err(AppError::ParseError(message.to_string())),
        }
    }
}

impl ListingParser for MockListingParser {
    fn parse_listing(&self, _seed_url: &str, _html: &str) -> Result<Vec<WorkItem>, AppError> {
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// MockItemParser
// ---------------------------------------------------------------------------

/// Mock item parser that builds a recipe from the work item itself.
#[derive(Clone, Default)]
pub struct MockItemParser {
    fail_on: Arc<Mutex<HashSet<String>>>,
    panic_on: Arc<Mutex<HashSet<String>>>,
}

impl MockItemParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a parse error for `url`.
    pub fn fail_on(self, url: &str) -> Self {
        self.fail_on.lock().unwrap().insert(url.to_string());
        self
    }

    /// Panic while parsing `url`.
    pub fn panic_on(self, url: &str) -> Self {
        self.panic_on.lock().unwrap().insert(url.to_string());
        self
    }
}

impl ItemParser for MockItemParser {
    fn parse_item(&self, item: &WorkItem, _html: &str) -> Result<Recipe, AppError> {
        if self.panic_on.lock().unwrap().contains(&item.url) {
            panic!("parser exploded on {}", item.url);
        }
        if self.fail_on.lock().unwrap().contains(&item.url) {
            return Err(AppError::ParseError(format!("no recipe at {}", item.url)));
        }
        Ok(Recipe::from_item(item))
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event names and state transitions.
#[derive(Clone, Default)]
pub struct MockReporter {
    events: Arc<Mutex<Vec<&'static str>>>,
    transitions: Arc<Mutex<Vec<(PipelineState, PipelineState)>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    /// How many events with the given variant name were reported.
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == name)
            .count()
    }

    pub fn transitions(&self) -> Vec<(PipelineState, PipelineState)> {
        self.transitions.lock().unwrap().clone()
    }
}

impl PipelineReporter for MockReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        let name = match event {
            PipelineEvent::Started { .. } => "Started",
            PipelineEvent::StateChanged { from, to } => {
                self.transitions.lock().unwrap().push((from, to));
                "StateChanged"
            }
            PipelineEvent::SeedFetched { .. } => "SeedFetched",
            PipelineEvent::ItemAdmitted { .. } => "ItemAdmitted",
            PipelineEvent::ItemDropped { .. } => "ItemDropped",
            PipelineEvent::DiscoveryFinished { .. } => "DiscoveryFinished",
            PipelineEvent::TaskDispatched { .. } => "TaskDispatched",
            PipelineEvent::ResultRecorded { .. } => "ResultRecorded",
            PipelineEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(name);
    }
}
