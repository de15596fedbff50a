use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::ItemError;
use crate::models::{ExtractionResult, Recipe, WorkItem};
use crate::stats::StatsRegistry;
use crate::traits::{Fetcher, ItemParser};

/// Per-item unit of work: fetch one page, parse it, report one result.
///
/// Every failure mode (fetch, parse, timeout, panic, cancellation) ends up
/// as a failed [`ExtractionResult`]; nothing escapes `run`.
#[derive(Clone)]
pub struct ExtractionTask<F, P>
where
    F: Fetcher,
    P: ItemParser,
{
    fetcher: F,
    parser: P,
    stats: Arc<StatsRegistry>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<F, P> ExtractionTask<F, P>
where
    F: Fetcher,
    P: ItemParser,
{
    pub fn new(
        fetcher: F,
        parser: P,
        stats: Arc<StatsRegistry>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            parser,
            stats,
            timeout,
            cancel,
        }
    }

    /// Process `item` and return exactly one result.
    pub async fn run(&self, item: WorkItem) -> ExtractionResult {
        if self.cancel.is_cancelled() {
            return ExtractionResult::failed(item, ItemError::Cancelled);
        }

        let guarded = AssertUnwindSafe(self.extract(&item)).catch_unwind();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(Err(ItemError::Timeout(limit))),
            },
            None => guarded.await,
        };

        match outcome {
            Ok(Ok(recipe)) => ExtractionResult::success(item, recipe),
            Ok(Err(error)) => ExtractionResult::failed(item, error),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(url = %item.url, %message, "Extraction task panicked");
                ExtractionResult::failed(item, ItemError::Panicked(message))
            }
        }
    }

    async fn extract(&self, item: &WorkItem) -> Result<Recipe, ItemError> {
        self.stats.record_request();
        let html = self.fetcher.fetch(&item.url).await.map_err(|e| {
            tracing::debug!(url = %item.url, transient = e.is_transient(), error = %e, "Fetch failed");
            ItemError::Fetch(e.to_string())
        })?;

        self.parser
            .parse_item(item, &html)
            .map_err(|e| ItemError::Parse(e.to_string()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
