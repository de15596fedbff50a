use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::queue::{PushOutcome, WorkQueue};
use crate::stats::StatsRegistry;
use crate::traits::{Fetcher, ListingParser};

/// Counts produced by one discovery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoverySummary {
    pub discovered: u64,
    pub admitted: u64,
    pub dropped: u64,
    /// Discovery stopped early because the run was cancelled.
    pub cancelled: bool,
}

/// Visits the seed listing once and offers every unit found to the queue.
pub struct Discoverer<F, L>
where
    F: Fetcher,
    L: ListingParser,
{
    fetcher: F,
    listing: L,
    stats: Arc<StatsRegistry>,
    cancel: CancellationToken,
}

impl<F, L> Discoverer<F, L>
where
    F: Fetcher,
    L: ListingParser,
{
    pub fn new(
        fetcher: F,
        listing: L,
        stats: Arc<StatsRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            listing,
            stats,
            cancel,
        }
    }

    /// Fetch and parse the seed, then push each unit without waiting.
    ///
    /// Takes the queue by value: it is closed when this returns, on every
    /// path, which is what lets the dispatcher finish.
    pub async fn run<R: PipelineReporter>(
        &self,
        seed_url: &str,
        queue: WorkQueue,
        reporter: &R,
    ) -> Result<DiscoverySummary, PipelineError> {
        self.stats.record_request();
        let html = self
            .fetcher
            .fetch(seed_url)
            .await
            .map_err(|source| PipelineError::SeedFetch {
                url: seed_url.to_string(),
                source,
            })?;
        reporter.report(PipelineEvent::SeedFetched {
            url: seed_url,
            bytes: html.len(),
        });

        let items = self
            .listing
            .parse_listing(seed_url, &html)
            .map_err(|source| PipelineError::SeedFetch {
                url: seed_url.to_string(),
                source,
            })?;

        let mut summary = DiscoverySummary::default();
        for item in items {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            summary.discovered += 1;
            let url = item.url.clone();
            match queue.try_push(item) {
                PushOutcome::Admitted => {
                    self.stats.record_admitted();
                    summary.admitted += 1;
                    reporter.report(PipelineEvent::ItemAdmitted { url: &url });
                }
                PushOutcome::Dropped(item) => {
                    self.stats.record_dropped();
                    summary.dropped += 1;
                    reporter.report(PipelineEvent::ItemDropped { item: &item });
                }
                PushOutcome::Closed(item) => {
                    self.stats.record_dropped();
                    summary.dropped += 1;
                    tracing::warn!(url = %item.url, "Work queue closed during discovery");
                    break;
                }
            }
        }

        reporter.report(PipelineEvent::DiscoveryFinished { summary: &summary });
        queue.close();
        Ok(summary)
    }
}
