use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::ItemError;
use crate::models::ExtractionResult;
use crate::permit::PermitPool;
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::queue::WorkReceiver;
use crate::stats::StatsRegistry;
use crate::task::ExtractionTask;
use crate::traits::{Fetcher, ItemParser};

/// A result tagged with the worker slot that produced it.
#[derive(Debug)]
pub struct SlotResult {
    pub slot: Option<usize>,
    pub result: ExtractionResult,
}

/// Counts produced by one dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: u64,
    /// Tasks that ended abnormally at the join level (aborted or panicked
    /// outside the extraction guard).
    pub join_failures: u64,
}

/// Pulls work off the queue and runs at most `pool.capacity()` extraction
/// tasks at a time.
pub struct Dispatcher<F, P>
where
    F: Fetcher + 'static,
    P: ItemParser + 'static,
{
    task: ExtractionTask<F, P>,
    pool: PermitPool,
    stats: Arc<StatsRegistry>,
}

impl<F, P> Dispatcher<F, P>
where
    F: Fetcher + 'static,
    P: ItemParser + 'static,
{
    pub fn new(task: ExtractionTask<F, P>, pool: PermitPool, stats: Arc<StatsRegistry>) -> Self {
        Self { task, pool, stats }
    }

    /// Run until the queue is closed and drained, then wait for every
    /// outstanding task. `results` is dropped on return, which closes the
    /// result stream for the aggregator.
    pub async fn run<R: PipelineReporter>(
        &self,
        mut work: WorkReceiver,
        results: mpsc::Sender<SlotResult>,
        reporter: &R,
    ) -> DispatchSummary {
        let mut tasks = JoinSet::new();
        let mut summary = DispatchSummary::default();

        while let Some(item) = work.next().await {
            // Suspends while all workers are busy; this is what slows
            // intake down to processing speed.
            let permit = match self.pool.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(url = %item.url, error = %e, "Could not acquire worker permit");
                    let failed = ExtractionResult::failed(item, ItemError::Dispatch(e.to_string()));
                    let _ = results.send(SlotResult { slot: None, result: failed }).await;
                    continue;
                }
            };

            while let Some(joined) = tasks.try_join_next() {
                summary.join_failures += u64::from(joined.is_err());
            }

            let slot = permit.slot();
            reporter.report(PipelineEvent::TaskDispatched { item: &item, slot });
            summary.dispatched += 1;

            let task = self.task.clone();
            let stats = Arc::clone(&self.stats);
            let tx = results.clone();
            tasks.spawn(async move {
                stats.task_started(slot);
                let result = task.run(item).await;
                stats.task_finished(slot);
                if tx.send(SlotResult { slot: Some(slot), result }).await.is_err() {
                    tracing::error!(slot, "Result stream closed before task finished");
                }
                drop(permit);
            });
        }

        tracing::debug!(outstanding = tasks.len(), "Work queue drained, waiting for tasks");
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Extraction task did not finish cleanly");
                summary.join_failures += 1;
            }
        }

        drop(results);
        summary
    }
}
