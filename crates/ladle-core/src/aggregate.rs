use std::sync::Arc;

use tokio::sync::mpsc;

use crate::dispatch::SlotResult;
use crate::models::ResultSet;
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::stats::StatsRegistry;

/// Single consumer of the result stream. Owns the `ResultSet` while the
/// pipeline drains and hands it over once the stream closes.
pub struct Aggregator {
    stats: Arc<StatsRegistry>,
}

impl Aggregator {
    pub fn new(stats: Arc<StatsRegistry>) -> Self {
        Self { stats }
    }

    pub async fn run<R: PipelineReporter>(
        &self,
        mut results: mpsc::Receiver<SlotResult>,
        reporter: &R,
    ) -> ResultSet {
        let mut set = ResultSet::new();

        while let Some(SlotResult { slot, result }) = results.recv().await {
            match result.error() {
                None => self.stats.record_completed(slot),
                Some(error) => self.stats.record_failed(slot, error.kind()),
            }
            reporter.report(PipelineEvent::ResultRecorded { result: &result });
            set.push(result);
        }

        set
    }
}
