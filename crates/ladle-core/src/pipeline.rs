use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::config::PipelineConfig;
use crate::discover::{Discoverer, DiscoverySummary};
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::models::{ExtractionResult, ResultSet, WorkItem};
use crate::permit::PermitPool;
use crate::queue::work_queue;
use crate::stats::{StatsRegistry, StatsSnapshot};
use crate::task::ExtractionTask;
use crate::traits::{Fetcher, ItemParser, ListingParser};

/// Lifecycle of one pipeline run.
///
/// ```text
/// Idle --> Discovering --> Draining --> Completed
///              |
///              +--> Failed (seed could not be fetched or parsed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Idle,
    Discovering,
    Draining,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Discovering => "discovering",
            PipelineState::Draining => "draining",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    Started {
        run_id: Uuid,
        seed: &'a str,
        max_workers: usize,
        queue_capacity: usize,
    },
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    SeedFetched {
        url: &'a str,
        bytes: usize,
    },
    ItemAdmitted {
        url: &'a str,
    },
    ItemDropped {
        item: &'a WorkItem,
    },
    DiscoveryFinished {
        summary: &'a DiscoverySummary,
    },
    TaskDispatched {
        item: &'a WorkItem,
        slot: usize,
    },
    ResultRecorded {
        result: &'a ExtractionResult,
    },
    Finished {
        run_id: Uuid,
        stats: &'a StatsSnapshot,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPipelineReporter;

impl PipelineReporter for TracingPipelineReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::Started {
                run_id,
                seed,
                max_workers,
                queue_capacity,
            } => {
                tracing::info!(%run_id, %seed, max_workers, queue_capacity, "Pipeline started");
            }
            PipelineEvent::StateChanged { from, to } => {
                tracing::debug!(%from, %to, "Pipeline state changed");
            }
            PipelineEvent::SeedFetched { url, bytes } => {
                tracing::info!(%url, bytes, "Fetched seed listing");
            }
            PipelineEvent::ItemAdmitted { url } => {
                tracing::debug!(%url, "Recipe queued");
            }
            PipelineEvent::ItemDropped { item } => {
                tracing::warn!(url = %item.url, title = %item.title, "Queue full, recipe dropped");
            }
            PipelineEvent::DiscoveryFinished { summary } => {
                tracing::info!(
                    discovered = summary.discovered,
                    admitted = summary.admitted,
                    dropped = summary.dropped,
                    cancelled = summary.cancelled,
                    "Discovery finished"
                );
            }
            PipelineEvent::TaskDispatched { item, slot } => {
                tracing::debug!(url = %item.url, slot, "Processing recipe");
            }
            PipelineEvent::ResultRecorded { result } => match result {
                ExtractionResult::Success { item, recipe } => {
                    tracing::info!(
                        title = %item.title,
                        ingredients = recipe.ingredients.len(),
                        steps = recipe.instructions.len(),
                        "Recipe completed"
                    );
                }
                ExtractionResult::Failed { item, error } => {
                    tracing::warn!(url = %item.url, kind = error.kind(), %error, "Recipe failed");
                }
            },
            PipelineEvent::Finished { run_id, stats } => {
                tracing::info!(
                    %run_id,
                    requests = stats.requests,
                    completed = stats.completed,
                    failed = stats.failed,
                    dropped = stats.dropped,
                    elapsed_ms = stats.elapsed.as_millis() as u64,
                    "Pipeline finished"
                );
            }
        }
    }
}

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub seed: String,
    pub state: PipelineState,
    pub stats: StatsSnapshot,
    pub results: ResultSet,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Wires discoverer, dispatcher and aggregator together and drives the
/// run through its states.
pub struct Pipeline<F, L, P, R = TracingPipelineReporter>
where
    F: Fetcher + 'static,
    L: ListingParser,
    P: ItemParser + 'static,
    R: PipelineReporter,
{
    fetcher: F,
    listing: L,
    parser: P,
    config: PipelineConfig,
    reporter: R,
    stats: Arc<StatsRegistry>,
    cancel: CancellationToken,
    state: watch::Sender<PipelineState>,
}

impl<F, L, P> Pipeline<F, L, P, TracingPipelineReporter>
where
    F: Fetcher + 'static,
    L: ListingParser,
    P: ItemParser + 'static,
{
    pub fn new(
        fetcher: F,
        listing: L,
        parser: P,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            fetcher,
            listing,
            parser,
            config,
            reporter: TracingPipelineReporter,
            stats: Arc::new(StatsRegistry::new()),
            cancel: CancellationToken::new(),
            state,
        })
    }
}

impl<F, L, P, R> Pipeline<F, L, P, R>
where
    F: Fetcher + 'static,
    L: ListingParser,
    P: ItemParser + 'static,
    R: PipelineReporter,
{
    /// Replace the event reporter.
    pub fn with_reporter<R2: PipelineReporter>(self, reporter: R2) -> Pipeline<F, L, P, R2> {
        Pipeline {
            fetcher: self.fetcher,
            listing: self.listing,
            parser: self.parser,
            config: self.config,
            reporter,
            stats: self.stats,
            cancel: self.cancel,
            state: self.state,
        }
    }

    /// Use an externally owned cancellation token.
    ///
    /// Cancellation is checked before each discovered unit is queued and at
    /// the start of each extraction task. Fetches already in flight run to
    /// completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared handle to the live counters.
    pub fn stats(&self) -> Arc<StatsRegistry> {
        Arc::clone(&self.stats)
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    fn transition(&self, to: PipelineState) {
        let from = self.state.send_replace(to);
        if from != to {
            self.reporter.report(PipelineEvent::StateChanged { from, to });
        }
    }

    /// Run the pipeline from `seed_url` to completion.
    ///
    /// Returns `PipelineError::SeedFetch` when the seed cannot be visited;
    /// in that case no extraction task is started.
    pub async fn run(self, seed_url: &str) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();

        self.reporter.report(PipelineEvent::Started {
            run_id,
            seed: seed_url,
            max_workers: self.config.max_workers,
            queue_capacity: self.config.queue_capacity,
        });

        let (queue, work) = work_queue(self.config.queue_capacity);
        let (result_tx, result_rx) = mpsc::channel(self.config.result_capacity);

        let discoverer = Discoverer::new(
            self.fetcher.clone(),
            self.listing.clone(),
            Arc::clone(&self.stats),
            self.cancel.clone(),
        );
        let task = ExtractionTask::new(
            self.fetcher.clone(),
            self.parser.clone(),
            Arc::clone(&self.stats),
            self.config.item_timeout,
            self.cancel.clone(),
        );
        let dispatcher = Dispatcher::new(
            task,
            PermitPool::new(self.config.max_workers),
            Arc::clone(&self.stats),
        );
        let aggregator = Aggregator::new(Arc::clone(&self.stats));

        self.transition(PipelineState::Discovering);

        let discovery = async {
            let outcome = discoverer.run(seed_url, queue, &self.reporter).await;
            // The queue is closed by now; already queued items still drain.
            if outcome.is_ok() {
                self.transition(PipelineState::Draining);
            }
            outcome
        };
        let (discovery, dispatch, results) = tokio::join!(
            discovery,
            dispatcher.run(work, result_tx, &self.reporter),
            aggregator.run(result_rx, &self.reporter),
        );

        if let Err(e) = discovery {
            self.transition(PipelineState::Failed);
            tracing::error!(%run_id, error = %e, "Pipeline failed");
            return Err(e);
        }

        let stats = self.stats.snapshot();
        if dispatch.join_failures > 0 || !stats.is_balanced() {
            tracing::warn!(
                join_failures = dispatch.join_failures,
                admitted = stats.admitted,
                completed = stats.completed,
                failed = stats.failed,
                "Result accounting does not balance"
            );
        }

        self.transition(PipelineState::Completed);
        self.reporter.report(PipelineEvent::Finished {
            run_id,
            stats: &stats,
        });

        Ok(PipelineReport {
            run_id,
            seed: seed_url.to_string(),
            state: PipelineState::Completed,
            stats,
            results,
            started_at,
            elapsed: clock.elapsed(),
        })
    }
}
