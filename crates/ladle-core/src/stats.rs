//! Live operational counters for a pipeline run.
//!
//! One [`StatsRegistry`] is constructed per run and shared by `Arc` with the
//! discoverer, dispatcher, extraction tasks and aggregator. Writers take an
//! exclusive lock for a single increment; [`StatsRegistry::snapshot`] takes a
//! shared lock and hands back a plain copy.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Activity of one worker slot of the permit pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerActivity {
    pub tasks_started: u64,
    pub completed: u64,
    pub failed: u64,
    /// Whether the slot is running a task right now.
    pub busy: bool,
}

#[derive(Debug, Default)]
struct Counters {
    requests: u64,
    discovered: u64,
    admitted: u64,
    dropped: u64,
    completed: u64,
    failed: u64,
    tasks_started: u64,
    in_flight: u64,
    peak_in_flight: u64,
    failures_by_kind: BTreeMap<&'static str, u64>,
    workers: BTreeMap<usize, WorkerActivity>,
}

/// Point-in-time copy of the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// HTTP requests issued (seed visit plus one per extraction attempt).
    pub requests: u64,
    /// Work units seen on the listing (`admitted + dropped`).
    pub discovered: u64,
    /// Work units accepted by the bounded queue.
    pub admitted: u64,
    /// Work units rejected because the queue was full.
    pub dropped: u64,
    pub completed: u64,
    pub failed: u64,
    pub tasks_started: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
    pub failures_by_kind: BTreeMap<&'static str, u64>,
    pub workers: BTreeMap<usize, WorkerActivity>,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Admitted items that have not produced a result yet.
    pub fn outstanding(&self) -> u64 {
        self.admitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }

    /// True once every admitted item is accounted for and every
    /// discovered item was either admitted or dropped.
    pub fn is_balanced(&self) -> bool {
        self.completed + self.failed == self.admitted
            && self.admitted + self.dropped == self.discovered
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.requests as f64 / secs
        } else {
            0.0
        }
    }
}

/// Thread-safe counters shared by every pipeline stage.
#[derive(Debug)]
pub struct StatsRegistry {
    started_at: Instant,
    inner: RwLock<Counters>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            inner: RwLock::new(Counters::default()),
        }
    }

    /// Acquires the write lock, recovering from poison if necessary.
    fn write(&self) -> RwLockWriteGuard<'_, Counters> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned stats lock");
            poisoned.into_inner()
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Counters> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned stats lock");
            poisoned.into_inner()
        })
    }

    pub fn record_request(&self) {
        self.write().requests += 1;
    }

    pub fn record_admitted(&self) {
        let mut c = self.write();
        c.discovered += 1;
        c.admitted += 1;
    }

    pub fn record_dropped(&self) {
        let mut c = self.write();
        c.discovered += 1;
        c.dropped += 1;
    }

    /// A task took `slot` and is about to run.
    pub fn task_started(&self, slot: usize) {
        let mut c = self.write();
        c.tasks_started += 1;
        c.in_flight += 1;
        c.peak_in_flight = c.peak_in_flight.max(c.in_flight);
        let worker = c.workers.entry(slot).or_default();
        worker.tasks_started += 1;
        worker.busy = true;
    }

    /// The task on `slot` has produced its result.
    pub fn task_finished(&self, slot: usize) {
        let mut c = self.write();
        c.in_flight = c.in_flight.saturating_sub(1);
        c.workers.entry(slot).or_default().busy = false;
    }

    pub fn record_completed(&self, slot: Option<usize>) {
        let mut c = self.write();
        c.completed += 1;
        if let Some(slot) = slot {
            c.workers.entry(slot).or_default().completed += 1;
        }
    }

    pub fn record_failed(&self, slot: Option<usize>, kind: &'static str) {
        let mut c = self.write();
        c.failed += 1;
        *c.failures_by_kind.entry(kind).or_insert(0) += 1;
        if let Some(slot) = slot {
            c.workers.entry(slot).or_default().failed += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let c = self.read();
        StatsSnapshot {
            requests: c.requests,
            discovered: c.discovered,
            admitted: c.admitted,
            dropped: c.dropped,
            completed: c.completed,
            failed: c.failed,
            tasks_started: c.tasks_started,
            in_flight: c.in_flight,
            peak_in_flight: c.peak_in_flight,
            failures_by_kind: c.failures_by_kind.clone(),
            workers: c.workers.clone(),
            elapsed: self.started_at.elapsed(),
        }
    }
}
