use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// What to do with failed items when writing the result set out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Failed items are left out of the output artifact.
    #[default]
    Exclude,
    /// Failed items are written with their discovery metadata and empty
    /// ingredient/instruction lists.
    IncludeEmpty,
}

/// Tuning knobs for one pipeline run.
///
/// `max_workers` and `queue_capacity` are independent limits: the queue
/// bounds how much discovered work may wait, the permit pool bounds how
/// much work runs at once.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Size of the permit pool (concurrent extraction tasks).
    pub max_workers: usize,
    /// Capacity of the discovery queue; pushes beyond it are dropped.
    pub queue_capacity: usize,
    /// Capacity of the result channel between tasks and the aggregator.
    pub result_capacity: usize,
    /// Upper bound for a single extraction task. `None` disables it.
    pub item_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            queue_capacity: 100,
            result_capacity: 100,
            item_timeout: Some(Duration::from_secs(30)),
            failure_policy: FailurePolicy::Exclude,
        }
    }
}

impl PipelineConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = capacity;
        self
    }

    pub fn with_item_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.item_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Reject configurations that could never make progress.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_workers == 0 {
            return Err(PipelineError::Config(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PipelineError::Config(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.result_capacity == 0 {
            return Err(PipelineError::Config(
                "result_capacity must be at least 1".into(),
            ));
        }
        if self.item_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PipelineError::Config(
                "item_timeout must be non-zero (use None to disable)".into(),
            ));
        }
        Ok(())
    }
}
