//! Fixed-size permit pool bounding concurrent extraction tasks.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

/// Counting limiter with `capacity` permits, each tied to a worker slot id
/// in `0..capacity` so activity can be attributed per worker.
#[derive(Debug, Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    slots: Arc<Mutex<Vec<usize>>>,
    capacity: usize,
}

/// A held permit. Dropping it returns the slot and wakes one waiter.
#[derive(Debug)]
pub struct WorkerPermit {
    slot: usize,
    slots: Arc<Mutex<Vec<usize>>>,
    _permit: OwnedSemaphorePermit,
}

fn lock_slots(slots: &Mutex<Vec<usize>>) -> MutexGuard<'_, Vec<usize>> {
    slots.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovered from poisoned permit slot list");
        poisoned.into_inner()
    })
}

impl PermitPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            slots: Arc::new(Mutex::new((0..capacity).rev().collect())),
            capacity,
        }
    }

    /// Wait for a free permit.
    pub async fn acquire(&self) -> Result<WorkerPermit, PipelineError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| PipelineError::Internal(format!("permit pool closed: {e}")))?;
        self.bind(permit)
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<WorkerPermit> {
        let permit = Arc::clone(&self.semaphore).try_acquire_owned().ok()?;
        self.bind(permit).ok()
    }

    fn bind(&self, permit: OwnedSemaphorePermit) -> Result<WorkerPermit, PipelineError> {
        // A semaphore permit guarantees a free slot: slots are pushed back
        // before the semaphore permit is released.
        let slot = lock_slots(&self.slots)
            .pop()
            .ok_or_else(|| PipelineError::Internal("permit slot accounting out of sync".into()))?;
        Ok(WorkerPermit {
            slot,
            slots: Arc::clone(&self.slots),
            _permit: permit,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}

impl WorkerPermit {
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Drop for WorkerPermit {
    fn drop(&mut self) {
        // Runs before `_permit` is dropped, so the slot is back in the list
        // by the time a waiter is woken.
        lock_slots(&self.slots).push(self.slot);
    }
}
