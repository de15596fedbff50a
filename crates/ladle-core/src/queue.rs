//! Bounded discovery queue with push-or-drop admission.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::models::WorkItem;

/// Result of offering an item to the [`WorkQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The item was queued and will produce exactly one result.
    Admitted,
    /// The queue was full; the item is handed back and will not be retried.
    Dropped(WorkItem),
    /// The consuming side is gone; no further item can be admitted.
    Closed(WorkItem),
}

impl PushOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, PushOutcome::Admitted)
    }
}

/// Producer half of the discovery queue. Dropping it closes the queue.
#[derive(Debug)]
pub struct WorkQueue {
    tx: mpsc::Sender<WorkItem>,
}

/// Consumer half of the discovery queue, read by the dispatcher.
#[derive(Debug)]
pub struct WorkReceiver {
    rx: mpsc::Receiver<WorkItem>,
}

/// Create a FIFO queue holding at most `capacity` waiting items.
pub fn work_queue(capacity: usize) -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (WorkQueue { tx }, WorkReceiver { rx })
}

impl WorkQueue {
    /// Offer an item without waiting. Never suspends.
    pub fn try_push(&self, item: WorkItem) -> PushOutcome {
        match self.tx.try_send(item) {
            Ok(()) => PushOutcome::Admitted,
            Err(TrySendError::Full(item)) => PushOutcome::Dropped(item),
            Err(TrySendError::Closed(item)) => PushOutcome::Closed(item),
        }
    }

    /// Free slots right now.
    pub fn remaining(&self) -> usize {
        self.tx.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Close the queue. Items already queued stay readable.
    pub fn close(self) {
        drop(self);
    }
}

impl WorkReceiver {
    /// Next queued item, or `None` once the queue is closed and empty.
    pub async fn next(&mut self) -> Option<WorkItem> {
        self.rx.recv().await
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
