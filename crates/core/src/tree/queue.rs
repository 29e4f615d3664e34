//! Bounded-concurrency gate for external-service calls.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Limits how many transcode, probe and mux calls run at once.
///
/// Clones share the same permits, so one queue handed to both stages bounds
/// their calls together. Capacity 1 serializes every call.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkQueue {
    /// Creates a queue. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// A queue that runs one call at a time.
    pub fn serial() -> Self {
        Self::new(1)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of calls currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Runs `work` once a slot is free.
    pub async fn run<F, T>(&self, work: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquire cannot fail
        let _permit = self.permits.acquire().await.ok();
        work.await
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::serial()
    }
}
