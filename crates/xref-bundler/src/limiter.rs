//! Concurrency limiter for remote fetches.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Caps the number of operations in flight at once.
///
/// Clones share the same permits, so one limiter handed to several loaders
/// bounds all of them together.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl ConcurrencyLimiter {
    /// Allow at most `max` operations at once. A limit of zero is treated as one.
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    /// The configured limit.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `operation` once a permit is free.
    pub async fn run<F: Future>(&self, operation: F) -> F::Output {
        // The semaphore is never closed, so acquire only fails if it was
        let _permit = self.semaphore.acquire().await.ok();
        operation.await
    }
}
