//! Bounded execution of upstream calls and fail-fast joins.

use crate::errors::AggregationError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Caps the number of upstream calls in flight across one aggregation.
///
/// Only leaf calls take a slot, so tasks that themselves fan out can be joined
/// without starving their children.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Waits for a free slot, then drives `call` to completion.
    pub async fn run<T, E>(&self, call: impl Future<Output = Result<T, E>>) -> Result<T, E> {
        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self.permits.acquire().await.ok();
        call.await
    }

    /// Spawns every task and collects the results in input order.
    ///
    /// The first failure aborts the remaining tasks; the join still waits for all of them
    /// to wind down before the error is returned.
    pub async fn join_all<T, F>(
        &self,
        tasks: impl IntoIterator<Item = F>,
    ) -> Result<Vec<T>, AggregationError>
    where
        F: Future<Output = Result<T, AggregationError>> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        let mut count = 0;
        for (index, task) in tasks.into_iter().enumerate() {
            set.spawn(async move { (index, task.await) });
            count += 1;
        }

        let mut results: Vec<Option<T>> = (0..count).map(|_| None).collect();
        let mut failure: Option<AggregationError> = None;

        while let Some(joined) = set.join_next().await {
            let err = match joined {
                Ok((index, Ok(value))) => {
                    results[index] = Some(value);
                    continue;
                }
                Ok((_, Err(err))) => err,
                Err(join_err) if join_err.is_cancelled() => continue,
                Err(join_err) => AggregationError::from(join_err),
            };
            if failure.is_none() {
                warn!(error = %err, "Task failed, aborting siblings");
                set.abort_all();
                failure = Some(err);
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(results.into_iter().flatten().collect()),
        }
    }
}
