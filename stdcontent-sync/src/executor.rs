//! Bounded parallel executor for backend I/O.
//!
//! A fixed pool of workers drains a bounded admission queue. Feeding the
//! queue awaits once it is full, so a large input never buffers up front.
//! The first failing operation cancels the whole run: queued items are
//! dropped, in-flight operations are dropped at their next suspension point,
//! and that first error is returned once every worker has stopped.
//!
//! Results come back in completion order. Callers that need to know which
//! input produced a value return `(key, value)` pairs.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Maximum operations running at once.
pub const MAX_IN_FLIGHT: usize = 3;

/// Items admitted but not yet picked up by a worker.
pub const QUEUE_DEPTH: usize = 4;

/// Concurrency limits for one executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelQueue {
    pub max_in_flight: usize,
    pub queue_depth: usize,
}

impl Default for ParallelQueue {
    fn default() -> Self {
        Self {
            max_in_flight: MAX_IN_FLIGHT,
            queue_depth: QUEUE_DEPTH,
        }
    }
}

impl ParallelQueue {
    /// Run `operation` over every item and collect the results.
    ///
    /// Each call receives a [`CancellationToken`] that fires when a sibling
    /// fails, for operations that want to stop cooperatively.
    pub async fn run<I, T, E, F, Fut>(&self, items: I, operation: F) -> Result<Vec<T>, E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<I::Item>(self.queue_depth.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let operation = Arc::new(operation);
        let first_error: Arc<Mutex<Option<E>>> = Arc::new(Mutex::new(None));

        let mut workers = JoinSet::new();
        for _ in 0..self.max_in_flight.max(1) {
            let rx = Arc::clone(&rx);
            let operation = Arc::clone(&operation);
            let cancel = cancel.clone();
            let first_error = Arc::clone(&first_error);
            workers.spawn(async move {
                let mut results = Vec::new();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        item = async { rx.lock().await.recv().await } => item,
                    };
                    let Some(item) = next else { break };

                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        outcome = (*operation)(item, cancel.clone()) => outcome,
                    };
                    match outcome {
                        Ok(value) => results.push(value),
                        Err(err) => {
                            record_first(&first_error, err);
                            cancel.cancel();
                            break;
                        }
                    }
                }
                results
            });
        }

        for item in items {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(item) => {
                    // Every worker is gone; nothing left to feed.
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        drop(tx);

        let mut results = Vec::new();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(batch) => results.extend(batch),
                Err(err) if err.is_panic() => {
                    cancel.cancel();
                    std::panic::resume_unwind(err.into_panic());
                }
                Err(err) => tracing::warn!(error = %err, "executor worker aborted"),
            }
        }

        let failure = first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }

    /// [`run`](Self::run) for side-effecting operations whose results are not needed.
    pub async fn for_each<I, E, F, Fut>(&self, items: I, operation: F) -> Result<(), E>
    where
        I: IntoIterator,
        I::Item: Send + 'static,
        F: Fn(I::Item, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        self.run(items, operation).await.map(|_| ())
    }
}

fn record_first<E>(slot: &Mutex<Option<E>>, err: E) {
    let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        *slot = Some(err);
    }
}
