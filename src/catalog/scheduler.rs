//! FIFO request scheduler that spaces outbound catalog calls by a minimum
//! interval. One background worker drains the queue, so no two tasks ever
//! execute concurrently through a single scheduler instance.

use crate::catalog::error::CatalogError;
use anyhow::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

type Job = BoxFuture<'static, ()>;

/// Serializes submitted tasks in submission order with at least `min_interval`
/// between consecutive dispatches.
///
/// The worker task is owned by the scheduler instance; dropping the scheduler
/// closes the queue and the worker exits once queued work has drained.
#[derive(Debug)]
pub struct RequestScheduler {
    queue: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl RequestScheduler {
    pub fn new(min_interval: Duration) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(drain_queue(rx, min_interval));
        Self { queue, worker }
    }

    /// Enqueues `task` and waits for its outcome.
    ///
    /// A failing task resolves this call with its error and leaves the queue
    /// running; one task's failure never poisons the tasks behind it.
    pub async fn submit<T, F, Fut>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let result = task().await;
            if let Err(err) = &result {
                tracing::warn!(error = %err, "scheduled catalog call failed");
            }
            let _ = done_tx.send(result);
        });

        self.queue
            .send(job)
            .map_err(|_| CatalogError::SchedulerStopped)?;
        done_rx
            .await
            .map_err(|_| CatalogError::SchedulerStopped)?
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

async fn drain_queue(mut rx: mpsc::UnboundedReceiver<Job>, min_interval: Duration) {
    let mut last_dispatch: Option<Instant> = None;

    while let Some(job) = rx.recv().await {
        if let Some(last) = last_dispatch {
            let elapsed = last.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }
        last_dispatch = Some(Instant::now());
        job.await;
    }

    tracing::debug!("request scheduler queue closed; worker exiting");
}
