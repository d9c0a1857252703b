//! FIFO task queue with a concurrency of exactly one.
//!
//! Tasks run one at a time in enqueue order on a dedicated worker. Each
//! task signals completion once through its `Completion`. A task that fails
//! or panics does not stop the tasks queued behind it, and a started task
//! runs to completion even if its caller stops waiting.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::error::OrchestratorError;

type Job = BoxFuture<'static, ()>;

/// Serializes side-effecting tasks
#[derive(Default)]
pub struct MutationQueue {
    /// Sender to the worker, spawned on first enqueue
    worker: OnceLock<mpsc::UnboundedSender<Job>>,
}

impl MutationQueue {
    /// Create an empty queue; the worker starts on first enqueue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` to the queue.
    ///
    /// Must be called from within a Tokio runtime. The returned
    /// `Completion` resolves with the task's output once it has run.
    pub fn enqueue<F, T>(&self, task: F) -> Completion<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job = async move {
            let output = task.await;
            // Caller may have stopped waiting
            let _ = done_tx.send(output);
        }
        .boxed();

        if self.worker.get_or_init(spawn_worker).send(job).is_err() {
            error!("Mutation queue worker is gone, dropping task");
        }

        Completion { rx: done_rx }
    }
}

fn spawn_worker() -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            // Spawned so a panic is contained to the one task
            if let Err(e) = tokio::spawn(job).await {
                error!(error = %e, "Mutation task panicked");
            }
        }
        debug!("Mutation queue closed");
    });

    tx
}

/// Completion signal of an enqueued task
#[must_use = "a completion does nothing unless awaited"]
pub struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, OrchestratorError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|result| result.map_err(|_| OrchestratorError::TaskAborted))
    }
}
