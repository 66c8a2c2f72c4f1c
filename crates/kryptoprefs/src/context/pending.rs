//! Ordered background writes for a single preference

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{PrefsError, Result};

type Write = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

enum Job {
    Write(Write),
    /// Answered once every job queued before it has finished
    Barrier(oneshot::Sender<Option<PrefsError>>),
}

/// FIFO queue of writes drained by one worker task
///
/// Writes run strictly in push order. [`PendingWrites::sync`] queues a
/// barrier, so every caller waits for all writes pushed before it, and the
/// first failure since the previous barrier is reported to that caller.
#[derive(Default)]
pub(crate) struct PendingWrites {
    queue: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl PendingWrites {
    /// Queue `write` after any earlier writes
    ///
    /// Fails with [`PrefsError::TaskError`] outside a tokio runtime.
    pub(crate) fn push<F>(&self, write: F) -> Result<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let mut job = Job::Write(Box::pin(write));

        if let Some(sender) = queue.as_ref() {
            match sender.send(job) {
                Ok(()) => return Ok(()),
                // The worker's runtime is gone; start a new one below
                Err(mpsc::error::SendError(returned)) => job = returned,
            }
        }

        let handle = Handle::try_current().map_err(|e| PrefsError::TaskError(e.to_string()))?;
        let (sender, receiver) = mpsc::unbounded_channel();
        sender
            .send(job)
            .map_err(|_| PrefsError::TaskError("write queue closed".to_string()))?;
        handle.spawn(drain(receiver));
        *queue = Some(sender);
        Ok(())
    }

    /// Wait for every write pushed so far; returns the first failure, if any
    pub(crate) async fn sync(&self) -> Result<()> {
        let sender = self
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let Some(sender) = sender else {
            return Ok(());
        };

        let (done, wait) = oneshot::channel();
        if sender.send(Job::Barrier(done)).is_err() {
            // Worker gone with its runtime; nothing can still be pending
            return Ok(());
        }

        match wait.await {
            Ok(None) => Ok(()),
            Ok(Some(e)) => Err(e),
            Err(_) => Err(PrefsError::TaskError("write queue stopped".to_string())),
        }
    }
}

async fn drain(mut receiver: mpsc::UnboundedReceiver<Job>) {
    let mut failed: Option<PrefsError> = None;

    while let Some(job) = receiver.recv().await {
        match job {
            Job::Write(write) => {
                // Spawned so a panicking write becomes an error instead of killing the queue
                let result = tokio::spawn(write)
                    .await
                    .map_err(PrefsError::from)
                    .and_then(|r| r);
                if let Err(e) = result {
                    debug!("Queued preference write failed: {}", e);
                    failed.get_or_insert(e);
                }
            }
            Job::Barrier(done) => {
                let _ = done.send(failed.take());
            }
        }
    }
}
