//! The file system queue.
//!
//! Every algorithm that touches storage or access control is submitted as
//! one job. A single worker task awaits each job to completion before
//! starting the next, so one algorithm is one queue turn and nothing
//! interleaves inside it.
//!
//! ```text
//!   FileSystemQueue (Clone)     mpsc       worker (tokio::spawn)
//!   ┌─────────────────────┐  ────────▶  ┌──────────────────────────┐
//!   │ .run(|| async {..}) │             │ job().await, in order    │
//!   │                     │  ◀────────  │                          │
//!   └─────────────────────┘   oneshot   └──────────────────────────┘
//! ```
//!
//! Jobs are not cancellable: dropping the future returned by
//! [`FileSystemQueue::run`] only discards the reply.

use futures::future::BoxFuture;
use std::future::Future;
use tokio::sync::{mpsc, oneshot};

use crate::error::{FsError, FsResult};

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Handle to the file system queue worker.
#[derive(Clone, Debug)]
pub struct FileSystemQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl FileSystemQueue {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job().await;
            }
            tracing::debug!("file system queue drained");
        });
        Self { tx }
    }

    /// Enqueue `step` and wait for its output.
    pub async fn run<F, Fut, T>(&self, step: F) -> FsResult<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let out = step().await;
                // Caller may have given up; the step still ran.
                let _ = reply.send(out);
            })
        });
        self.tx.send(job).map_err(|_| FsError::QueueClosed)?;
        rx.await.map_err(|_| FsError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_output() {
        let queue = FileSystemQueue::spawn();
        let out = queue.run(|| async { 40 + 2 }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn test_jobs_do_not_interleave() {
        let queue = FileSystemQueue::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut pending = Vec::new();
        for i in 0..4 {
            let log = log.clone();
            let queue = queue.clone();
            pending.push(tokio::spawn(async move {
                queue
                    .run(move || async move {
                        log.lock().push(format!("start {i}"));
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        log.lock().push(format!("end {i}"));
                    })
                    .await
            }));
        }
        for p in pending {
            p.await.unwrap().unwrap();
        }

        let log = log.lock();
        assert_eq!(log.len(), 8);
        for pair in log.chunks(2) {
            let started = pair[0].strip_prefix("start ").unwrap();
            let ended = pair[1].strip_prefix("end ").unwrap();
            assert_eq!(started, ended);
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = FileSystemQueue::spawn();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = {
            let log = log.clone();
            queue.run(move || async move { log.lock().push(1) })
        };
        let second = {
            let log = log.clone();
            queue.run(move || async move { log.lock().push(2) })
        };
        // Enqueue happens on first poll; poll in submission order.
        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_abandoned_job_still_runs() {
        let queue = FileSystemQueue::spawn();
        let flag = Arc::new(Mutex::new(false));

        let fut = {
            let flag = flag.clone();
            queue.run(move || async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                *flag.lock() = true;
            })
        };
        // Poll once so the job is enqueued, then drop the caller.
        let _ = tokio::time::timeout(Duration::from_millis(1), fut).await;

        queue.run(|| async {}).await.unwrap();
        assert!(*flag.lock());
    }
}
