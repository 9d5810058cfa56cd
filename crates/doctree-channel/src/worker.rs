//! Bounded pool for blocking units of work.
//!
//! Submitting waits for a free slot, so a burst of calls queues on the
//! control path instead of spawning without limit. Each unit runs on the
//! runtime's blocking threads and holds its slot until it returns.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::WorkerError;

/// A fixed number of concurrent blocking workers.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` units at once (minimum one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held by a running unit.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Run `job` once a slot is free.
    ///
    /// Resolves when the job has started, not when it finishes; use the
    /// returned handle to collect its output.
    pub async fn submit<F, T>(&self, job: F) -> Result<WorkerHandle<T>, WorkerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::Closed)?;

        let inner = tokio::task::spawn_blocking(move || {
            let _slot = permit;
            job()
        });
        Ok(WorkerHandle { inner })
    }

    /// Stop accepting work. Running units finish normally.
    pub fn close(&self) {
        self.slots.close();
    }
}

/// A running unit of work.
#[derive(Debug)]
pub struct WorkerHandle<T> {
    inner: JoinHandle<T>,
}

impl<T> WorkerHandle<T> {
    /// Wait for the unit's output. A panic inside the unit becomes
    /// [`WorkerError::Panicked`].
    pub async fn join(self) -> Result<T, WorkerError> {
        self.inner.await.map_err(|e| {
            if e.is_panic() {
                WorkerError::Panicked(panic_message(e.into_panic()))
            } else {
                WorkerError::Cancelled
            }
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runs_job() {
        let pool = WorkerPool::new(2);
        let handle = pool.submit(|| 40 + 2).await.unwrap();
        assert_eq!(handle.join().await.unwrap(), 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_waits_for_slot() {
        let pool = WorkerPool::new(1);
        let (release, gate) = mpsc::channel::<()>();

        let first = pool
            .submit(move || {
                gate.recv().ok();
                1
            })
            .await
            .unwrap();
        assert_eq!(pool.available(), 0);

        let second = tokio::time::timeout(Duration::from_millis(50), pool.submit(|| 2)).await;
        assert!(second.is_err(), "second unit started while the slot was held");

        release.send(()).unwrap();
        assert_eq!(first.join().await.unwrap(), 1);
        let second = pool.submit(|| 2).await.unwrap();
        assert_eq!(second.join().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_never_exceeds_size() {
        let pool = WorkerPool::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let running = running.clone();
            let peak = peak.clone();
            handles.push(
                pool.submit(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap(),
            );
        }
        for handle in handles {
            handle.join().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panic_is_reported() {
        let pool = WorkerPool::new(1);
        let handle = pool.submit(|| -> u8 { panic!("boom") }).await.unwrap();
        assert_eq!(handle.join().await, Err(WorkerError::Panicked("boom".into())));
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects() {
        let pool = WorkerPool::new(1);
        pool.close();
        assert!(matches!(pool.submit(|| ()).await, Err(WorkerError::Closed)));
    }
}
