//! Bounded worker pool that runs admitted executions

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_core::{ManagerError, ManagerResult};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio_util::task::TaskTracker;
use tracing::debug;

/// At most `size` jobs run at once; up to `queue_capacity` more wait for a
/// free worker. Offers beyond that are refused rather than blocking the
/// caller.
#[derive(Debug)]
pub struct WorkerPool {
    handle: Handle,
    workers: Arc<Semaphore>,
    size: usize,
    queue_capacity: usize,
    queued: Arc<AtomicUsize>,
    tracker: TaskTracker,
    /// Held while admitting a job and while closing, so no job can be
    /// spawned after `shutdown` has started waiting
    admission: Mutex<()>,
}

impl WorkerPool {
    pub fn new(size: usize, queue_capacity: usize, handle: Handle) -> Self {
        Self {
            handle,
            workers: Arc::new(Semaphore::new(size)),
            size,
            queue_capacity,
            queued: Arc::new(AtomicUsize::new(0)),
            tracker: TaskTracker::new(),
            admission: Mutex::new(()),
        }
    }

    /// Hand a job to the pool without waiting for it to start
    pub fn offer<F>(&self, job: F) -> ManagerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let _admission = self.admission.lock();
        if self.tracker.is_closed() {
            return Err(ManagerError::ShuttingDown);
        }

        match self.workers.clone().try_acquire_owned() {
            Ok(permit) => {
                self.handle.spawn(self.tracker.track_future(async move {
                    let _permit = permit;
                    job.await;
                }));
            }
            Err(TryAcquireError::NoPermits) => {
                let capacity = self.queue_capacity;
                self.queued
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                        (n < capacity).then_some(n + 1)
                    })
                    .map_err(|_| ManagerError::QueueFull { capacity })?;

                let workers = self.workers.clone();
                let queued = self.queued.clone();
                self.handle.spawn(self.tracker.track_future(async move {
                    let permit = workers.acquire_owned().await;
                    queued.fetch_sub(1, Ordering::SeqCst);
                    if let Ok(_permit) = permit {
                        job.await;
                    }
                }));
            }
            Err(TryAcquireError::Closed) => return Err(ManagerError::ShuttingDown),
        }

        Ok(())
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.size
    }

    /// Jobs currently holding a worker
    pub fn active(&self) -> usize {
        self.size.saturating_sub(self.workers.available_permits())
    }

    /// Jobs admitted but still waiting for a worker
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Stop accepting jobs and wait for every admitted job to finish
    pub async fn shutdown(&self) {
        {
            let _admission = self.admission.lock();
            self.tracker.close();
        }
        debug!(
            active = self.active(),
            queued = self.queued(),
            "draining worker pool"
        );
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2, 16, Handle::current());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = running.clone();
            let peak = peak.clone();
            pool.offer(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.shutdown().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_queue_full_is_refused() {
        let pool = WorkerPool::new(1, 1, Handle::current());
        let gate = Arc::new(Semaphore::new(0));

        for _ in 0..2 {
            let gate = gate.clone();
            pool.offer(async move {
                let _ = gate.acquire().await;
            })
            .unwrap();
        }
        assert_eq!(pool.active(), 1);

        let refused = pool.offer(async {});
        assert_eq!(refused, Err(ManagerError::QueueFull { capacity: 1 }));

        gate.add_permits(2);
        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .unwrap();
        assert_eq!(pool.queued(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_nothing_runs_after_shutdown_returns() {
        for _ in 0..50 {
            let pool = Arc::new(WorkerPool::new(2, 64, Handle::current()));
            let ran = Arc::new(AtomicUsize::new(0));

            let offers: Vec<_> = (0..4)
                .map(|_| {
                    let pool = pool.clone();
                    let ran = ran.clone();
                    tokio::spawn(async move {
                        let mut accepted = 0;
                        for _ in 0..16 {
                            let ran = ran.clone();
                            if pool
                                .offer(async move {
                                    ran.fetch_add(1, Ordering::SeqCst);
                                })
                                .is_ok()
                            {
                                accepted += 1;
                            }
                            tokio::task::yield_now().await;
                        }
                        accepted
                    })
                })
                .collect();

            pool.shutdown().await;
            let at_shutdown = ran.load(Ordering::SeqCst);

            let mut accepted = 0;
            for offer in offers {
                accepted += offer.await.unwrap();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;

            assert_eq!(at_shutdown, accepted);
            assert_eq!(ran.load(Ordering::SeqCst), at_shutdown);
        }
    }

    #[tokio::test]
    async fn test_offer_after_shutdown() {
        let pool = WorkerPool::new(1, 1, Handle::current());
        pool.shutdown().await;
        assert_eq!(pool.offer(async {}), Err(ManagerError::ShuttingDown));
    }
}
