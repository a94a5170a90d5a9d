//! Bounded-concurrency executor for generation tasks.

use std::future::Future;
use std::sync::Arc;

use rk_core::{Error, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs futures on the tokio runtime, at most `limit` at a time.
///
/// [`submit`](Self::submit) waits for a free slot before spawning, so a
/// saturated pool pushes back on the submitter instead of queueing without
/// bound. A task that panics never affects the other tasks; it is logged
/// and counted in [`Drained::panicked`].
pub struct WorkPool<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
    limit: usize,
}

/// Results of [`WorkPool::wait_all`].
#[derive(Debug)]
pub struct Drained<T> {
    /// Task outputs in completion order.
    pub outputs: Vec<T>,
    /// Tasks that panicked instead of producing an output.
    pub panicked: usize,
}

impl<T: Send + 'static> WorkPool<T> {
    /// Create a pool running at most `limit` tasks at once (minimum 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Spawn `task` once a slot is free.
    pub async fn submit<F>(&mut self, task: F) -> Result<()>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("work pool semaphore closed".into()))?;

        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
        Ok(())
    }

    /// Wait for every submitted task to finish.
    pub async fn wait_all(mut self) -> Drained<T> {
        let mut drained = Drained {
            outputs: Vec::with_capacity(self.tasks.len()),
            panicked: 0,
        };
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(output) => drained.outputs.push(output),
                Err(e) => {
                    tracing::error!(error = %e, "Work pool task panicked");
                    drained.panicked += 1;
                }
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkPool::new(3);

        for i in 0..20usize {
            let current = current.clone();
            let peak = peak.clone();
            pool.submit(async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                i
            })
            .await
            .unwrap();
            assert!(pool.in_flight() <= 3);
        }

        let mut outputs = pool.wait_all().await.outputs;
        outputs.sort_unstable();
        assert_eq!(outputs, (0..20).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn submit_blocks_while_saturated() {
        let mut pool = WorkPool::new(1);
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        pool.submit(async move {
            let _ = release_rx.await;
        })
        .await
        .unwrap();
        assert_eq!(pool.in_flight(), 1);

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.submit(async {})).await;
        assert!(blocked.is_err(), "submit should wait for a free slot");

        release_tx.send(()).unwrap();
        pool.submit(async {}).await.unwrap();
        assert_eq!(pool.wait_all().await.outputs.len(), 2);
    }

    fn explode() -> i32 {
        panic!("boom")
    }

    #[tokio::test]
    async fn panicking_task_does_not_affect_others() {
        let mut pool = WorkPool::new(2);
        pool.submit(async { explode() }).await.unwrap();
        pool.submit(async { 7 }).await.unwrap();
        let drained = pool.wait_all().await;
        assert_eq!(drained.outputs, vec![7]);
        assert_eq!(drained.panicked, 1);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let pool: WorkPool<()> = WorkPool::new(0);
        assert_eq!(pool.limit(), 1);
    }
}
