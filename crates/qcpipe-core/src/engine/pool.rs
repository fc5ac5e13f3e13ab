//! Bounded worker pools bridging the cooperative scheduler and the
//! CPU-bound numeric kernels.
//!
//! Capacity is a semaphore token acquired before the blocking task is
//! handed to a dedicated thread. The solver pool has capacity 1, which
//! globally serializes heavy solver work; the visualization pool is
//! separate so grid queries never wait behind a freshly dispatched
//! calculation.

use crate::engine::error::EngineError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::error;

pub struct WorkerPool {
    name: &'static str,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "worker pool needs at least one slot");
        Self {
            name,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Runs a blocking task on the pool and awaits its value. The
    /// caller suspends without holding any lock while the task runs.
    pub async fn run<T, F>(&self, task_fn: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::Pool(format!("{} pool is closed", self.name)))?;
        task::spawn_blocking(task_fn)
            .await
            .map_err(|e| EngineError::Pool(format!("{} pool task aborted: {e}", self.name)))
    }

    /// Dispatches a blocking task without waiting for it; `submit`
    /// returns immediately and completion is observed through whatever
    /// state the task publishes.
    ///
    /// A task that dies without completing (a panic in a kernel) is
    /// reported to `on_abort` on the scheduler context, so the failure
    /// can be folded into the owning record instead of taking down the
    /// pool or unrelated tasks.
    pub fn dispatch<F, A>(&self, task_fn: F, on_abort: A)
    where
        F: FnOnce() + Send + 'static,
        A: FnOnce(String) + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let name = self.name;
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                on_abort(format!("{name} pool is closed"));
                return;
            };
            if let Err(join_err) = task::spawn_blocking(task_fn).await {
                error!(pool = name, %join_err, "worker task aborted");
                on_abort(join_err.to_string());
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn capacity_one_serializes_tasks() {
        let pool = Arc::new(WorkerPool::new("test", 1));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_returns_task_value() {
        let pool = WorkerPool::new("test", 2);
        let value = pool.run(|| 6 * 7).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_task_reports_abort_and_leaves_pool_usable() {
        let pool = Arc::new(WorkerPool::new("test", 1));
        let (tx, rx) = oneshot::channel();

        pool.dispatch(
            || panic!("kernel blew up"),
            move |message| {
                let _ = tx.send(message);
            },
        );

        let message = rx.await.unwrap();
        assert!(message.contains("panic"));

        // Unrelated work still runs.
        assert_eq!(pool.run(|| 1).await.unwrap(), 1);
    }
}
