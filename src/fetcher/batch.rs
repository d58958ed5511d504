use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Default worker count for the URL resolution stage.
pub const RESOLVE_WORKERS: usize = 3;
/// Default worker count for the content fetch stage. Lower than resolution:
/// article pages are heavier and more likely to trip detection.
pub const FETCH_WORKERS: usize = 2;

/// Bounded-concurrency map over a batch of values.
///
/// Every item runs in its own task; at most `workers` run at once. Output
/// has the same length and order as the input. If a worker panics, the
/// item comes back unchanged, so its failure fields stay unset.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    workers: usize,
}

impl BatchRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub async fn run<T, F, Fut>(&self, items: Vec<T>, worker: F) -> Vec<T>
    where
        T: Clone + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let worker = Arc::new(worker);
        let mut handles = Vec::with_capacity(items.len());

        for item in items.iter().cloned() {
            let semaphore = semaphore.clone();
            let worker = worker.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                worker(item).await
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(items.len());
        for (index, (original, handle)) in items.into_iter().zip(handles).enumerate() {
            match handle.await {
                Ok(item) => results.push(item),
                Err(e) => {
                    tracing::error!("Batch item {} failed: {}", index, e);
                    results.push(original);
                }
            }
        }

        results
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(RESOLVE_WORKERS)
    }
}
