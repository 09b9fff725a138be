//! Chunked, bounded-concurrency batch execution.
//!
//! Two failure policies:
//! - [`BatchProcessor::run_fail_fast`]: any failed chunk fails the whole run,
//!   after every started chunk has finished.
//! - [`BatchProcessor::run_resilient`]: failed chunks are logged and dropped,
//!   the remaining chunks still contribute.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use review_import_core::chunk;
use tokio::sync::Semaphore;

/// Splits work into fixed-size chunks and runs them concurrently.
#[derive(Debug, Clone, Copy)]
pub struct BatchProcessor {
    chunk_size: usize,
    max_concurrency: usize,
}

impl BatchProcessor {
    pub fn new(chunk_size: usize, max_concurrency: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Run `process` on every chunk; fail if any chunk fails.
    ///
    /// Outputs are returned in chunk order.
    pub async fn run_fail_fast<T, R, E, F, Fut>(&self, items: Vec<T>, process: F) -> Result<Vec<R>, E>
    where
        F: Fn(usize, Vec<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
    {
        let results = self.run_all(items, process).await;

        let mut outputs = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => {
                    tracing::warn!(chunk = index, error = %e, "chunk failed, aborting batch");
                    return Err(e);
                }
            }
        }
        Ok(outputs)
    }

    /// Run `process` on every chunk; failed chunks are logged and skipped.
    pub async fn run_resilient<T, R, E, F, Fut>(&self, items: Vec<T>, label: &str, process: F) -> Vec<R>
    where
        F: Fn(usize, Vec<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Display,
    {
        let results = self.run_all(items, process).await;

        results
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(output) => Some(output),
                Err(e) => {
                    tracing::warn!(batch = label, chunk = index, error = %e, "chunk failed, continuing without it");
                    None
                }
            })
            .collect()
    }

    async fn run_all<T, R, E, F, Fut>(&self, items: Vec<T>, process: F) -> Vec<Result<R, E>>
    where
        F: Fn(usize, Vec<T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let semaphore = Semaphore::new(self.max_concurrency);
        let semaphore = &semaphore;

        let tasks = chunk(items, self.chunk_size)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let work = process(index, chunk);
                async move {
                    // The semaphore is never closed, so a permit is always granted.
                    let _permit = semaphore.acquire().await.ok();
                    work.await
                }
            });

        join_all(tasks).await
    }
}
