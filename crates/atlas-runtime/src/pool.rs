// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounded task pool.
//!
//! The coordinator fans per-(layer, state) work onto at most `pool_size`
//! concurrent tasks. Workers share no mutable state; each returns its own
//! result and the coordinator folds them in a deterministic order.

use atlas_providers::cancel::CancellationToken;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pool width default: number of cores, never fewer than two.
#[must_use]
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(2)
        .max(2)
}

/// Run one future per item with at most `pool_size` in flight.
///
/// Results come back in **input order** regardless of completion order,
/// so downstream folds stay deterministic. Cancellation is cooperative:
/// workers observe the token themselves; the pool only stops spawning
/// new tasks once the token is signalled.
pub async fn run_on_pool<T, R, F, Fut>(
    items: Vec<T>,
    pool_size: usize,
    cancel: &CancellationToken,
    work: F,
) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));
    let mut join_set: JoinSet<(usize, R)> = JoinSet::new();
    let total = items.len();

    for (index, item) in items.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore never closed");
        let future = work(item);
        join_set.spawn(async move {
            let result = future.await;
            drop(permit);
            (index, result)
        });
    }

    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some(joined) = join_set.join_next().await {
        if let Ok((index, result)) = joined {
            results[index] = Some(result);
        }
    }
    results
}
