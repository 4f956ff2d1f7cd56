use super::cache::SynthesisCache;
use super::registry::TaskRegistry;
use crate::infrastructure::storage::StorageLayout;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodically drop finished tasks older than `retention` together with
/// their text sidecars. Stops when `cancel_token` is cancelled.
pub fn spawn_task_reaper(
    registry: Arc<TaskRegistry>,
    storage: StorageLayout,
    every: Duration,
    retention: Duration,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    spawn_periodic("task_reaper", every, cancel_token, move || {
        let registry = registry.clone();
        let storage = storage.clone();
        async move {
            let Some(cutoff) = chrono::Duration::from_std(retention)
                .ok()
                .and_then(|retention| Utc::now().checked_sub_signed(retention))
            else {
                return;
            };
            let reaped = registry.reap_finished_before(cutoff, &storage).await;
            if reaped > 0 {
                tracing::info!(reaped = reaped, remaining = registry.len(), "Reaped expired tasks");
            }
        }
    })
}

/// Periodically evict synthesis cache entries older than `max_age_days`.
pub fn spawn_cache_janitor(
    cache: Arc<SynthesisCache>,
    every: Duration,
    max_age_days: u32,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    spawn_periodic("cache_janitor", every, cancel_token, move || {
        let cache = cache.clone();
        async move {
            if let Err(e) = cache.evict_older_than(max_age_days).await {
                tracing::error!(error = %e, "Synthesis cache eviction failed");
            }
        }
    })
}

/// Run `job` on every tick until cancelled. Each run is its own task, so a
/// panicking iteration is logged and the loop keeps going.
fn spawn_periodic<F, Fut>(
    name: &'static str,
    every: Duration,
    cancel_token: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::debug!(job = name, interval_secs = every.as_secs(), "Maintenance loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = tokio::spawn(job()).await {
                        tracing::error!(job = name, error = %e, "Maintenance iteration panicked");
                    }
                }
                _ = cancel_token.cancelled() => {
                    tracing::debug!(job = name, "Maintenance loop cancelled");
                    break;
                }
            }
        }
    })
}
