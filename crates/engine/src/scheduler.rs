//! Recurring iteration scheduler — one tokio task per running component
//!
//! A scheduled component waits one interval, then iterates every interval
//! until it is cancelled or its persisted status is no longer "running".

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::controller::{append_process_error, system_clock, Clock};
use crate::error::AutomationResult;
use crate::store::StateStore;
use crate::types::{Component, RunStatus};

/// Delay before the first iteration and between iterations
pub const DEFAULT_ITERATION_INTERVAL: Duration = Duration::from_secs(5);

/// Run one iteration for `component`.
///
/// Returns `Ok(false)` without touching anything when the component is not
/// running, which ends the scheduled loop.
pub async fn run_iteration(
    store: &dyn StateStore,
    component: Component,
    now: i64,
) -> AutomationResult<bool> {
    let status = RunStatus::from_stored(store.get(&component.option_key("status")).await?.as_deref());
    if status != RunStatus::Running {
        debug!(%component, "Component no longer running, skipping iteration");
        return Ok(false);
    }

    let iterations_key = component.option_key("iterations");
    let iterations = store.get_i64(&iterations_key).await?;
    store.set_i64(&component.option_key("last_run"), now).await?;
    store.set_i64(&iterations_key, iterations + 1).await?;

    debug!(%component, iteration = iterations + 1, "Iteration complete");
    Ok(true)
}

pub struct Scheduler {
    interval: Duration,
    clock: Clock,
    tasks: Mutex<HashMap<Component, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            clock: system_clock,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Start the recurring loop for `component`, replacing any existing one
    pub fn schedule(&self, component: Component, store: Arc<dyn StateStore>) {
        let interval = self.interval;
        let clock = self.clock;

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let now = clock();
                match run_iteration(store.as_ref(), component, now).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => {
                        error!(%component, "Iteration failed: {}", e);
                        if let Err(e2) =
                            append_process_error(store.as_ref(), component, e.to_string(), now).await
                        {
                            error!(%component, "Failed to record iteration error: {}", e2);
                        }
                    }
                }
            }
            debug!(%component, "Iteration loop exited");
        });

        let mut tasks = self.lock_tasks();
        if let Some(previous) = tasks.insert(component, handle) {
            previous.abort();
        }
        info!(%component, interval_ms = interval.as_millis() as u64, "Iteration scheduled");
    }

    /// Cancel the scheduled loop. Returns true if a live task was aborted.
    pub fn cancel(&self, component: Component) -> bool {
        match self.lock_tasks().remove(&component) {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                if live {
                    info!(%component, "Scheduled iteration cleared");
                }
                live
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, component: Component) -> bool {
        self.lock_tasks()
            .get(&component)
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Abort every scheduled loop
    pub fn shutdown(&self) {
        let mut tasks = self.lock_tasks();
        for (component, handle) in tasks.drain() {
            handle.abort();
            debug!(%component, "Scheduled iteration aborted on shutdown");
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, HashMap<Component, JoinHandle<()>>> {
        // A panic while holding the lock leaves the map itself intact
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATION_INTERVAL)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const NOW: i64 = 1_700_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    #[tokio::test]
    async fn test_iteration_skips_stopped_component() {
        let store = MemoryStore::new();
        let ran = run_iteration(&store, Component::Signals, NOW).await.unwrap();
        assert!(!ran);
        assert_eq!(store.get("tradepress_signals_last_run").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_iteration_records_last_run_and_count() {
        let store = MemoryStore::new();
        store.set("tradepress_signals_status", "running").await.unwrap();

        assert!(run_iteration(&store, Component::Signals, NOW).await.unwrap());
        assert!(run_iteration(&store, Component::Signals, NOW + 5).await.unwrap());

        assert_eq!(store.get_i64("tradepress_signals_last_run").await.unwrap(), NOW + 5);
        assert_eq!(store.get_i64("tradepress_signals_iterations").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_scheduled_loop_iterates_until_cancelled() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store.set("tradepress_trading_status", "running").await.unwrap();

        let scheduler = Scheduler::new(Duration::from_millis(10)).with_clock(fixed_clock);
        scheduler.schedule(Component::Trading, store.clone());
        assert!(scheduler.is_scheduled(Component::Trading));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(scheduler.cancel(Component::Trading));
        assert!(!scheduler.is_scheduled(Component::Trading));

        let count = store.get_i64("tradepress_trading_iterations").await.unwrap();
        assert!(count >= 1, "expected at least one iteration, got {count}");
        assert_eq!(store.get_i64("tradepress_trading_last_run").await.unwrap(), NOW);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            store.get_i64("tradepress_trading_iterations").await.unwrap(),
            count
        );
    }

    #[tokio::test]
    async fn test_loop_exits_when_status_flips_to_stopped() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store.set("tradepress_scoring_status", "running").await.unwrap();

        let scheduler = Scheduler::new(Duration::from_millis(10)).with_clock(fixed_clock);
        scheduler.schedule(Component::Scoring, store.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        store.set("tradepress_scoring_status", "stopped").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!scheduler.is_scheduled(Component::Scoring));
        // Task already finished on its own
        assert!(!scheduler.cancel(Component::Scoring));
    }

    #[tokio::test]
    async fn test_first_iteration_waits_one_interval() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        store.set("tradepress_algorithm_status", "running").await.unwrap();

        let scheduler = Scheduler::new(Duration::from_secs(60)).with_clock(fixed_clock);
        scheduler.schedule(Component::Algorithm, store.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(
            store.get_i64("tradepress_algorithm_iterations").await.unwrap(),
            0
        );
        scheduler.shutdown();
        assert!(!scheduler.is_scheduled(Component::Algorithm));
    }
}
