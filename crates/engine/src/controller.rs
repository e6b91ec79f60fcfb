//! Automation controller — start/stop state machine per component
//!
//! Each component is either stopped or running. Starting records the start
//! time and hands the component to the scheduler (when one is attached);
//! stopping clears the start time and cancels the scheduled iteration.
//! All state lives in the injected [`StateStore`].

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AutomationResult;
use crate::health::{aggregate_overall_health, HealthPolicy};
use crate::runtime::format_runtime;
use crate::scheduler::Scheduler;
use crate::store::{load_json, save_json, StateStore};
use crate::types::*;

/// Source of "now" in epoch seconds
pub type Clock = fn() -> i64;

/// Upper bound on stored errors per component (newest kept)
pub const MAX_ERRORS: usize = 50;

pub fn system_clock() -> i64 {
    Utc::now().timestamp()
}

/// Prepend an error to a component's error log, keeping the newest `MAX_ERRORS`
pub async fn append_process_error(
    store: &dyn StateStore,
    component: Component,
    message: String,
    now: i64,
) -> AutomationResult<()> {
    let key = component.option_key("errors");
    let mut errors: Vec<ProcessError> = load_json(store, &key).await?;
    errors.insert(
        0,
        ProcessError {
            message,
            timestamp: now,
        },
    );
    errors.truncate(MAX_ERRORS);
    save_json(store, &key, &errors).await
}

#[derive(Clone)]
pub struct AutomationController {
    store: Arc<dyn StateStore>,
    scheduler: Option<Arc<Scheduler>>,
    policy: HealthPolicy,
    clock: Clock,
}

impl AutomationController {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            scheduler: None,
            policy: HealthPolicy::default(),
            clock: system_clock,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_policy(mut self, policy: HealthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    pub async fn run_state(&self, component: Component) -> AutomationResult<ComponentRunState> {
        let status = self.store.get(&component.option_key("status")).await?;
        Ok(ComponentRunState {
            status: RunStatus::from_stored(status.as_deref()),
            start_time: self.store.get_i64(&component.option_key("start_time")).await?,
            last_run: self.store.get_i64(&component.option_key("last_run")).await?,
        })
    }

    /// stopped → running. Starting a running component changes nothing.
    pub async fn start(&self, component: Component) -> AutomationResult<ComponentRunState> {
        let state = self.run_state(component).await?;
        if state.is_running() {
            debug!(%component, "Start requested for running component, ignoring");
            return Ok(state);
        }

        let now = self.now();
        self.store
            .set(&component.option_key("status"), RunStatus::Running.as_str())
            .await?;
        self.store
            .set_i64(&component.option_key("start_time"), now)
            .await?;

        match &self.scheduler {
            Some(scheduler) => scheduler.schedule(component, self.store.clone()),
            None => debug!(%component, "No scheduler attached, nothing scheduled"),
        }

        info!(%component, start_time = now, "Component started");
        Ok(ComponentRunState {
            status: RunStatus::Running,
            start_time: now,
            last_run: state.last_run,
        })
    }

    /// running → stopped. The scheduled iteration is cleared either way.
    pub async fn stop(&self, component: Component) -> AutomationResult<ComponentRunState> {
        if let Some(scheduler) = &self.scheduler {
            scheduler.cancel(component);
        }

        let state = self.run_state(component).await?;
        if !state.is_running() {
            debug!(%component, "Stop requested for stopped component, ignoring");
            return Ok(state);
        }

        self.store
            .set(&component.option_key("status"), RunStatus::Stopped.as_str())
            .await?;
        self.store
            .set_i64(&component.option_key("start_time"), 0)
            .await?;

        info!(%component, "Component stopped");
        Ok(ComponentRunState {
            status: RunStatus::Stopped,
            start_time: 0,
            last_run: state.last_run,
        })
    }

    pub async fn toggle(
        &self,
        component: Component,
        toggle: Toggle,
    ) -> AutomationResult<ComponentRunState> {
        match toggle {
            Toggle::Start => self.start(component).await,
            Toggle::Stop => self.stop(component).await,
        }
    }

    /// Schedule every component persisted as running that has no live loop.
    /// Run at server boot and periodically, so flags flipped by another
    /// process (the CLI) are picked up.
    pub async fn resume_running(&self) -> AutomationResult<Vec<Component>> {
        let Some(scheduler) = &self.scheduler else {
            return Ok(Vec::new());
        };

        let mut resumed = Vec::new();
        for component in Component::ALL {
            if !scheduler.is_scheduled(component) && self.run_state(component).await?.is_running() {
                scheduler.schedule(component, self.store.clone());
                resumed.push(component);
            }
        }

        if !resumed.is_empty() {
            info!(components = ?resumed, "Resumed running components");
        }
        Ok(resumed)
    }

    // ------------------------------------------------------------------
    // Error log
    // ------------------------------------------------------------------

    pub async fn errors(&self, component: Component) -> AutomationResult<Vec<ProcessError>> {
        load_json(self.store.as_ref(), &component.option_key("errors")).await
    }

    pub async fn record_error(
        &self,
        component: Component,
        message: impl Into<String>,
    ) -> AutomationResult<()> {
        let message = message.into();
        warn!(%component, error = %message, "Process error recorded");
        append_process_error(self.store.as_ref(), component, message, self.now()).await
    }

    /// Drop all recorded errors; returns how many were cleared
    pub async fn clear_errors(&self, component: Component) -> AutomationResult<usize> {
        // An undecodable log still gets deleted, it just counts as 0
        let cleared = match self.errors(component).await {
            Ok(errors) => errors.len(),
            Err(e) => {
                warn!(%component, "Discarding unreadable error log: {}", e);
                0
            }
        };
        self.store.delete(&component.option_key("errors")).await?;
        info!(%component, cleared, "Process errors cleared");
        Ok(cleared)
    }

    // ------------------------------------------------------------------
    // Health & status
    // ------------------------------------------------------------------

    pub async fn health_snapshot(&self, component: Component) -> AutomationResult<HealthSnapshot> {
        let state = self.run_state(component).await?;
        let errors = self.errors(component).await?;
        let health_score = self.policy.score(&errors, state.last_run, self.now());

        Ok(HealthSnapshot {
            status: state.status,
            last_run: state.last_run,
            errors,
            health_score,
        })
    }

    pub async fn overall_health(&self) -> AutomationResult<OverallHealth> {
        let data_import = self.health_snapshot(Component::DataImport).await?;
        let scoring = self.health_snapshot(Component::Scoring).await?;
        Ok(aggregate_overall_health(
            data_import.health_score,
            scoring.health_score,
        ))
    }

    /// Both background processes happen to be running at the same time
    pub async fn is_coordinated(&self) -> AutomationResult<bool> {
        Ok(self.run_state(Component::DataImport).await?.is_running()
            && self.run_state(Component::Scoring).await?.is_running())
    }

    pub async fn component_status(&self, component: Component) -> AutomationResult<ComponentStatus> {
        let now = self.now();
        let state = self.run_state(component).await?;
        let errors = self.errors(component).await?;
        let iterations = self
            .store
            .get_i64(&component.option_key("iterations"))
            .await?
            .max(0) as u64;

        Ok(ComponentStatus {
            component,
            status: state.status,
            start_time: state.start_time,
            last_run: state.last_run,
            runtime: format_runtime(now, state.start_time, state.is_running()),
            iterations,
            error_count: errors.len(),
            health_score: self.policy.score(&errors, state.last_run, now),
        })
    }

    pub async fn all_statuses(&self) -> AutomationResult<Vec<ComponentStatus>> {
        let mut statuses = Vec::with_capacity(Component::ALL.len());
        for component in Component::ALL {
            statuses.push(self.component_status(component).await?);
        }
        Ok(statuses)
    }
}
