//! TradePress automation engine
//!
//! Provides:
//! - Start/stop state machine for the automation components
//! - Runtime (HH:MM:SS) and health scoring for the dashboard
//! - Recurring iteration scheduler on tokio
//! - Key/value state store seam (SQLite or in-memory)
//! - Authorized JSON action dispatch and scoring directives

pub mod ajax;
pub mod auth;
pub mod controller;
pub mod directives;
pub mod error;
pub mod health;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use ajax::{dispatch, handle_request, AjaxRequest, AjaxResponse, ACTIONS};
pub use auth::{create_nonce, verify_nonce, AccessPolicy, Role};
pub use controller::{system_clock, AutomationController, Clock, MAX_ERRORS};
pub use directives::{Directive, DirectiveBook};
pub use error::{AutomationError, AutomationResult};
pub use health::{aggregate_overall_health, calculate_health_score, health_status, HealthPolicy};
pub use runtime::{format_runtime, parse_runtime};
pub use scheduler::{run_iteration, Scheduler, DEFAULT_ITERATION_INTERVAL};
pub use store::{MemoryStore, SqliteStore, StateStore};
pub use types::*;
