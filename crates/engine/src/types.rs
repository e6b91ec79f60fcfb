//! Types for the automation controller

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AutomationError;

/// A named background component that can be started and stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Algorithm,
    Signals,
    Trading,
    DataImport,
    Scoring,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Algorithm,
        Component::Signals,
        Component::Trading,
        Component::DataImport,
        Component::Scoring,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Algorithm => "algorithm",
            Component::Signals => "signals",
            Component::Trading => "trading",
            Component::DataImport => "data_import",
            Component::Scoring => "scoring",
        }
    }

    /// Storage key for one field of this component's run state
    pub fn option_key(&self, field: &str) -> String {
        format!("tradepress_{}_{}", self.as_str(), field)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AutomationError::InvalidComponent(s.to_string()))
    }
}

/// Run status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    #[default]
    Stopped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Stopped => "stopped",
        }
    }

    /// Decode a stored flag; anything other than "running" reads as stopped
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("running") => RunStatus::Running,
            _ => RunStatus::Stopped,
        }
    }
}

/// Requested transition for a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    Start,
    Stop,
}

/// Persisted run state of one component. Timestamps are epoch seconds, 0 = unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentRunState {
    pub status: RunStatus,
    pub start_time: i64,
    pub last_run: i64,
}

impl ComponentRunState {
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// An error recorded against a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessError {
    pub message: String,
    pub timestamp: i64,
}

/// Derived health of a single component (never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: RunStatus,
    pub last_run: i64,
    pub errors: Vec<ProcessError>,
    pub health_score: u8,
}

/// Status bucket for an overall health score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Degraded,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Per-component scores feeding the overall figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub data_import: u8,
    pub scoring: u8,
}

/// Weighted health across the data-import and scoring processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub score: u8,
    pub status: HealthStatus,
    pub components: ComponentScores,
}

/// Dashboard view of a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub component: Component,
    pub status: RunStatus,
    pub start_time: i64,
    pub last_run: i64,
    pub runtime: String,
    pub iterations: u64,
    pub error_count: usize,
    pub health_score: u8,
}
