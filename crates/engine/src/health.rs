//! Process health scoring
//!
//! Per-component score: start at 100, deduct per recorded error and for
//! staleness of the last run, clamp to [0, 100].
//! Overall score: data_import × 0.6 + scoring × 0.4, rounded half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{ComponentScores, HealthStatus, OverallHealth, ProcessError};

const SIX_HOURS: i64 = 6 * 3600;
const DAY: i64 = 24 * 3600;

/// Deductions applied by the health scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthPolicy {
    /// Points lost per recorded error (default 15)
    pub error_penalty: i64,
    /// Last run more than 24h ago (default 30)
    pub stale_day_penalty: i64,
    /// Last run more than 6h ago (default 15)
    pub stale_hours_penalty: i64,
    /// Never run at all (default 40)
    pub never_run_penalty: i64,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            error_penalty: 15,
            stale_day_penalty: 30,
            stale_hours_penalty: 15,
            never_run_penalty: 40,
        }
    }
}

impl HealthPolicy {
    /// Score a component from its error list and last-run timestamp (0 = never)
    pub fn score(&self, errors: &[ProcessError], last_run: i64, now: i64) -> u8 {
        let mut score: i64 = 100;
        score -= self.error_penalty * errors.len() as i64;

        if last_run == 0 {
            score -= self.never_run_penalty;
        } else {
            let since = now - last_run;
            if since > DAY {
                score -= self.stale_day_penalty;
            } else if since > SIX_HOURS {
                score -= self.stale_hours_penalty;
            }
        }

        score.clamp(0, 100) as u8
    }
}

/// Score a component with the default deductions
pub fn calculate_health_score(errors: &[ProcessError], last_run: i64, now: i64) -> u8 {
    HealthPolicy::default().score(errors, last_run, now)
}

/// Map an overall score to its status bucket
pub fn health_status(score: u8) -> HealthStatus {
    match score {
        0..=29 => HealthStatus::Critical,
        30..=59 => HealthStatus::Degraded,
        60..=79 => HealthStatus::Warning,
        _ => HealthStatus::Healthy,
    }
}

/// Combine the data-import and scoring scores into the overall figure
pub fn aggregate_overall_health(data_import: u8, scoring: u8) -> OverallHealth {
    let weighted = Decimal::from(data_import) * dec!(0.6) + Decimal::from(scoring) * dec!(0.4);
    let score = weighted
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(0)
        .min(100);

    OverallHealth {
        score,
        status: health_status(score),
        components: ComponentScores {
            data_import,
            scoring,
        },
    }
}
