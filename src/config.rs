//! Search budgets for the hand solver.
//!
//! Every budget is passed to the solver explicitly; nothing here is global.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Budgets bounding one [`solve_hand_with_config`](crate::solve_hand_with_config) call.
///
/// Serialized with millisecond fields so it can be loaded from JSON:
/// ```
/// use makiaveli_solver::SolverConfig;
///
/// let config: SolverConfig =
///     serde_json::from_str(r#"{"overall_timeout_ms": 3000}"#).unwrap();
/// assert_eq!(config.overall_timeout.as_millis(), 3000);
/// assert_eq!(config.max_attempts, 50_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget for the whole call, cross-card enumeration included.
    #[serde(rename = "overall_timeout_ms", with = "millis")]
    pub overall_timeout: Duration,

    /// Budget for one sub-problem (one choice of dissolved floor groups).
    /// Always clipped to the overall deadline.
    #[serde(rename = "sub_timeout_ms", with = "millis")]
    pub sub_timeout: Duration,

    /// Cap on sub-problems tried per incremental solve, independent of time.
    pub max_attempts: usize,
}

impl SolverConfig {
    pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_SUB_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_MAX_ATTEMPTS: usize = 50_000;

    /// Default budgets with a different overall timeout
    pub fn with_overall_timeout(overall_timeout: Duration) -> Self {
        Self {
            overall_timeout,
            ..Self::default()
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Self::DEFAULT_OVERALL_TIMEOUT,
            sub_timeout: Self::DEFAULT_SUB_TIMEOUT,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = SolverConfig::default();
        assert_eq!(config.overall_timeout, Duration::from_secs(60));
        assert_eq!(config.sub_timeout, Duration::from_secs(5));
        assert_eq!(config.max_attempts, 50_000);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SolverConfig {
            overall_timeout: Duration::from_millis(1500),
            sub_timeout: Duration::from_millis(250),
            max_attempts: 10,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"overall_timeout_ms":1500,"sub_timeout_ms":250,"max_attempts":10}"#
        );
        let parsed: SolverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: SolverConfig = serde_json::from_str(r#"{"max_attempts": 7}"#).unwrap();
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.sub_timeout, SolverConfig::DEFAULT_SUB_TIMEOUT);
    }

    #[test]
    fn test_with_overall_timeout() {
        let config = SolverConfig::with_overall_timeout(Duration::from_secs(1));
        assert_eq!(config.overall_timeout, Duration::from_secs(1));
        assert_eq!(config.max_attempts, SolverConfig::DEFAULT_MAX_ATTEMPTS);
    }
}
