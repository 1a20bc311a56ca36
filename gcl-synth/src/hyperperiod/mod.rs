//! Hyperperiod calculation.
//!
//! The hyperperiod `H` of a flow set is the LCM of all flow periods: the
//! smallest window after which the release pattern repeats.  The synthesised
//! GCL covers exactly `[0, H)` and is replayed cyclically by the shaper.
//!
//! In *window-aligned* mode each flow contributes `w · P` instead of `P`, so
//! that its mandatory/optional pattern (period `w` in instance space) also
//! restarts exactly at the cycle boundary.
//!
//! | Failure | Variant |
//! |---|---|
//! | empty flow set / zero period | [`HyperperiodError::NoValidPeriods`] |
//! | LCM exceeds `u64` | [`HyperperiodError::Overflow`] |
//! | LCM exceeds the configured bound | [`HyperperiodError::TooLarge`] |

pub mod math;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::flow::Flow;
use math::lcm_all;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Default upper limit on the hyperperiod: one hour in nanoseconds.
///
/// Bounds both the number of unrolled jobs and the GCL length.
pub const DEFAULT_MAX_HYPERPERIOD: u64 = 3_600_000_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during hyperperiod calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HyperperiodError {
    /// The flow slice was empty (or a period was zero).
    NoValidPeriods,

    /// LCM calculation overflowed `u64`.
    Overflow { a: u64, b: u64 },

    /// The calculated hyperperiod exceeded the configured limit.
    TooLarge { value: u64, limit: u64 },
}

impl std::fmt::Display for HyperperiodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyperperiodError::NoValidPeriods => {
                write!(f, "no flows with a valid (non-zero) period")
            }
            HyperperiodError::Overflow { a, b } => {
                write!(f, "LCM overflow computing lcm({a}, {b})")
            }
            HyperperiodError::TooLarge { value, limit } => write!(
                f,
                "hyperperiod {value}ns ({:.3}ms) exceeds limit {limit}ns ({:.3}ms)",
                *value as f64 / 1_000_000.0,
                *limit as f64 / 1_000_000.0
            ),
        }
    }
}

impl std::error::Error for HyperperiodError {}

// ── HyperperiodInfo ───────────────────────────────────────────────────────────

/// Calculated hyperperiod for one flow set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HyperperiodInfo {
    /// Cycle length `H`.
    pub hyperperiod: u64,

    /// Unique periods present in the flow set (sorted, deduplicated).
    pub unique_periods: Vec<u64>,

    /// Number of flows that contributed.
    pub flow_count: usize,

    /// `true` when `H` was sized from `w · P` rather than `P`.
    pub window_aligned: bool,
}

impl HyperperiodInfo {
    /// Number of instances of `flow` inside one hyperperiod: `H / P`.
    pub fn instances_of(&self, flow: &Flow) -> u64 {
        if flow.period == 0 {
            0
        } else {
            self.hyperperiod / flow.period
        }
    }
}

/// Calculate the hyperperiod of `flows`.
///
/// # Errors
/// * [`HyperperiodError::NoValidPeriods`] – empty slice or a zero period.
/// * [`HyperperiodError::Overflow`] – LCM computation exceeded `u64`.
/// * [`HyperperiodError::TooLarge`] – result exceeds `limit`.
pub fn calculate_hyperperiod(
    flows: &[Flow],
    limit: u64,
    window_aligned: bool,
) -> Result<HyperperiodInfo, HyperperiodError> {
    if flows.is_empty() || flows.iter().any(|f| f.period == 0) {
        warn!(flow_count = flows.len(), "No flows with valid periods");
        return Err(HyperperiodError::NoValidPeriods);
    }

    let unique_periods: Vec<u64> = {
        let mut v: Vec<u64> = flows.iter().map(|f| f.period).collect();
        v.sort_unstable();
        v.dedup();
        v
    };

    let hyperperiod = if window_aligned {
        let mut cycles = flows
            .iter()
            .map(|f| {
                f.period
                    .checked_mul(u64::from(f.w.max(1)))
                    .ok_or(HyperperiodError::Overflow {
                        a: f.period,
                        b: u64::from(f.w),
                    })
            })
            .collect::<Result<Vec<u64>, _>>()?;
        cycles.sort_unstable();
        cycles.dedup();
        lcm_all(cycles)?
    } else {
        lcm_all(unique_periods.iter().copied())?
    };

    if hyperperiod > limit {
        warn!(hyperperiod, limit, "Hyperperiod exceeds configured limit");
        return Err(HyperperiodError::TooLarge {
            value: hyperperiod,
            limit,
        });
    }

    info!(
        flow_count = flows.len(),
        unique_count = unique_periods.len(),
        hyperperiod,
        window_aligned,
        "Calculated hyperperiod"
    );
    for p in &unique_periods {
        debug!(period = p, instances = hyperperiod / p, "  unique period");
    }

    Ok(HyperperiodInfo {
        hyperperiod,
        unique_periods,
        flow_count: flows.len(),
        window_aligned,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_flow(id: &str, period: u64) -> Flow {
        Flow::new(id, period, period, 1, (1, 1), 0)
    }

    #[test]
    fn two_period_hyperperiod() {
        let flows = vec![make_flow("a", 400_000), make_flow("b", 500_000)];
        let info = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false).unwrap();
        assert_eq!(info.hyperperiod, 2_000_000);
        assert_eq!(info.flow_count, 2);
        assert_eq!(info.instances_of(&flows[0]), 5);
        assert_eq!(info.instances_of(&flows[1]), 4);
    }

    #[test]
    fn unique_periods_are_sorted_and_deduped() {
        let flows = vec![
            make_flow("a", 5_000),
            make_flow("b", 1_000),
            make_flow("c", 5_000),
            make_flow("d", 2_000),
        ];
        let info = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false).unwrap();
        assert_eq!(info.unique_periods, vec![1_000, 2_000, 5_000]);
        assert_eq!(info.hyperperiod, 10_000);
    }

    #[test]
    fn empty_flow_set_has_no_valid_periods() {
        let result = calculate_hyperperiod(&[], DEFAULT_MAX_HYPERPERIOD, false);
        assert_eq!(result.unwrap_err(), HyperperiodError::NoValidPeriods);
    }

    #[test]
    fn zero_period_has_no_valid_periods() {
        let flows = vec![make_flow("a", 0)];
        let result = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false);
        assert_eq!(result.unwrap_err(), HyperperiodError::NoValidPeriods);
    }

    #[test]
    fn exceeding_limit_returns_too_large() {
        let flows = vec![make_flow("a", 1_000_000), make_flow("b", 7_000_000)];
        let result = calculate_hyperperiod(&flows, 5_000_000, false);
        assert!(matches!(
            result,
            Err(HyperperiodError::TooLarge {
                value: 7_000_000,
                limit: 5_000_000
            })
        ));
    }

    #[test]
    fn hyperperiod_at_exactly_the_limit_is_accepted() {
        let flows = vec![make_flow("a", 5_000_000)];
        let info = calculate_hyperperiod(&flows, 5_000_000, false).unwrap();
        assert_eq!(info.hyperperiod, 5_000_000);
    }

    #[test]
    fn window_aligned_mode_multiplies_by_w() {
        // (w,h) = (2,1) on P = 400 µs → pattern repeats every 800 µs
        let flows = vec![
            Flow::new("a", 400_000, 400_000, 1, (2, 1), 0),
            make_flow("b", 500_000),
        ];
        let plain = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false).unwrap();
        let aligned = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, true).unwrap();
        assert_eq!(plain.hyperperiod, 2_000_000);
        assert_eq!(aligned.hyperperiod, 4_000_000);
        assert!(aligned.window_aligned);
        // every flow's instance count is a multiple of its window
        assert_eq!(aligned.instances_of(&flows[0]) % 2, 0);
    }

    #[test]
    fn too_large_error_message_mentions_both_values() {
        let msg = HyperperiodError::TooLarge {
            value: 2_000_000,
            limit: 1_000_000,
        }
        .to_string();
        assert!(msg.contains("2000000ns"));
        assert!(msg.contains("1000000ns"));
    }
}
