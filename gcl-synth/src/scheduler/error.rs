/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the synthesis pipeline.
//!
//! Two failure layers:
//!
//! * [`ConfigError`]: the flow table or shaper settings are malformed.
//!   Raised before any job is scheduled.
//! * [`InfeasibleSchedule`]: a mandatory job cannot meet its deadline under
//!   EDF.  Carries the offending instance and the overrun so the operator can
//!   lower the load or revise the queue assignment.
//!
//! [`SynthesisError`] wraps both and is what
//! [`synthesize()`](crate::pipeline::synthesize) returns.
//!
//! Dropped optional jobs are **not** errors; they are listed in the
//! admission report.

use thiserror::Error;

use crate::hyperperiod::HyperperiodError;

// ── Configuration errors ──────────────────────────────────────────────────────

/// Malformed flow parameters or shaper settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The flow table is empty.
    #[error("no flows provided, flow table is empty")]
    NoFlows,

    /// Two flows share an identifier.
    #[error("duplicate flow identifier '{flow}'")]
    DuplicateFlow { flow: String },

    #[error("flow '{flow}' has a zero period")]
    ZeroPeriod { flow: String },

    #[error("flow '{flow}' has a zero execution time")]
    ZeroExecution { flow: String },

    /// `C > D`.
    #[error("flow '{flow}': execution time {execution} exceeds deadline {deadline}")]
    ExecutionExceedsDeadline {
        flow: String,
        execution: u64,
        deadline: u64,
    },

    /// `D > P`.
    #[error("flow '{flow}': deadline {deadline} exceeds period {period}")]
    DeadlineExceedsPeriod {
        flow: String,
        deadline: u64,
        period: u64,
    },

    /// `(w, h)` violates `0 < h ≤ w`.
    #[error("flow '{flow}': invalid weakly-hard parameters (w={w}, h={h}); require 0 < h <= w")]
    InvalidWeaklyHard { flow: String, w: u32, h: u32 },

    #[error("flow '{flow}': queue {queue} out of range (0..=7)")]
    QueueOutOfRange { flow: String, queue: u8 },

    #[error("flow '{flow}': weight {weight} must be a positive finite number")]
    InvalidWeight { flow: String, weight: f64 },

    /// The weight map names a flow that is not in the flow table.
    #[error("weight given for unknown flow '{flow}'")]
    UnknownWeightFlow { flow: String },

    /// The mandatory policy name is not recognised.
    #[error("unknown mandatory policy: '{0}' (valid: deadline_ordered, work_conserving)")]
    UnknownPolicy(String),

    /// The reserved optional queue is outside `0..=7`.
    #[error("reserved optional queue {queue} out of range (0..=7)")]
    ReservedQueueOutOfRange { queue: u8 },

    /// The hyperperiod could not be computed or is too large.
    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),
}

// ── Infeasibility ─────────────────────────────────────────────────────────────

/// The first mandatory job whose EDF finish time exceeds its deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "mandatory job {flow}#{instance} finishes at {finish} but its deadline is {deadline} \
     (overrun {overrun}, released at {release})"
)]
pub struct InfeasibleSchedule {
    pub flow: String,
    pub instance: u64,
    pub release: u64,
    pub deadline: u64,
    pub finish: u64,
    pub overrun: u64,
}

// ── Top-level ─────────────────────────────────────────────────────────────────

/// Every way a synthesis run can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("infeasible schedule: {0}")]
    Infeasible(#[from] InfeasibleSchedule),
}

impl From<HyperperiodError> for SynthesisError {
    fn from(e: HyperperiodError) -> Self {
        SynthesisError::Config(ConfigError::Hyperperiod(e))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_message_names_the_instance_and_overrun() {
        let e = InfeasibleSchedule {
            flow: "f3".into(),
            instance: 2,
            release: 0,
            deadline: 10_000,
            finish: 12_000,
            overrun: 2_000,
        };
        let msg = e.to_string();
        assert!(msg.contains("f3#2"));
        assert!(msg.contains("overrun 2000"));
    }

    #[test]
    fn hyperperiod_error_converts_into_config_error() {
        let e: SynthesisError = HyperperiodError::NoValidPeriods.into();
        assert!(matches!(
            e,
            SynthesisError::Config(ConfigError::Hyperperiod(HyperperiodError::NoValidPeriods))
        ));
    }
}
