/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core flow and job data structures for the GCL synthesis pipeline.
//!
//! Two distinct types model the two sides of the unrolling step:
//!
//! ```text
//! flow table  ──►  Flow  ──(unroll + classify)──►  Job  ──(EDF / packer)──►  ScheduleEntry
//!                  ↑ periodic description           ↑ one concrete instance
//!                  validated once                   owned by the run, then dropped
//! ```
//!
//! # Ownership model
//! `Flow`s are borrowed by every stage; `Job`s are **owned** by the run.  The
//! unroller produces one `Vec<Job>` per flow, the classifier labels them in
//! place, and the schedulers consume them.  Nothing survives the run.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::scheduler::ConfigError;

/// Number of transmission queues (traffic classes) on the shaped egress port.
pub const QUEUE_COUNT: u8 = 8;

/// Default scheduling weight for flows absent from the weight map.
pub const DEFAULT_WEIGHT: f64 = 1.0;

// ── Flow (input) ──────────────────────────────────────────────────────────────

/// A periodic flow crossing the shaped egress port.
///
/// All times are in the same unit (ticks; nanoseconds in the configuration
/// file).  Validated by [`Flow::validate`] before anything is unrolled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    /// Unique flow identifier within the flow table.
    pub id: String,

    /// Period P.
    pub period: u64,

    /// Relative deadline D (`execution ≤ deadline ≤ period`).
    pub deadline: u64,

    /// Transmission duration C on the link.
    pub execution: u64,

    /// Window length w of the weakly-hard constraint.
    pub w: u32,

    /// Minimum number h of instances per w-window that must meet the deadline.
    pub h: u32,

    /// Output queue index, `0..QUEUE_COUNT`.
    pub queue: u8,

    /// Optional-job priority used by the slack packer (higher is preferred).
    pub weight: f64,
}

impl Flow {
    /// Convenience constructor with the default weight.
    pub fn new(
        id: impl Into<String>,
        period: u64,
        deadline: u64,
        execution: u64,
        (w, h): (u32, u32),
        queue: u8,
    ) -> Self {
        Self {
            id: id.into(),
            period,
            deadline,
            execution,
            w,
            h,
            queue,
            weight: DEFAULT_WEIGHT,
        }
    }

    /// Builder-style weight override.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Link utilisation of the flow if every instance were transmitted:
    /// `execution / period`.
    ///
    /// Returns `0.0` when `period` is zero to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.period == 0 {
            0.0
        } else {
            self.execution as f64 / self.period as f64
        }
    }

    /// Fraction of instances the classifier marks mandatory: `h / w`.
    pub fn mandatory_ratio(&self) -> f64 {
        if self.w == 0 {
            0.0
        } else {
            f64::from(self.h) / f64::from(self.w)
        }
    }

    /// Check the per-flow invariants.
    ///
    /// Checks (in order):
    /// 1. `period > 0` and `execution > 0`.
    /// 2. `execution ≤ deadline ≤ period`.
    /// 3. `0 < h ≤ w`.
    /// 4. `queue < QUEUE_COUNT`.
    /// 5. `weight` is finite and strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let flow = || self.id.clone();

        if self.period == 0 {
            return Err(ConfigError::ZeroPeriod { flow: flow() });
        }
        if self.execution == 0 {
            return Err(ConfigError::ZeroExecution { flow: flow() });
        }
        if self.execution > self.deadline {
            return Err(ConfigError::ExecutionExceedsDeadline {
                flow: flow(),
                execution: self.execution,
                deadline: self.deadline,
            });
        }
        if self.deadline > self.period {
            return Err(ConfigError::DeadlineExceedsPeriod {
                flow: flow(),
                deadline: self.deadline,
                period: self.period,
            });
        }
        if self.w == 0 || self.h == 0 || self.h > self.w {
            return Err(ConfigError::InvalidWeaklyHard {
                flow: flow(),
                w: self.w,
                h: self.h,
            });
        }
        if self.queue >= QUEUE_COUNT {
            return Err(ConfigError::QueueOutOfRange {
                flow: flow(),
                queue: self.queue,
            });
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ConfigError::InvalidWeight {
                flow: flow(),
                weight: self.weight,
            });
        }
        Ok(())
    }
}

/// Validate a whole flow table: non-empty, unique identifiers, and every flow
/// individually valid.
///
/// Returns the first violation found, in table order.
pub fn validate_flows(flows: &[Flow]) -> Result<(), ConfigError> {
    if flows.is_empty() {
        return Err(ConfigError::NoFlows);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(flows.len());
    for flow in flows {
        if !seen.insert(flow.id.as_str()) {
            return Err(ConfigError::DuplicateFlow {
                flow: flow.id.clone(),
            });
        }
        flow.validate()?;
    }
    Ok(())
}

// ── Job (per-instance working copy) ───────────────────────────────────────────

/// Weakly-hard label of a job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobLabel {
    /// Must meet its deadline; infeasibility is fatal.
    Mandatory,
    /// Transmitted only if it fits into slack.
    Optional,
}

impl fmt::Display for JobLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobLabel::Mandatory => f.write_str("mandatory"),
            JobLabel::Optional => f.write_str("optional"),
        }
    }
}

/// One concrete instance of a [`Flow`] inside the hyperperiod.
///
/// Created by [`unroll`](crate::unroll), labelled by the
/// [`classifier`](crate::classifier), consumed by the schedulers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Identifier of the owning flow.
    pub flow_id: String,

    /// Instance index `i ≥ 0` within the hyperperiod.
    pub instance: u64,

    /// Absolute release time `i · P`.
    pub release: u64,

    /// Absolute deadline `i · P + D`.
    pub deadline: u64,

    /// Transmission duration C.
    pub execution: u64,

    /// Queue of the owning flow.
    pub queue: u8,

    /// Weight of the owning flow (used only for optional jobs).
    pub weight: f64,

    /// Mandatory / optional label.  Unroller output is `Optional` until the
    /// classifier runs.
    pub label: JobLabel,
}

impl Job {
    /// Returns `true` if the job was classified mandatory.
    pub fn is_mandatory(&self) -> bool {
        self.label == JobLabel::Mandatory
    }

    /// Stable human-readable key: `<flow>#<instance>`.
    pub fn key(&self) -> String {
        format!("{}#{}", self.flow_id, self.instance)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
