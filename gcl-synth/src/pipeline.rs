/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! End-to-end synthesis driver.
//!
//! ```text
//! flows ─► validate ─► hyperperiod ─► unroll ─► classify
//!                                                  │
//!        GCL ◄── emit ◄── merge ◄── pack ◄── slack ◄── EDF (mandatory)
//! ```
//!
//! [`synthesize`] is a pure function of its inputs: no I/O, no global state,
//! the same flows and settings always give the same list and report.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classifier::classify_flow;
use crate::flow::{validate_flows, Flow, Job, QUEUE_COUNT};
use crate::gcl::{GateConfig, GateControlList};
use crate::hyperperiod::{calculate_hyperperiod, HyperperiodInfo, DEFAULT_MAX_HYPERPERIOD};
use crate::report::AdmissionReport;
use crate::schedule::Schedule;
use crate::scheduler::feasibility::link_load;
use crate::scheduler::{ConfigError, MandatoryPolicy, MandatoryScheduler, SynthesisError};
use crate::slack::{find_slack, OptionalPacker, SlackParams};
use crate::unroll::unroll_all;

/// Default guard band: one 1500-byte frame at 1 Gb/s, in nanoseconds.
pub const DEFAULT_GUARD_BAND: u64 = 12_000;

/// Shaper and scheduling settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Idle time kept between an optional frame and the mandatory frame after it.
    pub guard_band: u64,
    /// Minimum idle time after every frame.
    pub inter_frame_gap: u64,
    pub gates: GateConfig,
    /// Queue every optional frame is sent from; `None` keeps each flow's queue.
    pub optional_queue: Option<u8>,
    pub max_hyperperiod: u64,
    pub mandatory_policy: MandatoryPolicy,
    /// Size the cycle from `lcm(w·P)` so every `(w, h)` window repeats whole.
    pub window_aligned_hyperperiod: bool,
    /// Also keep the guard band after a mandatory frame.
    pub guard_after_mandatory: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            guard_band: DEFAULT_GUARD_BAND,
            inter_frame_gap: 0,
            gates: GateConfig::default(),
            optional_queue: None,
            max_hyperperiod: DEFAULT_MAX_HYPERPERIOD,
            mandatory_policy: MandatoryPolicy::default(),
            window_aligned_hyperperiod: false,
            guard_after_mandatory: false,
        }
    }
}

impl SynthesisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.optional_queue {
            Some(queue) if queue >= QUEUE_COUNT => Err(ConfigError::ReservedQueueOutOfRange { queue }),
            _ => Ok(()),
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisOutput {
    pub hyperperiod: HyperperiodInfo,
    pub schedule: Schedule,
    pub gcl: GateControlList,
    pub report: AdmissionReport,
}

/// Run the whole pipeline over `flows`.
///
/// # Errors
/// * [`SynthesisError::Config`] – a flow or setting is malformed, or the
///   hyperperiod cannot be computed.  Nothing is scheduled.
/// * [`SynthesisError::Infeasible`] – a mandatory job misses its deadline.
pub fn synthesize(flows: &[Flow], config: &SynthesisConfig) -> Result<SynthesisOutput, SynthesisError> {
    config.validate()?;
    validate_flows(flows)?;

    info!(
        flows = flows.len(),
        policy = %config.mandatory_policy,
        guard_band = config.guard_band,
        inter_frame_gap = config.inter_frame_gap,
        optional_queue = ?config.optional_queue,
        "Synthesis started"
    );

    let info = calculate_hyperperiod(
        flows,
        config.max_hyperperiod,
        config.window_aligned_hyperperiod,
    )?;

    let mut per_flow = unroll_all(flows, &info);
    for (flow, jobs) in flows.iter().zip(per_flow.iter_mut()) {
        classify_flow(flow, jobs)?;
    }

    let load = link_load(flows, config.inter_frame_gap);
    if load.mandatory_overloaded() {
        warn!(
            mandatory_load = load.mandatory,
            "Mandatory load exceeds link capacity; EDF will fail"
        );
    } else {
        info!(
            mandatory_load = load.mandatory,
            offered_load = load.offered,
            headroom = load.optional_headroom(),
            "Link load"
        );
    }

    let jobs: Vec<Job> = per_flow.iter().flatten().cloned().collect();

    let mandatory = MandatoryScheduler::new(config.mandatory_policy, config.inter_frame_gap)
        .schedule_cyclic(&jobs, info.hyperperiod)?;

    let slacks = find_slack(
        &mandatory,
        &SlackParams {
            hyperperiod: info.hyperperiod,
            inter_frame_gap: config.inter_frame_gap,
            guard_band: config.guard_band,
            guard_after_mandatory: config.guard_after_mandatory,
        },
    );
    let packed = OptionalPacker::new(config.inter_frame_gap, config.optional_queue).pack(&jobs, &slacks);

    let schedule = Schedule::merge(mandatory, packed.admitted);
    debug_assert!(
        schedule
            .violations(info.hyperperiod, config.inter_frame_gap, config.guard_band)
            .is_empty(),
        "{:?}",
        schedule.violations(info.hyperperiod, config.inter_frame_gap, config.guard_band)
    );

    let gcl = GateControlList::emit(&schedule, info.hyperperiod, &config.gates);
    let report = AdmissionReport::build(
        flows,
        &per_flow,
        info.hyperperiod,
        &schedule,
        &packed.dropped,
        load,
    );

    info!(
        hyperperiod = info.hyperperiod,
        entries = schedule.len(),
        gate_events = gcl.len(),
        "Synthesis complete"
    );

    Ok(SynthesisOutput {
        hyperperiod: info,
        schedule,
        gcl,
        report,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
