/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Admission report.
//!
//! Summarises one synthesis run per flow and for the whole link: how many
//! instances were mandatory, how many optional ones made it into slack, the
//! weight that was admitted or lost, and whether the transmitted instances
//! still satisfy each flow's `(w, h)` constraint.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::classifier::min_mandatory_in_windows;
use crate::flow::{Flow, Job, JobLabel};
use crate::scheduler::feasibility::LinkLoad;
use crate::schedule::{Schedule, ScheduleEntry};
use crate::slack::DroppedJob;

/// Per-flow admission figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub flow_id: String,
    pub queue: u8,
    pub w: u32,
    pub h: u32,
    pub weight: f64,

    /// Instances in one hyperperiod.
    pub instances: usize,
    pub mandatory: usize,
    pub optional: usize,
    pub optional_admitted: usize,
    pub optional_dropped: usize,
    pub admitted_weight: f64,
    pub dropped_weight: f64,

    /// Fewest mandatory instances in any window of `w` inside the cycle.
    pub min_mandatory_in_window: Option<usize>,
    /// Fewest transmitted instances (mandatory or admitted optional) in any
    /// window of `w` inside the cycle.
    pub min_transmitted_in_window: Option<usize>,
    /// `(w, h)` holds in every window of the cycle counting mandatory jobs
    /// alone.
    pub weakly_hard_satisfied: bool,
    /// `(w, h)` also holds for windows that straddle the cycle boundary when
    /// the list is replayed.
    pub holds_across_cycles: bool,

    /// Largest finish minus release among transmitted instances.
    pub max_response_time: u64,
}

/// Link-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTotals {
    pub jobs: usize,
    pub mandatory: usize,
    pub optional_admitted: usize,
    pub optional_dropped: usize,
    pub admitted_weight: f64,
    pub dropped_weight: f64,
    pub link_load: LinkLoad,
    /// Transmitting time over one cycle divided by `H`.
    pub link_utilization: f64,
    /// Every mandatory job is on the link and meets its deadline.
    pub schedulable: bool,
}

/// Full admission report for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionReport {
    pub hyperperiod: u64,
    pub flows: Vec<FlowReport>,
    pub totals: ReportTotals,
    pub entries: Vec<ScheduleEntry>,
    pub dropped: Vec<DroppedJob>,
}

impl AdmissionReport {
    /// Build the report.
    ///
    /// `jobs[i]` holds the classified instances of `flows[i]`.
    pub fn build(
        flows: &[Flow],
        jobs: &[Vec<Job>],
        hyperperiod: u64,
        schedule: &Schedule,
        dropped: &[DroppedJob],
        link_load: LinkLoad,
    ) -> Self {
        let index: HashMap<&str, usize> = flows
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.as_str(), i))
            .collect();

        let mut transmitted: Vec<Vec<bool>> = jobs.iter().map(|js| vec![false; js.len()]).collect();
        let mut max_response = vec![0u64; flows.len()];
        let mut admitted = vec![(0usize, 0.0f64); flows.len()];
        let mut mandatory_on_time = 0usize;

        for entry in &schedule.entries {
            let Some(&fi) = index.get(entry.flow_id.as_str()) else {
                continue;
            };
            if let Some(slot) = transmitted[fi].get_mut(entry.instance as usize) {
                *slot = true;
            }
            max_response[fi] = max_response[fi].max(entry.response_time());
            if entry.is_mandatory() {
                if entry.finish <= entry.deadline {
                    mandatory_on_time += 1;
                }
            } else {
                admitted[fi].0 += 1;
                admitted[fi].1 += entry.weight;
            }
        }

        let mut lost = vec![(0usize, 0.0f64); flows.len()];
        for d in dropped {
            if let Some(&fi) = index.get(d.flow_id.as_str()) {
                lost[fi].0 += 1;
                lost[fi].1 += d.weight;
            }
        }

        let flow_reports: Vec<FlowReport> = flows
            .iter()
            .enumerate()
            .map(|(fi, flow)| {
                let labels: Vec<JobLabel> = jobs[fi].iter().map(|j| j.label).collect();
                let sent: Vec<JobLabel> = transmitted[fi]
                    .iter()
                    .map(|&t| if t { JobLabel::Mandatory } else { JobLabel::Optional })
                    .collect();
                let w = flow.w as usize;
                let h = flow.h as usize;
                let min_mandatory = min_mandatory_in_windows(&labels, w);
                let mandatory = labels.iter().filter(|l| **l == JobLabel::Mandatory).count();

                FlowReport {
                    flow_id: flow.id.clone(),
                    queue: flow.queue,
                    w: flow.w,
                    h: flow.h,
                    weight: flow.weight,
                    instances: labels.len(),
                    mandatory,
                    optional: labels.len() - mandatory,
                    optional_admitted: admitted[fi].0,
                    optional_dropped: lost[fi].0,
                    admitted_weight: admitted[fi].1,
                    dropped_weight: lost[fi].1,
                    min_mandatory_in_window: min_mandatory,
                    min_transmitted_in_window: min_mandatory_in_windows(&sent, w),
                    weakly_hard_satisfied: min_mandatory.map_or(true, |m| m >= h),
                    holds_across_cycles: cyclic_min(&labels, w).map_or(true, |m| m >= h),
                    max_response_time: max_response[fi],
                }
            })
            .collect();

        let mandatory_total: usize = flow_reports.iter().map(|f| f.mandatory).sum();
        let totals = ReportTotals {
            jobs: jobs.iter().map(Vec::len).sum(),
            mandatory: mandatory_total,
            optional_admitted: flow_reports.iter().map(|f| f.optional_admitted).sum(),
            optional_dropped: dropped.len(),
            admitted_weight: flow_reports.iter().map(|f| f.admitted_weight).sum(),
            dropped_weight: dropped.iter().map(|d| d.weight).sum(),
            link_load,
            link_utilization: if hyperperiod == 0 {
                0.0
            } else {
                schedule.busy_time() as f64 / hyperperiod as f64
            },
            schedulable: mandatory_on_time == mandatory_total,
        };

        for f in flow_reports.iter().filter(|f| !f.holds_across_cycles) {
            warn!(
                flow = %f.flow_id,
                w = f.w,
                h = f.h,
                instances = f.instances,
                "(w, h) pattern breaks across the cycle boundary; consider a window-aligned hyperperiod"
            );
        }
        info!(
            hyperperiod,
            mandatory = totals.mandatory,
            optional_admitted = totals.optional_admitted,
            optional_dropped = totals.optional_dropped,
            admitted_weight = totals.admitted_weight,
            link_utilization = totals.link_utilization,
            schedulable = totals.schedulable,
            "Admission report"
        );

        Self {
            hyperperiod,
            flows: flow_reports,
            totals,
            entries: schedule.entries.clone(),
            dropped: dropped.to_vec(),
        }
    }

    pub fn flow(&self, id: &str) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.flow_id == id)
    }
}

/// Window minimum over the cyclic replay of `labels`.
///
/// A window of `w = q·n + r` entries covers `q` whole cycles plus `r`
/// consecutive entries, so only the `r`-wide remainder is scanned.
fn cyclic_min(labels: &[JobLabel], w: usize) -> Option<usize> {
    let n = labels.len();
    if n == 0 || w == 0 {
        return None;
    }
    let per_cycle = labels.iter().filter(|l| **l == JobLabel::Mandatory).count();
    let whole = (w / n) * per_cycle;
    let r = w % n;
    if r == 0 {
        return Some(whole);
    }
    let unrolled: Vec<JobLabel> = labels.iter().copied().cycle().take(n + r - 1).collect();
    min_mandatory_in_windows(&unrolled, r).map(|m| whole + m)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
