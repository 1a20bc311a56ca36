/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Job unroller: expands every periodic [`Flow`] into its concrete instances
//! over one hyperperiod.
//!
//! Each flow is unrolled independently into its own `Vec<Job>`; no state is
//! shared between flows.

use tracing::debug;

use crate::flow::{Flow, Job, JobLabel};
use crate::hyperperiod::HyperperiodInfo;

/// Unroll a single flow: instances `0 .. H/P` with release `i·P` and deadline
/// `i·P + D`.
///
/// Jobs are returned unlabelled ([`JobLabel::Optional`]); the classifier
/// assigns the real label.
pub fn unroll_flow(flow: &Flow, info: &HyperperiodInfo) -> Vec<Job> {
    let count = info.instances_of(flow);
    (0..count)
        .map(|i| {
            let release = i * flow.period;
            Job {
                flow_id: flow.id.clone(),
                instance: i,
                release,
                deadline: release + flow.deadline,
                execution: flow.execution,
                queue: flow.queue,
                weight: flow.weight,
                label: JobLabel::Optional,
            }
        })
        .collect()
}

/// Unroll every flow, preserving flow-table order.
pub fn unroll_all(flows: &[Flow], info: &HyperperiodInfo) -> Vec<Vec<Job>> {
    flows
        .iter()
        .map(|flow| {
            let jobs = unroll_flow(flow, info);
            debug!(flow = %flow.id, instances = jobs.len(), "unrolled");
            jobs
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperperiod::{calculate_hyperperiod, DEFAULT_MAX_HYPERPERIOD};

    #[test]
    fn instance_count_equals_h_over_p() {
        let flows = vec![
            Flow::new("a", 400_000, 400_000, 6_000, (2, 1), 0),
            Flow::new("b", 500_000, 500_000, 8_000, (1, 1), 0),
        ];
        let info = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false).unwrap();
        let jobs = unroll_all(&flows, &info);
        assert_eq!(jobs[0].len(), 5);
        assert_eq!(jobs[1].len(), 4);
    }

    #[test]
    fn release_and_deadline_follow_the_period() {
        let flow = Flow::new("a", 1_000, 700, 100, (1, 1), 2);
        // a second flow with P = 3 ms stretches the cycle to three instances
        let info = HyperperiodInfo {
            hyperperiod: 3_000,
            unique_periods: vec![1_000, 3_000],
            flow_count: 2,
            window_aligned: false,
        };
        let jobs = unroll_flow(&flow, &info);

        let times: Vec<(u64, u64)> = jobs.iter().map(|j| (j.release, j.deadline)).collect();
        assert_eq!(times, vec![(0, 700), (1_000, 1_700), (2_000, 2_700)]);
        assert!(jobs.iter().all(|j| j.queue == 2 && j.execution == 100));
        assert!(jobs.windows(2).all(|w| w[0].release < w[1].release));
    }

    #[test]
    fn every_job_fits_inside_the_hyperperiod() {
        let flows = vec![
            Flow::new("a", 300, 300, 10, (1, 1), 0),
            Flow::new("b", 200, 150, 10, (1, 1), 0),
        ];
        let info = calculate_hyperperiod(&flows, DEFAULT_MAX_HYPERPERIOD, false).unwrap();
        for job in unroll_all(&flows, &info).iter().flatten() {
            assert!(job.release < info.hyperperiod);
            assert!(job.deadline <= info.hyperperiod);
        }
    }
}
