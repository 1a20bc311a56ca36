/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Slack finder and optional-job packer.
//!
//! Once the mandatory schedule is final, the link is busy during
//! `[start, finish + gap)` of every mandatory entry.  Everything else inside
//! `[0, H)` is slack.  Optional jobs are packed into slack greedily; mandatory
//! entries are never moved.
//!
//! ```text
//!   mandatory        slack                         mandatory
//! ─[███████]+gap|· · · · · · · · · · · · · · · |G |[███████]─
//!               ↑ earliest_start        latest_finish ↑
//! ```
//!
//! Each [`SlackInterval`] is pre-clipped to the window an optional frame may
//! occupy: `earliest_start` (plus the guard band when it also applies after a
//! mandatory frame) and `latest_finish` (next mandatory start minus the gap
//! and the guard band).  The schedule is replayed cyclically, so the trailing
//! slack is followed by the first mandatory frame of the next cycle and the
//! leading slack starts after whatever part of the last busy interval spills
//! past `H`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::{debug, info};

use crate::flow::Job;
use crate::schedule::ScheduleEntry;

// ── Slack intervals ───────────────────────────────────────────────────────────

/// Link timing parameters shared by the slack finder and the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlackParams {
    pub hyperperiod: u64,
    pub inter_frame_gap: u64,
    pub guard_band: u64,
    /// Also keep `guard_band` between a mandatory frame and the optional
    /// frame that follows it.
    pub guard_after_mandatory: bool,
}

/// One idle span of the link between mandatory busy intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlackInterval {
    /// First idle instant.
    pub start: u64,
    /// End of the idle span (next mandatory start, or `H`).
    pub end: u64,
    /// Whether a mandatory frame follows this slack (in this cycle or the
    /// next one).
    pub precedes_mandatory: bool,
    /// Earliest start of an optional frame.
    pub earliest_start: u64,
    /// Latest finish of an optional frame.
    pub latest_finish: u64,
}

impl SlackInterval {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Find every slack interval of `[0, H)` around the `mandatory` entries.
///
/// `mandatory` must be sorted by start and non-overlapping, as returned by
/// [`MandatoryScheduler::schedule`](crate::scheduler::MandatoryScheduler::schedule).
pub fn find_slack(mandatory: &[ScheduleEntry], params: &SlackParams) -> Vec<SlackInterval> {
    let SlackParams {
        hyperperiod,
        inter_frame_gap: gap,
        guard_band: guard,
        guard_after_mandatory,
    } = *params;
    let after_guard = if guard_after_mandatory { guard } else { 0 };

    let (first, last) = match (mandatory.first(), mandatory.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            if hyperperiod == 0 {
                return Vec::new();
            }
            return vec![SlackInterval {
                start: 0,
                end: hyperperiod,
                precedes_mandatory: false,
                earliest_start: 0,
                latest_finish: hyperperiod.saturating_sub(gap),
            }];
        }
    };

    let mut slacks = Vec::with_capacity(mandatory.len() + 1);
    let before = |next_start: u64| next_start.saturating_sub(gap + guard);

    // Leading: after the previous cycle's last busy interval.
    let last_busy_end = last.finish + gap;
    let carry = last_busy_end.saturating_sub(hyperperiod);
    if carry < first.start {
        slacks.push(SlackInterval {
            start: carry,
            end: first.start,
            precedes_mandatory: true,
            earliest_start: (last_busy_end + after_guard)
                .saturating_sub(hyperperiod)
                .max(carry),
            latest_finish: before(first.start),
        });
    }

    // Between consecutive mandatory frames.
    for pair in mandatory.windows(2) {
        let idle_from = pair[0].finish + gap;
        let idle_to = pair[1].start;
        if idle_from < idle_to {
            slacks.push(SlackInterval {
                start: idle_from,
                end: idle_to,
                precedes_mandatory: true,
                earliest_start: idle_from + after_guard,
                latest_finish: before(idle_to),
            });
        }
    }

    // Trailing: followed by the first frame of the next cycle at H + first.start.
    if last_busy_end < hyperperiod {
        slacks.push(SlackInterval {
            start: last_busy_end,
            end: hyperperiod,
            precedes_mandatory: true,
            earliest_start: last_busy_end + after_guard,
            latest_finish: hyperperiod
                .min((hyperperiod + first.start).saturating_sub(guard))
                .saturating_sub(gap),
        });
    }

    debug!(
        count = slacks.len(),
        idle = slacks.iter().map(SlackInterval::len).sum::<u64>(),
        "slack intervals found"
    );
    slacks
}

// ── Optional packer ───────────────────────────────────────────────────────────

/// Why an optional job was not transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// By the time the link was free its deadline could no longer be met.
    DeadlinePassed,
    /// No slack interval was large enough before the end of the cycle.
    NoFittingSlack,
}

/// An optional job that was not admitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedJob {
    pub flow_id: String,
    pub instance: u64,
    pub release: u64,
    pub deadline: u64,
    pub execution: u64,
    pub weight: f64,
    pub reason: DropReason,
}

impl DroppedJob {
    fn from_job(job: &Job, reason: DropReason) -> Self {
        Self {
            flow_id: job.flow_id.clone(),
            instance: job.instance,
            release: job.release,
            deadline: job.deadline,
            execution: job.execution,
            weight: job.weight,
            reason,
        }
    }
}

/// Result of one packing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PackingOutcome {
    pub admitted: Vec<ScheduleEntry>,
    pub dropped: Vec<DroppedJob>,
}

impl PackingOutcome {
    pub fn admitted_weight(&self) -> f64 {
        self.admitted.iter().map(|e| e.weight).sum()
    }

    pub fn dropped_weight(&self) -> f64 {
        self.dropped.iter().map(|d| d.weight).sum()
    }
}

/// Candidate ordering: higher weight first, then earlier deadline, then flow
/// id and instance so the order is total.
struct Candidate<'a>(&'a Job);

impl Candidate<'_> {
    fn cmp_priority(&self, other: &Self) -> Ordering {
        let (a, b) = (self.0, other.0);
        a.weight
            .total_cmp(&b.weight)
            .then_with(|| b.deadline.cmp(&a.deadline))
            .then_with(|| b.flow_id.cmp(&a.flow_id))
            .then_with(|| b.instance.cmp(&a.instance))
    }
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_priority(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_priority(other)
    }
}

/// Greedy weighted packer for optional jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalPacker {
    inter_frame_gap: u64,
    /// Queue every optional frame is sent from; `None` keeps the flow's queue.
    reserved_queue: Option<u8>,
}

impl OptionalPacker {
    pub fn new(inter_frame_gap: u64, reserved_queue: Option<u8>) -> Self {
        Self {
            inter_frame_gap,
            reserved_queue,
        }
    }

    /// Pack the optional jobs of `jobs` (mandatory ones are ignored) into
    /// `slacks`, which must be in time order.
    pub fn pack(&self, jobs: &[Job], slacks: &[SlackInterval]) -> PackingOutcome {
        let mut optional: Vec<&Job> = jobs.iter().filter(|j| !j.is_mandatory()).collect();
        optional.sort_by(|a, b| {
            a.release
                .cmp(&b.release)
                .then_with(|| Candidate(*b).cmp(&Candidate(*a)))
        });

        let total = optional.len();
        let mut pending = optional.into_iter().peekable();
        let mut ready: BinaryHeap<Candidate<'_>> = BinaryHeap::new();
        let mut deferred: Vec<Candidate<'_>> = Vec::new();
        let mut outcome = PackingOutcome::default();

        for slack in slacks {
            let mut cursor = slack.earliest_start;

            loop {
                while let Some(job) = pending.next_if(|j| j.release <= cursor) {
                    ready.push(Candidate(job));
                }

                let Some(Candidate(job)) = ready.pop() else {
                    // Nothing released yet: idle until the next release if
                    // it still lands inside this slack.
                    match pending.peek() {
                        Some(next) if next.release < slack.latest_finish => {
                            cursor = next.release;
                            continue;
                        }
                        _ => break,
                    }
                };

                let finish = cursor + job.execution;
                if finish > job.deadline {
                    debug!(flow = %job.flow_id, instance = job.instance, "✗ optional deadline passed");
                    outcome
                        .dropped
                        .push(DroppedJob::from_job(job, DropReason::DeadlinePassed));
                } else if finish > slack.latest_finish {
                    deferred.push(Candidate(job));
                } else {
                    let queue = self.reserved_queue.unwrap_or(job.queue);
                    debug!(
                        flow     = %job.flow_id,
                        instance = job.instance,
                        queue,
                        start    = cursor,
                        finish,
                        "✓ optional admitted"
                    );
                    outcome.admitted.push(ScheduleEntry::place(job, cursor, queue));
                    cursor = finish + self.inter_frame_gap;
                }
            }

            ready.extend(deferred.drain(..));
        }

        outcome.dropped.extend(
            ready
                .into_iter()
                .map(|c| c.0)
                .chain(pending)
                .map(|job| DroppedJob::from_job(job, DropReason::NoFittingSlack)),
        );
        outcome.dropped.sort_by(|a, b| {
            a.flow_id
                .cmp(&b.flow_id)
                .then_with(|| a.instance.cmp(&b.instance))
        });

        info!(
            optional = total,
            admitted = outcome.admitted.len(),
            dropped = outcome.dropped.len(),
            admitted_weight = outcome.admitted_weight(),
            "Optional packing complete"
        );
        outcome
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::JobLabel;

    // ── Test helpers ──────────────────────────────────────────────────────────

    fn mandatory_entry(flow: &str, start: u64, finish: u64) -> ScheduleEntry {
        ScheduleEntry {
            flow_id: flow.into(),
            instance: 0,
            label: JobLabel::Mandatory,
            queue: 1,
            release: 0,
            deadline: finish,
            start,
            finish,
            weight: 1.0,
        }
    }

    fn optional_job(flow: &str, instance: u64, release: u64, deadline: u64, execution: u64) -> Job {
        Job {
            flow_id: flow.into(),
            instance,
            release,
            deadline,
            execution,
            queue: 2,
            weight: 1.0,
            label: JobLabel::Optional,
        }
    }

    fn params(hyperperiod: u64, gap: u64, guard: u64) -> SlackParams {
        SlackParams {
            hyperperiod,
            inter_frame_gap: gap,
            guard_band: guard,
            guard_after_mandatory: false,
        }
    }

    // ── find_slack ────────────────────────────────────────────────────────────

    #[test]
    fn empty_link_is_one_slack() {
        let slacks = find_slack(&[], &params(1_000, 0, 100));
        assert_eq!(slacks.len(), 1);
        assert_eq!((slacks[0].start, slacks[0].end), (0, 1_000));
        assert!(!slacks[0].precedes_mandatory);
        assert_eq!(slacks[0].latest_finish, 1_000);
    }

    #[test]
    fn slack_around_and_between_mandatory_frames() {
        let m = vec![mandatory_entry("a", 100, 200), mandatory_entry("b", 500, 600)];
        let slacks = find_slack(&m, &params(1_000, 0, 50));

        let spans: Vec<(u64, u64)> = slacks.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 100), (200, 500), (600, 1_000)]);

        let limits: Vec<u64> = slacks.iter().map(|s| s.latest_finish).collect();
        // leading/inner: next start − G; trailing: min(H, H + 100 − G)
        assert_eq!(limits, vec![50, 450, 1_000]);
    }

    #[test]
    fn trailing_slack_guards_the_next_cycle() {
        let m = vec![mandatory_entry("a", 0, 100)];
        let slacks = find_slack(&m, &params(1_000, 0, 50));
        assert_eq!(slacks.len(), 1);
        assert_eq!(slacks[0].latest_finish, 950);
    }

    #[test]
    fn busy_spill_past_h_shrinks_leading_slack() {
        let m = vec![mandatory_entry("a", 300, 400), mandatory_entry("b", 900, 1_000)];
        let slacks = find_slack(&m, &params(1_000, 20, 0));
        assert_eq!((slacks[0].start, slacks[0].end), (20, 300));
        assert_eq!(slacks[0].latest_finish, 280);
        assert_eq!((slacks[1].start, slacks[1].end), (420, 900));
        assert_eq!(slacks.len(), 2);
    }

    #[test]
    fn guard_after_mandatory_moves_earliest_start() {
        let m = vec![mandatory_entry("a", 0, 100), mandatory_entry("b", 500, 600)];
        let p = SlackParams {
            guard_after_mandatory: true,
            ..params(1_000, 0, 30)
        };
        let slacks = find_slack(&m, &p);
        assert_eq!(slacks[0].earliest_start, 130);
        assert_eq!(slacks[0].latest_finish, 470);
    }

    // ── OptionalPacker ────────────────────────────────────────────────────────

    #[test]
    fn higher_weight_wins_a_contested_slack() {
        let m = vec![mandatory_entry("m", 100, 200)];
        let slacks = find_slack(&m, &params(200, 0, 0));
        let heavy = Job {
            weight: 5.0,
            ..optional_job("heavy", 0, 0, 200, 80)
        };
        let jobs = vec![optional_job("light", 0, 0, 200, 80), heavy];

        let outcome = OptionalPacker::new(0, None).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted.len(), 1);
        assert_eq!(outcome.admitted[0].flow_id, "heavy");
        assert_eq!(outcome.dropped.len(), 1);
        assert_eq!(outcome.dropped[0].flow_id, "light");
        assert_eq!(outcome.dropped[0].reason, DropReason::NoFittingSlack);
    }

    #[test]
    fn equal_weight_prefers_earlier_deadline() {
        let slacks = find_slack(&[], &params(1_000, 0, 0));
        let jobs = vec![
            optional_job("late", 0, 0, 1_000, 100),
            optional_job("soon", 0, 0, 500, 100),
        ];
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted[0].flow_id, "soon");
        assert_eq!(outcome.admitted[0].start, 0);
        assert_eq!(outcome.admitted[1].start, 100);
    }

    #[test]
    fn guard_band_rejects_a_tight_fit() {
        // 300 µs of slack before the mandatory frame, 250 µs job, 100 µs guard
        let m = vec![mandatory_entry("m", 300, 400)];
        let jobs = vec![optional_job("o", 0, 0, 300, 250)];

        let tight = find_slack(&m, &params(400, 0, 100));
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &tight);
        assert!(outcome.admitted.is_empty());
        assert_eq!(outcome.dropped.len(), 1);

        let loose = find_slack(&m, &params(400, 0, 0));
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &loose);
        assert_eq!(outcome.admitted.len(), 1);
    }

    #[test]
    fn job_too_big_for_one_slack_uses_a_later_one() {
        let m = vec![mandatory_entry("a", 50, 100), mandatory_entry("b", 400, 500)];
        let slacks = find_slack(&m, &params(500, 0, 0));
        let jobs = vec![optional_job("o", 0, 0, 500, 200)];
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted.len(), 1);
        assert_eq!(outcome.admitted[0].start, 100);
    }

    #[test]
    fn cursor_waits_for_a_release_inside_the_slack() {
        let slacks = find_slack(&[], &params(1_000, 0, 0));
        let jobs = vec![optional_job("o", 0, 600, 1_000, 100)];
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted[0].start, 600);
    }

    #[test]
    fn unreleased_job_never_starts_early() {
        let m = vec![mandatory_entry("m", 0, 100)];
        let slacks = find_slack(&m, &params(1_000, 0, 0));
        let jobs = vec![optional_job("o", 0, 150, 1_000, 10)];
        let outcome = OptionalPacker::new(0, None).pack(&jobs, &slacks);
        assert!(outcome.admitted[0].start >= 150);
    }

    #[test]
    fn reserved_queue_overrides_the_flow_queue() {
        let slacks = find_slack(&[], &params(1_000, 0, 0));
        let jobs = vec![optional_job("o", 0, 0, 1_000, 100)];
        let outcome = OptionalPacker::new(0, Some(7)).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted[0].queue, 7);
    }

    #[test]
    fn inter_frame_gap_separates_optional_frames() {
        let slacks = find_slack(&[], &params(1_000, 96, 0));
        let jobs = vec![
            optional_job("a", 0, 0, 1_000, 100),
            optional_job("b", 0, 0, 1_000, 100),
        ];
        let outcome = OptionalPacker::new(96, None).pack(&jobs, &slacks);
        assert_eq!(outcome.admitted[1].start, 196);
    }

    #[test]
    fn mandatory_jobs_are_not_packed() {
        let slacks = find_slack(&[], &params(1_000, 0, 0));
        let mut m = optional_job("m", 0, 0, 1_000, 100);
        m.label = JobLabel::Mandatory;
        let outcome = OptionalPacker::new(0, None).pack(&[m], &slacks);
        assert!(outcome.admitted.is_empty());
        assert!(outcome.dropped.is_empty());
    }

    #[test]
    fn outcome_weights_are_summed() {
        let slacks = find_slack(&[], &params(150, 0, 0));
        let mut a = optional_job("a", 0, 0, 150, 100);
        a.weight = 2.5;
        let b = optional_job("b", 0, 0, 150, 100);
        let outcome = OptionalPacker::new(0, None).pack(&[a, b], &slacks);
        assert!((outcome.admitted_weight() - 2.5).abs() < 1e-12);
        assert!((outcome.dropped_weight() - 1.0).abs() < 1e-12);
    }
}
