/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedule entries and the merged link timeline.
//!
//! A [`ScheduleEntry`] pins one job to `[start, finish)` on the shared link
//! and names the queue it is transmitted from.  The `(flow, instance, queue)`
//! triple is unique across a schedule, so a capture of the replayed traffic
//! can always be attributed back to a single job.

use serde::Serialize;

use crate::flow::{Job, JobLabel};

/// One job placed on the link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleEntry {
    pub flow_id: String,
    pub instance: u64,
    pub label: JobLabel,

    /// Queue the frame is transmitted from (the flow's queue, or the reserved
    /// optional queue).
    pub queue: u8,

    pub release: u64,
    pub deadline: u64,
    pub start: u64,
    pub finish: u64,
    pub weight: f64,
}

impl ScheduleEntry {
    /// Place `job` at `start` on `queue`.
    pub fn place(job: &Job, start: u64, queue: u8) -> Self {
        Self {
            flow_id: job.flow_id.clone(),
            instance: job.instance,
            label: job.label,
            queue,
            release: job.release,
            deadline: job.deadline,
            start,
            finish: start + job.execution,
            weight: job.weight,
        }
    }

    /// Finish minus release.
    pub fn response_time(&self) -> u64 {
        self.finish - self.release
    }

    pub fn is_mandatory(&self) -> bool {
        self.label == JobLabel::Mandatory
    }

    /// Slack left before the deadline.
    pub fn laxity(&self) -> u64 {
        self.deadline.saturating_sub(self.finish)
    }
}

/// A structural problem found by [`Schedule::violations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleViolation {
    /// Two entries share link time (gap included).
    Overlap { first: String, second: String },
    /// An entry starts before its release.
    EarlyStart { job: String },
    /// An entry finishes after its deadline.
    DeadlineMiss { job: String, overrun: u64 },
    /// An optional entry ends too close to the mandatory entry after it.
    GuardBand { optional: String, mandatory: String },
}

/// The merged link timeline, sorted by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Merge mandatory and optional entries into one start-ordered timeline.
    pub fn merge(mandatory: Vec<ScheduleEntry>, optional: Vec<ScheduleEntry>) -> Self {
        let mut entries = mandatory;
        entries.extend(optional);
        entries.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.flow_id.cmp(&b.flow_id))
                .then_with(|| a.instance.cmp(&b.instance))
        });
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mandatory(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(|e| e.is_mandatory())
    }

    pub fn optional(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(|e| !e.is_mandatory())
    }

    /// Total time the link is transmitting.
    pub fn busy_time(&self) -> u64 {
        self.entries.iter().map(|e| e.finish - e.start).sum()
    }

    /// Check every link invariant over one cycle of length `hyperperiod`:
    ///
    /// * consecutive entries are separated by at least `gap`;
    /// * `start ≥ release` and `finish ≤ deadline`;
    /// * an optional entry directly followed by a mandatory one leaves
    ///   `gap + guard_band` before it.
    ///
    /// The list is replayed cyclically, so the last entry is also checked
    /// against the first one shifted by `hyperperiod`.
    ///
    /// An empty result means the schedule is well formed.
    pub fn violations(&self, hyperperiod: u64, gap: u64, guard_band: u64) -> Vec<ScheduleViolation> {
        let key = |e: &ScheduleEntry| format!("{}#{}", e.flow_id, e.instance);
        let mut found = Vec::new();

        for e in &self.entries {
            if e.start < e.release {
                found.push(ScheduleViolation::EarlyStart { job: key(e) });
            }
            if e.finish > e.deadline {
                found.push(ScheduleViolation::DeadlineMiss {
                    job: key(e),
                    overrun: e.finish - e.deadline,
                });
            }
        }

        let mut check_pair = |a: &ScheduleEntry, b: &ScheduleEntry, b_start: u64| {
            if a.finish + gap > b_start {
                found.push(ScheduleViolation::Overlap {
                    first: key(a),
                    second: key(b),
                });
            } else if !a.is_mandatory() && b.is_mandatory() && a.finish + gap + guard_band > b_start {
                found.push(ScheduleViolation::GuardBand {
                    optional: key(a),
                    mandatory: key(b),
                });
            }
        };

        for pair in self.entries.windows(2) {
            check_pair(&pair[0], &pair[1], pair[1].start);
        }
        if let (Some(first), Some(last)) = (self.entries.first(), self.entries.last()) {
            check_pair(last, first, hyperperiod + first.start);
        }

        found
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
