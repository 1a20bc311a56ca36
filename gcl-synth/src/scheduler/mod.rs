//! Mandatory scheduler (EDF core).
//!
//! [`MandatoryScheduler`] places every mandatory job on the shared egress
//! link.  Queues are only a gate-selection detail here: the wire carries one
//! frame at a time, so all queues share a single non-preemptive timeline.
//!
//! # Policies
//!
//! | Policy | Order | Idle handling |
//! |---|---|---|
//! | [`MandatoryPolicy::DeadlineOrdered`] (default) | all mandatory jobs sorted by EDF key once | cursor jumps to each job's release |
//! | [`MandatoryPolicy::WorkConserving`] | EDF key among jobs already released at the cursor | cursor jumps to the next release only when nothing is ready |
//!
//! The EDF key is `(absolute deadline, release, flow id, instance)`, so ties
//! are always broken the same way and repeated runs are bit-identical.
//!
//! Both policies thread an explicit [`Timeline`] value through the loop; no
//! state outlives a call, which keeps `MandatoryScheduler` `Send + Sync`.
//!
//! # Failure
//! The first job whose finish exceeds its deadline aborts the run with
//! [`InfeasibleSchedule`]; no partial schedule is returned.

pub mod error;
pub mod feasibility;

pub use error::{ConfigError, InfeasibleSchedule, SynthesisError};

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::flow::Job;
use crate::schedule::ScheduleEntry;

// ── Policy ────────────────────────────────────────────────────────────────────

/// How mandatory jobs are ordered on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MandatoryPolicy {
    /// Global EDF order with a monotone cursor.
    #[default]
    DeadlineOrdered,
    /// Event-driven non-preemptive EDF.
    WorkConserving,
}

impl MandatoryPolicy {
    /// Parse a policy name as written in the configuration file or on the
    /// command line.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "deadline_ordered" => Ok(MandatoryPolicy::DeadlineOrdered),
            "work_conserving" => Ok(MandatoryPolicy::WorkConserving),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for MandatoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MandatoryPolicy::DeadlineOrdered => f.write_str("deadline_ordered"),
            MandatoryPolicy::WorkConserving => f.write_str("work_conserving"),
        }
    }
}

// ── Timeline ──────────────────────────────────────────────────────────────────

/// The shared link cursor: the earliest instant the next frame may start.
///
/// Every placement moves the cursor to `finish + gap`; it never moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    cursor: u64,
    gap: u64,
}

impl Timeline {
    pub fn new(gap: u64) -> Self {
        Self::starting_at(0, gap)
    }

    /// A timeline whose first frame may not start before `cursor`.
    pub fn starting_at(cursor: u64, gap: u64) -> Self {
        Self { cursor, gap }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Place `job` at `max(release, cursor)` and return `(start, finish)`.
    pub fn place(&mut self, job: &Job) -> (u64, u64) {
        let start = job.release.max(self.cursor);
        let finish = start + job.execution;
        self.cursor = finish + self.gap;
        (start, finish)
    }

    /// Let the link idle until `t` (no-op if the cursor is already past it).
    pub fn idle_until(&mut self, t: u64) {
        self.cursor = self.cursor.max(t);
    }
}

// ── EDF ordering ──────────────────────────────────────────────────────────────

fn edf_key(job: &Job) -> (u64, u64, &str, u64) {
    (job.deadline, job.release, job.flow_id.as_str(), job.instance)
}

/// Heap item for the work-conserving policy, ordered by [`edf_key`].
struct Ready<'a>(&'a Job);

impl PartialEq for Ready<'_> {
    fn eq(&self, other: &Self) -> bool {
        edf_key(self.0) == edf_key(other.0)
    }
}

impl Eq for Ready<'_> {}

impl PartialOrd for Ready<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ready<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        edf_key(self.0).cmp(&edf_key(other.0))
    }
}

// ── MandatoryScheduler ────────────────────────────────────────────────────────

/// EDF scheduler for mandatory jobs on one shaped egress link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MandatoryScheduler {
    policy: MandatoryPolicy,
    inter_frame_gap: u64,
}

impl MandatoryScheduler {
    pub fn new(policy: MandatoryPolicy, inter_frame_gap: u64) -> Self {
        Self {
            policy,
            inter_frame_gap,
        }
    }

    pub fn policy(&self) -> MandatoryPolicy {
        self.policy
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Schedule every mandatory job in `jobs` (optional jobs are ignored).
    ///
    /// Returns the entries in link order (non-decreasing start).
    ///
    /// # Errors
    /// [`InfeasibleSchedule`] for the first job, in placement order, whose
    /// finish exceeds its deadline.
    pub fn schedule(&self, jobs: &[Job]) -> Result<Vec<ScheduleEntry>, InfeasibleSchedule> {
        let mandatory: Vec<&Job> = jobs.iter().filter(|j| j.is_mandatory()).collect();

        info!(
            policy = %self.policy,
            mandatory = mandatory.len(),
            inter_frame_gap = self.inter_frame_gap,
            "=== MandatoryScheduler::schedule() ==="
        );

        let entries = self.run(mandatory, 0)?;

        info!(
            scheduled = entries.len(),
            busy_until = entries.last().map(|e| e.finish).unwrap_or(0),
            "=== Mandatory scheduling complete ==="
        );
        Ok(entries)
    }

    /// Like [`schedule`](Self::schedule), but for a list replayed every
    /// `hyperperiod`: the last frame plus the inter-frame gap must also end
    /// before the first frame of the next cycle.
    ///
    /// When the gap after the last frame spills past `H` into the first
    /// frame, the run is repeated with the timeline starting at the spill.
    /// The spill never exceeds the gap (mandatory frames finish by `H`), so
    /// this settles after a bounded number of passes.
    ///
    /// # Errors
    /// [`InfeasibleSchedule`] when a job misses its deadline in any pass.
    pub fn schedule_cyclic(
        &self,
        jobs: &[Job],
        hyperperiod: u64,
    ) -> Result<Vec<ScheduleEntry>, InfeasibleSchedule> {
        let mandatory: Vec<&Job> = jobs.iter().filter(|j| j.is_mandatory()).collect();

        info!(
            policy = %self.policy,
            mandatory = mandatory.len(),
            inter_frame_gap = self.inter_frame_gap,
            hyperperiod,
            "=== MandatoryScheduler::schedule_cyclic() ==="
        );

        let mut seed = 0;
        loop {
            let entries = self.run(mandatory.clone(), seed)?;
            // The first frame starts at or after `seed`, so a new spill is
            // always strictly larger than the previous one.
            let spill = match (entries.first(), entries.last()) {
                (Some(first), Some(last)) => Some(
                    (last.finish + self.inter_frame_gap).saturating_sub(hyperperiod),
                )
                .filter(|spill| *spill > first.start),
                _ => None,
            };

            let Some(spill) = spill else {
                info!(
                    scheduled = entries.len(),
                    start_offset = seed,
                    "=== Mandatory scheduling complete ==="
                );
                return Ok(entries);
            };
            debug!(spill, previous = seed, "gap spills into the next cycle, rescheduling");
            seed = spill;
        }
    }

    fn run(&self, mandatory: Vec<&Job>, seed: u64) -> Result<Vec<ScheduleEntry>, InfeasibleSchedule> {
        let timeline = Timeline::starting_at(seed, self.inter_frame_gap);
        match self.policy {
            MandatoryPolicy::DeadlineOrdered => Self::schedule_deadline_ordered(mandatory, timeline),
            MandatoryPolicy::WorkConserving => Self::schedule_work_conserving(mandatory, timeline),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Policy 1: deadline_ordered
    // ─────────────────────────────────────────────────────────────────────────

    fn schedule_deadline_ordered(
        mut mandatory: Vec<&Job>,
        mut timeline: Timeline,
    ) -> Result<Vec<ScheduleEntry>, InfeasibleSchedule> {
        mandatory.sort_by(|a, b| edf_key(a).cmp(&edf_key(b)));

        let mut entries = Vec::with_capacity(mandatory.len());
        for job in mandatory {
            entries.push(Self::commit(job, &mut timeline)?);
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Policy 2: work_conserving
    // ─────────────────────────────────────────────────────────────────────────

    fn schedule_work_conserving(
        mut mandatory: Vec<&Job>,
        mut timeline: Timeline,
    ) -> Result<Vec<ScheduleEntry>, InfeasibleSchedule> {
        mandatory.sort_by(|a, b| {
            a.release
                .cmp(&b.release)
                .then_with(|| edf_key(a).cmp(&edf_key(b)))
        });

        let mut ready: BinaryHeap<Reverse<Ready<'_>>> = BinaryHeap::new();
        let mut entries = Vec::with_capacity(mandatory.len());
        let mut pending = mandatory.into_iter().peekable();

        loop {
            while let Some(job) = pending.next_if(|j| j.release <= timeline.cursor()) {
                ready.push(Reverse(Ready(job)));
            }

            match ready.pop() {
                Some(Reverse(Ready(job))) => {
                    entries.push(Self::commit(job, &mut timeline)?);
                }
                None => match pending.peek() {
                    Some(next) => timeline.idle_until(next.release),
                    None => break,
                },
            }
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Place `job` on `timeline` and check its deadline.
    fn commit(job: &Job, timeline: &mut Timeline) -> Result<ScheduleEntry, InfeasibleSchedule> {
        let (start, finish) = timeline.place(job);

        if finish > job.deadline {
            warn!(
                flow     = %job.flow_id,
                instance = job.instance,
                start,
                finish,
                deadline = job.deadline,
                overrun  = finish - job.deadline,
                "✗ mandatory deadline miss, flow set is infeasible"
            );
            return Err(InfeasibleSchedule {
                flow: job.flow_id.clone(),
                instance: job.instance,
                release: job.release,
                deadline: job.deadline,
                finish,
                overrun: finish - job.deadline,
            });
        }

        debug!(
            flow     = %job.flow_id,
            instance = job.instance,
            queue    = job.queue,
            start,
            finish,
            "✓ scheduled"
        );
        Ok(ScheduleEntry::place(job, start, job.queue))
    }
}

impl Default for MandatoryScheduler {
    fn default() -> Self {
        Self::new(MandatoryPolicy::default(), 0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
