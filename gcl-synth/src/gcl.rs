/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Gate Control List emitter.
//!
//! Turns the merged link schedule into the cyclic gate timetable the
//! Time-Aware Shaper replays every hyperperiod.  Bit `q` of a gate mask set
//! means queue `q` may transmit.
//!
//! Two views of the same list are produced:
//!
//! * [`GateControlList::events`]: `(time, mask)` transitions, strictly
//!   increasing in time, first one at `0`, never two equal masks in a row;
//! * [`GateControlList::admin_entries`]: `(mask, interval)` pairs in the
//!   802.1Qbv admin-list shape, whose intervals sum to the cycle time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::flow::QUEUE_COUNT;
use crate::schedule::Schedule;

/// Gate-open bitmask over the eight queues.
pub type GateMask = u8;

/// Bit for queue `q`.
pub fn queue_bit(queue: u8) -> GateMask {
    1u8 << (queue % QUEUE_COUNT)
}

/// How the gates behave outside and inside scheduled transmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Only the transmitting queue is open during an entry.
    pub exclusive: bool,
    /// Gates open while no entry is transmitting (e.g. best-effort queues).
    pub idle_mask: GateMask,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            exclusive: true,
            idle_mask: 0x00,
        }
    }
}

impl GateConfig {
    /// Mask in effect while `queue` transmits.
    pub fn open_mask(&self, queue: u8) -> GateMask {
        if self.exclusive {
            queue_bit(queue)
        } else {
            self.idle_mask | queue_bit(queue)
        }
    }
}

/// One gate transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateEvent {
    /// Offset from the start of the cycle.
    pub time: u64,
    pub gate_mask: GateMask,
}

/// One admin-list row: hold `gate_mask` for `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminEntry {
    pub gate_mask: GateMask,
    pub interval: u64,
}

/// A cyclic gate timetable for one hyperperiod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateControlList {
    pub cycle_time: u64,
    pub events: Vec<GateEvent>,
}

impl GateControlList {
    /// Build the list for `schedule` over a cycle of `cycle_time`.
    ///
    /// `schedule` must be sorted by start and non-overlapping.
    pub fn emit(schedule: &Schedule, cycle_time: u64, config: &GateConfig) -> Self {
        let mut raw: Vec<(u64, GateMask)> = Vec::with_capacity(2 * schedule.len() + 1);
        raw.push((0, config.idle_mask));
        for entry in &schedule.entries {
            raw.push((entry.start, config.open_mask(entry.queue)));
            raw.push((entry.finish, config.idle_mask));
        }

        let mut events: Vec<GateEvent> = Vec::with_capacity(raw.len());
        for (time, gate_mask) in raw.into_iter().filter(|(t, _)| *t < cycle_time) {
            // A later transition at the same instant supersedes the earlier one
            // (back-to-back frames never pass through the idle state).
            match events.last_mut() {
                Some(last) if last.time == time => last.gate_mask = gate_mask,
                _ => events.push(GateEvent { time, gate_mask }),
            }
        }
        events.dedup_by_key(|e| e.gate_mask);

        info!(
            cycle_time,
            entries = schedule.len(),
            events = events.len(),
            exclusive = config.exclusive,
            idle_mask = format_args!("{:#04x}", config.idle_mask),
            "GCL emitted"
        );
        for e in &events {
            debug!(time = e.time, gate_mask = format_args!("{:08b}", e.gate_mask), "  gate event");
        }

        Self { cycle_time, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The admin-list view: each event's mask held until the next event (the
    /// last one until the end of the cycle).
    pub fn admin_entries(&self) -> Vec<AdminEntry> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let until = self
                    .events
                    .get(i + 1)
                    .map(|n| n.time)
                    .unwrap_or(self.cycle_time);
                AdminEntry {
                    gate_mask: e.gate_mask,
                    interval: until - e.time,
                }
            })
            .collect()
    }

    /// Gate mask in effect at `t` (taken modulo the cycle time).
    pub fn state_at(&self, t: u64) -> GateMask {
        if self.cycle_time == 0 || self.events.is_empty() {
            return 0;
        }
        let t = t % self.cycle_time;
        let idx = self.events.partition_point(|e| e.time <= t);
        self.events[idx.saturating_sub(1)].gate_mask
    }

    /// Total open time of every queue over one cycle.
    pub fn open_time_per_queue(&self) -> [u64; QUEUE_COUNT as usize] {
        let mut open = [0u64; QUEUE_COUNT as usize];
        for row in self.admin_entries() {
            for (q, total) in open.iter_mut().enumerate() {
                if row.gate_mask & (1 << q) != 0 {
                    *total += row.interval;
                }
            }
        }
        open
    }

    /// Check the list against the schedule it was built from.
    ///
    /// Returns `true` when the events are well formed and every entry's queue
    /// is open for its whole `[start, finish)` span (and, with exclusive gates,
    /// no other queue is).
    pub fn is_consistent_with(&self, schedule: &Schedule, config: &GateConfig) -> bool {
        let well_formed = self.events.first().map(|e| e.time == 0).unwrap_or(false)
            && self
                .events
                .windows(2)
                .all(|w| w[0].time < w[1].time && w[0].gate_mask != w[1].gate_mask)
            && self.events.iter().all(|e| e.time < self.cycle_time);
        if !well_formed {
            return false;
        }

        schedule.entries.iter().all(|entry| {
            let expected = config.open_mask(entry.queue);
            let changes_inside = self
                .events
                .iter()
                .any(|e| e.time > entry.start && e.time < entry.finish);
            self.state_at(entry.start) == expected && !changes_inside
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
