/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Weakly-hard classifier.
//!
//! Labels each job instance of a flow with `(w, h)` as mandatory or optional
//! using an evenly spaced (Bresenham) distribution over the instance index:
//!
//! ```text
//! r = i mod w
//! mandatory(i)  ⇔  ⌊(r + 1)·h / w⌋ > ⌊r·h / w⌋
//! ```
//!
//! The pattern has period `w` and exactly `h` marks per period, so **every**
//! window of `w` consecutive instances (aligned or not) holds exactly `h`
//! mandatory instances.  Meeting all mandatory deadlines therefore satisfies
//! the `(w, h)` constraint whatever happens to the optional ones.

use tracing::debug;

use crate::flow::{Flow, Job, JobLabel};
use crate::scheduler::ConfigError;

/// Label of instance `index` for a flow with window `w` and quota `h`.
///
/// # Errors
/// [`ConfigError::InvalidWeaklyHard`] when `w == 0`, `h == 0` or `h > w`
/// (reported with an empty flow name; [`classify_flow`] fills it in).
pub fn label_for(index: u64, w: u32, h: u32) -> Result<JobLabel, ConfigError> {
    if w == 0 || h == 0 || h > w {
        return Err(ConfigError::InvalidWeaklyHard {
            flow: String::new(),
            w,
            h,
        });
    }
    let (w, h) = (u64::from(w), u64::from(h));
    let r = index % w;
    if (r + 1) * h / w > r * h / w {
        Ok(JobLabel::Mandatory)
    } else {
        Ok(JobLabel::Optional)
    }
}

/// Label every job of `flow` in place.
///
/// The label depends only on `job.instance`, so the order of the slice does
/// not matter.  Labels are computed per job; `w` may be far larger than the
/// number of instances in a cycle.
pub fn classify_flow(flow: &Flow, jobs: &mut [Job]) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidWeaklyHard {
        flow: flow.id.clone(),
        w: flow.w,
        h: flow.h,
    };
    label_for(0, flow.w, flow.h).map_err(|_| invalid())?;

    for job in jobs.iter_mut() {
        job.label = label_for(job.instance, flow.w, flow.h).map_err(|_| invalid())?;
    }

    debug!(
        flow = %flow.id,
        w = flow.w,
        h = flow.h,
        mandatory = jobs.iter().filter(|j| j.is_mandatory()).count(),
        total = jobs.len(),
        "classified"
    );
    Ok(())
}

/// Smallest number of mandatory labels found in any window of `w`
/// consecutive entries of `labels`.
///
/// Returns `None` when `w == 0` or the sequence is shorter than one window.
pub fn min_mandatory_in_windows(labels: &[JobLabel], w: usize) -> Option<usize> {
    if w == 0 || labels.len() < w {
        return None;
    }

    let is_m = |l: &JobLabel| usize::from(*l == JobLabel::Mandatory);
    let mut count: usize = labels[..w].iter().map(is_m).sum();
    let mut min = count;
    for end in w..labels.len() {
        count = count + is_m(&labels[end]) - is_m(&labels[end - w]);
        min = min.min(count);
    }
    Some(min)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
