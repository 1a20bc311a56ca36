/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Link-load analysis run ahead of the EDF pass.
//!
//! # Status: advisory
//!
//! The figures are **computed and logged** before every run and copied into
//! the admission report.  They never reject a flow set on their own; the EDF
//! pass over the unrolled jobs is the authoritative test.
//!
//! # Theory
//! A flow with `(w, h)` transmits at least `h` of every `w` instances, so the
//! long-run link share it *must* get is
//!
//! $$U_m = \sum_i \frac{h_i}{w_i} \cdot \frac{C_i + g}{P_i}$$
//!
//! where `g` is the inter-frame gap.  `U_m > 1` means the mandatory jobs alone
//! overload the link and EDF will certainly fail; `U_m ≤ 1` is necessary but
//! not sufficient (release offsets and non-preemption still matter).
//!
//! The offered load (every instance, `h = w`) bounds how much optional traffic
//! could ever fit: `1 − U_m` is the best case for the slack packer.

use serde::Serialize;

use crate::flow::Flow;

/// Utilisation figures for one flow set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkLoad {
    /// Share of the link the mandatory jobs need (`U_m`).
    pub mandatory: f64,

    /// Share of the link if every instance were transmitted.
    pub offered: f64,
}

impl LinkLoad {
    /// `true` when the mandatory share alone exceeds the link capacity.
    pub fn mandatory_overloaded(&self) -> bool {
        self.mandatory > 1.0
    }

    /// Best-case share of the link left for optional jobs.
    pub fn optional_headroom(&self) -> f64 {
        (1.0 - self.mandatory).max(0.0)
    }
}

/// Compute [`LinkLoad`] for `flows` with inter-frame gap `gap`.
///
/// Flows with `period == 0` contribute nothing.
pub fn link_load(flows: &[Flow], gap: u64) -> LinkLoad {
    let mut load = LinkLoad {
        mandatory: 0.0,
        offered: 0.0,
    };
    for f in flows.iter().filter(|f| f.period > 0) {
        let share = (f.execution + gap) as f64 / f.period as f64;
        load.offered += share;
        load.mandatory += f.mandatory_ratio() * share;
    }
    load
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flow_set_has_zero_load() {
        let load = link_load(&[], 0);
        assert_eq!(load.mandatory, 0.0);
        assert_eq!(load.offered, 0.0);
        assert!(!load.mandatory_overloaded());
    }

    #[test]
    fn weakly_hard_ratio_scales_the_mandatory_share() {
        // C/P = 0.4 for both; (2,1) halves the first one's mandatory share
        let flows = vec![
            Flow::new("a", 10_000, 10_000, 4_000, (2, 1), 0),
            Flow::new("b", 10_000, 10_000, 4_000, (1, 1), 0),
        ];
        let load = link_load(&flows, 0);
        assert!((load.offered - 0.8).abs() < 1e-9);
        assert!((load.mandatory - 0.6).abs() < 1e-9);
        assert!((load.optional_headroom() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn inter_frame_gap_is_charged_per_instance() {
        let flows = vec![Flow::new("a", 1_000, 1_000, 400, (1, 1), 0)];
        let load = link_load(&flows, 100);
        assert!((load.mandatory - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overloaded_mandatory_set_is_flagged() {
        let flows = vec![
            Flow::new("a", 10_000, 10_000, 4_000, (1, 1), 0),
            Flow::new("b", 10_000, 10_000, 4_000, (1, 1), 0),
            Flow::new("c", 10_000, 10_000, 4_000, (1, 1), 0),
        ];
        let load = link_load(&flows, 0);
        assert!(load.mandatory_overloaded());
        assert_eq!(load.optional_headroom(), 0.0);
    }
}
