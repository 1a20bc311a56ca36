/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Flow table and shaper configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! flows:
//!   - id: brake_cmd
//!     period: 400000      # ns
//!     deadline: 400000    # optional, defaults to the period
//!     execution: 6000     # transmission time on the link
//!     w: 2                # optional, defaults to 1
//!     h: 1                # optional, defaults to 1
//!     queue: 0            # optional, defaults to 0
//! weights:                # optional, default weight is 1.0
//!   brake_cmd: 2.5
//! shaper:                 # optional, every field has a default
//!   guard_band: 12000
//!   inter_frame_gap: 0
//!   exclusive_gates: true
//!   idle_gate_mask: 0
//!   optional_queue: 7
//!   max_hyperperiod: 3600000000000
//!   mandatory_policy: deadline_ordered
//!   window_aligned_hyperperiod: false
//!   guard_after_mandatory: false
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::flow::{Flow, DEFAULT_WEIGHT};
use crate::gcl::GateConfig;
use crate::hyperperiod::DEFAULT_MAX_HYPERPERIOD;
use crate::pipeline::{SynthesisConfig, DEFAULT_GUARD_BAND};
use crate::scheduler::{ConfigError, MandatoryPolicy};

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlowConfigFile {
    #[serde(default)]
    flows: Vec<FlowEntry>,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
    #[serde(default)]
    shaper: ShaperSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FlowEntry {
    id: String,
    period: u64,
    deadline: Option<u64>,
    execution: u64,
    #[serde(default = "default_window")]
    w: u32,
    #[serde(default = "default_window")]
    h: u32,
    #[serde(default)]
    queue: u8,
}

/// `(1, 1)`: every instance is mandatory.
fn default_window() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ShaperSection {
    guard_band: u64,
    inter_frame_gap: u64,
    exclusive_gates: bool,
    idle_gate_mask: u8,
    optional_queue: Option<u8>,
    max_hyperperiod: u64,
    mandatory_policy: Option<String>,
    window_aligned_hyperperiod: bool,
    guard_after_mandatory: bool,
}

impl Default for ShaperSection {
    fn default() -> Self {
        let gates = GateConfig::default();
        Self {
            guard_band: DEFAULT_GUARD_BAND,
            inter_frame_gap: 0,
            exclusive_gates: gates.exclusive,
            idle_gate_mask: gates.idle_mask,
            optional_queue: None,
            max_hyperperiod: DEFAULT_MAX_HYPERPERIOD,
            mandatory_policy: None,
            window_aligned_hyperperiod: false,
            guard_after_mandatory: false,
        }
    }
}

impl ShaperSection {
    fn into_config(self) -> Result<SynthesisConfig, ConfigError> {
        let mandatory_policy = match self.mandatory_policy.as_deref() {
            Some(name) => MandatoryPolicy::from_name(name)?,
            None => MandatoryPolicy::default(),
        };
        Ok(SynthesisConfig {
            guard_band: self.guard_band,
            inter_frame_gap: self.inter_frame_gap,
            gates: GateConfig {
                exclusive: self.exclusive_gates,
                idle_mask: self.idle_gate_mask,
            },
            optional_queue: self.optional_queue,
            max_hyperperiod: self.max_hyperperiod,
            mandatory_policy,
            window_aligned_hyperperiod: self.window_aligned_hyperperiod,
            guard_after_mandatory: self.guard_after_mandatory,
        })
    }
}

/// Fill in each flow's weight from `weights`.
///
/// # Errors
/// [`ConfigError::UnknownWeightFlow`] for a weight whose flow id is not in
/// `flows`.
pub fn apply_weights(flows: &mut [Flow], weights: &BTreeMap<String, f64>) -> Result<(), ConfigError> {
    for (id, &weight) in weights {
        let flow = flows
            .iter_mut()
            .find(|f| &f.id == id)
            .ok_or_else(|| ConfigError::UnknownWeightFlow { flow: id.clone() })?;
        flow.weight = weight;
    }
    Ok(())
}

// ── FlowConfigManager ─────────────────────────────────────────────────────────

/// Loads the flow table and shaper settings from a YAML file.
#[derive(Debug, Default)]
pub struct FlowConfigManager {
    flows: Vec<Flow>,
    synthesis: SynthesisConfig,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl FlowConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces any previously loaded flows and settings.
    ///
    /// Flow parameters are only parsed here; they are validated when the
    /// pipeline runs.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, a weight names an unknown flow, or a shaper setting is not
    /// recognised.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading flow configuration from: {}", path.display());

        self.flows.clear();
        self.synthesis = SynthesisConfig::default();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: FlowConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let mut flows: Vec<Flow> = file
            .flows
            .into_iter()
            .map(|e| {
                let deadline = e.deadline.unwrap_or(e.period);
                Flow::new(e.id, e.period, deadline, e.execution, (e.w, e.h), e.queue)
            })
            .collect();

        apply_weights(&mut flows, &file.weights)
            .with_context(|| format!("Invalid weights in {}", path.display()))?;

        let synthesis = file
            .shaper
            .into_config()
            .with_context(|| format!("Invalid shaper section in {}", path.display()))?;

        if flows.is_empty() {
            warn!("No flows found in configuration file");
        }
        for f in &flows {
            debug!(
                "  Flow: {} | P={} D={} C={} | (w,h)=({},{}) | queue={} | weight={}",
                f.id, f.period, f.deadline, f.execution, f.w, f.h, f.queue, f.weight,
            );
        }
        let weighted = flows.iter().filter(|f| f.weight != DEFAULT_WEIGHT).count();
        info!(
            flows = flows.len(),
            weighted,
            policy = %synthesis.mandatory_policy,
            guard_band = synthesis.guard_band,
            "Successfully loaded flow configuration"
        );

        self.flows = flows;
        self.synthesis = synthesis;
        self.loaded = true;
        Ok(())
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    /// Shaper settings from the file, or the defaults before a load.
    pub fn synthesis_config(&self) -> &SynthesisConfig {
        &self.synthesis
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn load(content: &str) -> Result<FlowConfigManager> {
        let f = yaml_tempfile(content);
        let mut mgr = FlowConfigManager::new();
        mgr.load_from_file(f.path())?;
        Ok(mgr)
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_document() {
        let yaml = r#"
flows:
  - id: brake_cmd
    period: 400000
    deadline: 300000
    execution: 6000
    w: 2
    h: 1
    queue: 3
  - id: camera
    period: 500000
    execution: 8000
weights:
  brake_cmd: 2.5
shaper:
  guard_band: 5000
  inter_frame_gap: 96
  exclusive_gates: false
  idle_gate_mask: 1
  optional_queue: 7
  mandatory_policy: work_conserving
  window_aligned_hyperperiod: true
  guard_after_mandatory: true
"#;
        let mgr = load(yaml).unwrap();
        assert!(mgr.is_loaded());
        assert_eq!(mgr.flows().len(), 2);

        let brake = &mgr.flows()[0];
        assert_eq!(brake.id, "brake_cmd");
        assert_eq!((brake.period, brake.deadline, brake.execution), (400_000, 300_000, 6_000));
        assert_eq!((brake.w, brake.h, brake.queue), (2, 1, 3));
        assert_eq!(brake.weight, 2.5);

        let camera = &mgr.flows()[1];
        assert_eq!(camera.deadline, 500_000);
        assert_eq!((camera.w, camera.h, camera.queue), (1, 1, 0));
        assert_eq!(camera.weight, DEFAULT_WEIGHT);

        let cfg = mgr.synthesis_config();
        assert_eq!(cfg.guard_band, 5_000);
        assert_eq!(cfg.inter_frame_gap, 96);
        assert!(!cfg.gates.exclusive);
        assert_eq!(cfg.gates.idle_mask, 0x01);
        assert_eq!(cfg.optional_queue, Some(7));
        assert_eq!(cfg.mandatory_policy, MandatoryPolicy::WorkConserving);
        assert!(cfg.window_aligned_hyperperiod);
        assert!(cfg.guard_after_mandatory);
    }

    #[test]
    fn shaper_section_defaults_when_absent() {
        let yaml = "flows:\n  - id: a\n    period: 1000\n    execution: 100\n";
        let mgr = load(yaml).unwrap();
        assert_eq!(mgr.synthesis_config(), &SynthesisConfig::default());
        assert_eq!(mgr.synthesis_config().guard_band, 12_000);
    }

    #[test]
    fn partial_shaper_section_keeps_other_defaults() {
        let yaml = "flows:\n  - id: a\n    period: 1000\n    execution: 100\nshaper:\n  guard_band: 0\n";
        let mgr = load(yaml).unwrap();
        let cfg = mgr.synthesis_config();
        assert_eq!(cfg.guard_band, 0);
        assert!(cfg.gates.exclusive);
        assert_eq!(cfg.max_hyperperiod, DEFAULT_MAX_HYPERPERIOD);
    }

    #[test]
    fn missing_file_returns_error() {
        let mut mgr = FlowConfigManager::new();
        let result = mgr.load_from_file(Path::new("/nonexistent/path/flows.yaml"));
        assert!(result.is_err());
        assert!(!mgr.is_loaded());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        assert!(load("this is: not: valid: yaml: content:::").is_err());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let yaml = "flows:\n  - id: a\n    period: 1000\n    execution: 100\n    prio: 3\n";
        assert!(load(yaml).is_err());
    }

    #[test]
    fn weight_for_unknown_flow_is_rejected() {
        let yaml = "flows:\n  - id: a\n    period: 1000\n    execution: 100\nweights:\n  ghost: 2.0\n";
        let err = load(yaml).unwrap_err();
        let cause = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(
            cause,
            &ConfigError::UnknownWeightFlow {
                flow: "ghost".into()
            }
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let yaml = "flows: []\nshaper:\n  mandatory_policy: round_robin\n";
        let err = load(yaml).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownPolicy(_))
        ));
    }

    #[test]
    fn reload_replaces_previous_flows() {
        let f1 = yaml_tempfile("flows:\n  - id: a\n    period: 1000\n    execution: 100\n");
        let f2 = yaml_tempfile("flows:\n  - id: b\n    period: 1000\n    execution: 100\n");

        let mut mgr = FlowConfigManager::new();
        mgr.load_from_file(f1.path()).unwrap();
        assert_eq!(mgr.flows()[0].id, "a");

        mgr.load_from_file(f2.path()).unwrap();
        assert_eq!(mgr.flows().len(), 1, "old flows must be gone");
        assert_eq!(mgr.flows()[0].id, "b");
    }

    // ── apply_weights ─────────────────────────────────────────────────────────

    #[test]
    fn apply_weights_sets_only_named_flows() {
        let mut flows = vec![
            Flow::new("a", 1_000, 1_000, 100, (1, 1), 0),
            Flow::new("b", 1_000, 1_000, 100, (1, 1), 0),
        ];
        let weights = BTreeMap::from([("b".to_string(), 4.0)]);
        apply_weights(&mut flows, &weights).unwrap();
        assert_eq!(flows[0].weight, DEFAULT_WEIGHT);
        assert_eq!(flows[1].weight, 4.0);
    }
}
