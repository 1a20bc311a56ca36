/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use gcl_synth::config::FlowConfigManager;
use gcl_synth::gcl::{AdminEntry, GateControlList};
use gcl_synth::report::AdmissionReport;
use gcl_synth::scheduler::MandatoryPolicy;
use gcl_synth::{synthesize, SynthesisConfig};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Weakly-hard GCL synthesis for a Time-Aware Shaper egress port.
///
/// Example:
///   gcl-synth -c flows.yaml -o gcl.yaml --guard-band 12000
#[derive(Debug, Parser)]
#[command(
    name = "gcl-synth",
    about = "Weakly-hard Gate Control List synthesis",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML flow configuration file.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Write the GCL and report here instead of stdout.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Override the guard band from the configuration file.
    #[arg(long = "guard-band")]
    guard_band: Option<u64>,

    /// Override the mandatory policy (deadline_ordered, work_conserving).
    #[arg(long = "policy")]
    policy: Option<String>,
}

/// What the binary writes out.
#[derive(Debug, Serialize)]
struct OutputDocument<'a> {
    settings: &'a SynthesisConfig,
    gcl: &'a GateControlList,
    admin_list: Vec<AdminEntry>,
    report: &'a AdmissionReport,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    // Logs go to stderr so the YAML on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(
        config     = %cli.config.display(),
        output     = ?cli.output,
        guard_band = ?cli.guard_band,
        policy     = ?cli.policy,
        "gcl-synth starting"
    );

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut manager = FlowConfigManager::new();
    manager
        .load_from_file(&cli.config)
        .context("Failed to load flow configuration")?;

    let mut settings = manager.synthesis_config().clone();
    if let Some(guard_band) = cli.guard_band {
        settings.guard_band = guard_band;
    }
    if let Some(name) = &cli.policy {
        settings.mandatory_policy = MandatoryPolicy::from_name(name)?;
    }

    let out = synthesize(manager.flows(), &settings).context("Synthesis failed")?;

    let doc = OutputDocument {
        settings: &settings,
        gcl: &out.gcl,
        admin_list: out.gcl.admin_entries(),
        report: &out.report,
    };
    let yaml = serde_yaml::to_string(&doc).context("Failed to serialise output")?;

    match &cli.output {
        Some(path) => write_output(path, &yaml)?,
        None => print!("{yaml}"),
    }

    info!(
        hyperperiod = out.hyperperiod.hyperperiod,
        gate_events = out.gcl.len(),
        optional_admitted = out.report.totals.optional_admitted,
        optional_dropped = out.report.totals.optional_dropped,
        "Done"
    );
    Ok(())
}

fn write_output(path: &Path, yaml: &str) -> Result<()> {
    std::fs::write(path, yaml)
        .with_context(|| format!("Cannot write output file: {}", path.display()))?;
    info!("GCL written to {}", path.display());
    Ok(())
}
