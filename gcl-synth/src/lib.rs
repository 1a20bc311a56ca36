/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! gcl-synth – weakly-hard Gate Control List synthesis
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── flow          – Flow / Job model and validation
//! ├── hyperperiod/  – LCM / GCD helpers, cycle length
//! ├── unroll        – flow → job instances over one cycle
//! ├── classifier    – (w, h) mandatory / optional labelling
//! ├── scheduler/    – EDF for mandatory jobs, errors, link-load analysis
//! ├── slack         – slack finder and optional-job packer
//! ├── schedule      – merged link timeline and its invariants
//! ├── gcl           – gate control list emitter
//! ├── report        – admission report
//! ├── pipeline      – end-to-end driver
//! └── config/       – YAML flow table and shaper settings
//! ```

pub mod classifier;
pub mod config;
pub mod flow;
pub mod gcl;
pub mod hyperperiod;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod scheduler;
pub mod slack;
pub mod unroll;

pub use pipeline::{synthesize, SynthesisConfig, SynthesisOutput};
