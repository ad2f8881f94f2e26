//! climatepipe runner — dataset suites, configuration, run orchestration.
//!
//! This crate builds on `climatepipe-core` to provide:
//! - Built-in dataset job definitions (the two consolidated suites)
//! - Pipeline configuration from TOML or the environment
//! - The sequential run state machine with per-stage failure reporting
//! - Progress reporting to stdout

pub mod config;
pub mod datasets;
pub mod progress;
pub mod runner;

pub use config::{ConfigError, PipelineConfig};
pub use datasets::{suite, suite_names, DatasetJob};
pub use progress::{RunProgress, SilentProgress, StdoutProgress};
pub use runner::{
    run_pipeline, run_suites, DatasetReport, RunDeps, RunError, RunReport, Stage,
};
