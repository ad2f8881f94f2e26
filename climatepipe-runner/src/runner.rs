//! Pipeline orchestration.
//!
//! One run drives every dataset job through the sequential state machine
//! INIT → EXTRACTED → TRANSFORMED → LOADED → CLEANED. All datasets are
//! extracted and transformed before the target store is opened, so a failing
//! dataset aborts the run before any write reaches the target file. The
//! first failure halts the run at that stage; staging artifacts are left in
//! place for inspection, and cleanup happens only after every table has been
//! durably written.

use crate::config::PipelineConfig;
use crate::datasets::{suite, DatasetJob};
use crate::progress::RunProgress;
use climatepipe_core::error::PipelineError;
use climatepipe_core::extract::Extractor;
use climatepipe_core::load::SqliteStore;
use climatepipe_core::source::{Credentials, Fetch};
use climatepipe_core::staging::{self, StagingArea};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The stage a failure was attempting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Load,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Load => "load",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(word)
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("dataset '{dataset}' failed during {stage}: {source}")]
    Stage {
        dataset: String,
        stage: Stage,
        source: PipelineError,
    },

    #[error("cannot prepare staging area: {0}")]
    Staging(#[source] PipelineError),

    #[error("cannot open target store '{path}': {source}")]
    Store {
        path: PathBuf,
        source: PipelineError,
    },

    #[error("staging cleanup failed: {0}")]
    Cleanup(#[source] PipelineError),

    #[error("unknown suite '{0}'")]
    UnknownSuite(String),
}

/// External collaborators a run needs: the network, optional credentials,
/// and a progress sink.
pub struct RunDeps<'a> {
    pub fetcher: &'a dyn Fetch,
    pub credentials: Option<Credentials>,
    /// Override of the hosting-service API base (tests point this at fixtures).
    pub api_base: Option<String>,
    pub progress: &'a dyn RunProgress,
}

/// Provenance for one loaded dataset.
#[derive(Debug, Clone)]
pub struct DatasetReport {
    pub name: String,
    pub table: String,
    pub rows_extracted: usize,
    pub rows_loaded: usize,
    /// BLAKE3 hex digest of the fetched payload.
    pub content_hash: String,
}

/// Summary of a fully successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub datasets: Vec<DatasetReport>,
    pub staging_removed: usize,
    pub output_path: PathBuf,
}

/// Resolve suite names to jobs and run them as one pipeline.
pub fn run_suites(
    suites: &[String],
    config: &PipelineConfig,
    deps: &RunDeps,
) -> Result<RunReport, RunError> {
    let mut jobs = Vec::new();
    for name in suites {
        let suite_jobs = suite(name).ok_or_else(|| RunError::UnknownSuite(name.clone()))?;
        jobs.extend(suite_jobs);
    }
    run_pipeline(&jobs, config, deps)
}

/// Run the full pipeline over the given jobs.
pub fn run_pipeline(
    jobs: &[DatasetJob],
    config: &PipelineConfig,
    deps: &RunDeps,
) -> Result<RunReport, RunError> {
    let mut staging_area =
        StagingArea::new(&config.staging_dir).map_err(RunError::Staging)?;

    let mut extractor = Extractor::new(deps.fetcher, deps.credentials.clone());
    if let Some(base) = &deps.api_base {
        extractor = extractor.with_api_base(base.clone());
    }

    // Extract every dataset.
    let mut extractions = Vec::with_capacity(jobs.len());
    for job in jobs {
        let extraction = extractor
            .extract(job.name, &job.source, &mut staging_area)
            .map_err(|source| RunError::Stage {
                dataset: job.name.to_string(),
                stage: Stage::Extract,
                source,
            })?;
        deps.progress
            .on_extracted(job.name, extraction.table.row_count());
        extractions.push(extraction);
    }

    // Transform every raw table.
    let mut clean_tables = Vec::with_capacity(jobs.len());
    for (job, extraction) in jobs.iter().zip(&extractions) {
        let clean = job
            .spec
            .apply(&extraction.table, job.name)
            .map_err(|source| RunError::Stage {
                dataset: job.name.to_string(),
                stage: Stage::Transform,
                source,
            })?;
        deps.progress.on_transformed(job.name, clean.row_count());
        clean_tables.push(clean);
    }

    // Load. The store is opened only now, with every clean table in hand.
    let mut store = SqliteStore::open(&config.output_path).map_err(|source| RunError::Store {
        path: config.output_path.clone(),
        source,
    })?;

    let mut reports = Vec::with_capacity(jobs.len());
    for ((job, extraction), clean) in jobs.iter().zip(&extractions).zip(&clean_tables) {
        store
            .replace_table(job.table, clean)
            .map_err(|source| RunError::Stage {
                dataset: job.name.to_string(),
                stage: Stage::Load,
                source,
            })?;
        deps.progress
            .on_loaded(job.name, job.table, clean.row_count());
        reports.push(DatasetReport {
            name: job.name.to_string(),
            table: job.table.to_string(),
            rows_extracted: extraction.table.row_count(),
            rows_loaded: clean.row_count(),
            content_hash: extraction.content_hash.clone(),
        });
    }
    drop(store);

    // Cleanup runs only after every load committed.
    let staging_removed =
        staging::cleanup(staging_area.artifacts()).map_err(RunError::Cleanup)?;
    deps.progress.on_cleaned(staging_removed);

    let report = RunReport {
        datasets: reports,
        staging_removed,
        output_path: config.output_path.clone(),
    };
    deps.progress.on_run_complete(&report);
    Ok(report)
}
