//! Progress reporting for pipeline runs.

use crate::runner::RunReport;

/// Callbacks fired as the run advances. The CLI prints these to stdout;
/// tests substitute a silent implementation.
pub trait RunProgress {
    /// A raw table was parsed out of its source.
    fn on_extracted(&self, dataset: &str, rows: usize);

    /// A clean table is ready for loading.
    fn on_transformed(&self, dataset: &str, rows: usize);

    /// A table was durably written to the store.
    fn on_loaded(&self, dataset: &str, table: &str, rows: usize);

    /// Staging artifacts were removed after a fully successful run.
    fn on_cleaned(&self, files_removed: usize);

    /// The whole run finished.
    fn on_run_complete(&self, report: &RunReport);
}

/// Progress reporter that prints one line per event to stdout.
pub struct StdoutProgress;

impl RunProgress for StdoutProgress {
    fn on_extracted(&self, dataset: &str, rows: usize) {
        println!("[{dataset}] extracted {rows} raw rows");
    }

    fn on_transformed(&self, dataset: &str, rows: usize) {
        println!("[{dataset}] transformed to {rows} clean rows");
    }

    fn on_loaded(&self, dataset: &str, table: &str, rows: usize) {
        println!("[{dataset}] loaded {rows} rows into '{table}'");
    }

    fn on_cleaned(&self, files_removed: usize) {
        println!("cleaned up {files_removed} staging file(s)");
    }

    fn on_run_complete(&self, report: &RunReport) {
        println!(
            "\nPipeline complete: {} dataset(s) -> {}",
            report.datasets.len(),
            report.output_path.display()
        );
    }
}

/// No-op reporter for tests and embedding.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn on_extracted(&self, _dataset: &str, _rows: usize) {}
    fn on_transformed(&self, _dataset: &str, _rows: usize) {}
    fn on_loaded(&self, _dataset: &str, _table: &str, _rows: usize) {}
    fn on_cleaned(&self, _files_removed: usize) {}
    fn on_run_complete(&self, _report: &RunReport) {}
}
