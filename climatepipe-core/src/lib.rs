//! climatepipe core — tabular model, extraction, transformation, loading.
//!
//! This crate contains the building blocks of the ETL pipeline:
//! - In-memory tabular model (`Value`, `Table`, affinity inference)
//! - Dataset sources and the `Fetch` network seam
//! - Extraction: fetch, staging, archive unpacking, encoding fallback, CSV
//! - Declarative transformation (`TableSpec`: project/rename/derive/filter/group)
//! - SQLite loading with whole-table replace semantics
//! - Staging-area cleanup
//!
//! Orchestration (which datasets run, in which order, with which config)
//! lives in `climatepipe-runner`.

pub mod decode;
pub mod error;
pub mod extract;
pub mod load;
pub mod source;
pub mod staging;
pub mod table;
pub mod transform;

pub use error::PipelineError;
pub use extract::{Extraction, Extractor};
pub use load::SqliteStore;
pub use source::{Credentials, DatasetSource, Fetch, FetchedPayload, HttpFetcher};
pub use staging::{cleanup, StagingArea};
pub use table::{ColumnType, Table, Value};
pub use transform::{
    CellParse, ColumnMap, GroupSpec, MissingPolicy, Reducer, RowFilter, TableSpec,
};
