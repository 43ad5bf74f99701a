//! Extract thermal/fluid time-series from simulation save files and flag
//! regressions of a test run against a canonical run.
//!
//! ```no_run
//! use std::path::Path;
//! use savdiff::{CompareOptions, DataSubtype, load_dataset};
//!
//! let subtypes = DataSubtype::parse_list("TL,PL");
//! let canon = load_dataset(Path::new("canon.parquet"), true, "FLOW", &subtypes)?;
//! let test = load_dataset(Path::new("test.parquet"), false, "FLOW", &subtypes)?;
//! let report = canon.compare(&test, &CompareOptions::with_tolerance(1e-6))?;
//! report.print_summary();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod app;
pub mod color;
pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod report;
pub mod state;
pub mod ui;

pub use compare::{CompareOptions, DEFAULT_TOLERANCE, compare};
pub use data::loader::{load_dataset, load_from_source, open_save_file, resolve_submodel};
pub use data::model::{DataSubtype, Dataset, ItemKind, SubmodelKind, SubtypeData};
pub use data::source::{DataWrapper, ExportRecord, ResultsExport, ResultsSource};
pub use error::{CompareError, LoadError};
pub use report::{ComparisonReport, Exceedance, SubtypeExceedances};
