use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::compare::{CompareOptions, DEFAULT_TOLERANCE};
use crate::data::model::DataSubtype;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// A comparison job, as read from a JSON file and/or the command line.
///
/// ```json
/// {
///   "canon": "dummy_results/melt_frost_canon.parquet",
///   "test": "dummy_results/melt_frost_test.parquet",
///   "submodel": "FLOW",
///   "subtypes": ["TL", "PL", "XL", "AL"],
///   "tolerance": 1e-6
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub canon: Option<PathBuf>,
    pub test: Option<PathBuf>,
    pub submodel: Option<String>,
    pub subtypes: Vec<String>,
    pub tolerance: Option<f64>,
}

/// A fully specified comparison job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub canon: PathBuf,
    pub test: PathBuf,
    pub submodel: String,
    /// Empty means every subtype the files offer.
    pub subtypes: Vec<DataSubtype>,
    pub tolerance: f64,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: RunConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(mut self, overrides: RunConfig) -> Self {
        if overrides.canon.is_some() {
            self.canon = overrides.canon;
        }
        if overrides.test.is_some() {
            self.test = overrides.test;
        }
        if overrides.submodel.is_some() {
            self.submodel = overrides.submodel;
        }
        if !overrides.subtypes.is_empty() {
            self.subtypes = overrides.subtypes;
        }
        if overrides.tolerance.is_some() {
            self.tolerance = overrides.tolerance;
        }
        self
    }

    /// Fill in defaults and check that the job is complete.
    pub fn resolve(self) -> Result<ResolvedRun> {
        let Some(canon) = self.canon else {
            bail!("no canonical save file given (--canon or \"canon\" in the config)");
        };
        let Some(test) = self.test else {
            bail!("no test save file given (--test or \"test\" in the config)");
        };
        let Some(submodel) = self.submodel else {
            bail!("no submodel given (--submodel or \"submodel\" in the config)");
        };

        let tolerance = self.tolerance.unwrap_or(DEFAULT_TOLERANCE);
        if tolerance.is_nan() || tolerance < 0.0 {
            bail!("tolerance must be a non-negative number, got {tolerance}");
        }

        let mut subtypes: Vec<DataSubtype> = Vec::new();
        for code in &self.subtypes {
            subtypes.extend(DataSubtype::parse_list(code));
        }

        Ok(ResolvedRun {
            canon,
            test,
            submodel,
            subtypes,
            tolerance,
        })
    }
}

impl ResolvedRun {
    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            tolerance: self.tolerance,
            subtypes: if self.subtypes.is_empty() {
                None
            } else {
                Some(self.subtypes.clone())
            },
        }
    }
}
