//! Relative-error comparison of a test dataset against a canonical one.

use std::collections::BTreeSet;

use crate::data::model::{DataSubtype, Dataset};
use crate::error::CompareError;
use crate::report::{ComparisonReport, Exceedance};

/// Default relative-error tolerance.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Knobs for [`compare`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompareOptions {
    /// Largest accepted `|(test - canon) / canon|`.
    pub tolerance: f64,
    /// Restrict the comparison to these subtypes. `None` compares all.
    pub subtypes: Option<Vec<DataSubtype>>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            subtypes: None,
        }
    }
}

impl CompareOptions {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }
}

/// Elementwise `(test - canon) / canon`.
///
/// Both arrays must have the same shape; extra trailing values are ignored.
pub fn relative_difference(canon: &[Vec<f64>], test: &[Vec<f64>]) -> Vec<Vec<f64>> {
    canon
        .iter()
        .zip(test)
        .map(|(c_row, t_row)| {
            c_row
                .iter()
                .zip(t_row)
                .map(|(&c, &t)| (t - c) / c)
                .collect()
        })
        .collect()
}

/// `(row, col)` of every entry with `|diff| > tolerance`, row-major.
///
/// NaN never exceeds; infinities always do.
pub fn exceeding_positions(diff: &[Vec<f64>], tolerance: f64) -> Vec<(usize, usize)> {
    diff.iter()
        .enumerate()
        .flat_map(|(row, values)| {
            values
                .iter()
                .enumerate()
                .filter(move |(_, d)| d.abs() > tolerance)
                .map(move |(col, _)| (row, col))
        })
        .collect()
}

fn codes(set: &BTreeSet<DataSubtype>) -> Vec<String> {
    set.iter().map(|s| s.to_string()).collect()
}

/// Compare two datasets, exactly one of which must be canonical.
///
/// Argument order does not matter. Returns every exceedance of
/// `options.tolerance` grouped by submodel and subtype.
pub fn compare(
    first: &Dataset,
    second: &Dataset,
    options: &CompareOptions,
) -> Result<ComparisonReport, CompareError> {
    let tolerance = options.tolerance;
    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(CompareError::InvalidTolerance(tolerance));
    }

    let (canon, test) = match (first.is_canonical, second.is_canonical) {
        (true, false) => (first, second),
        (false, true) => (second, first),
        (true, true) => return Err(CompareError::BothCanonical),
        (false, false) => return Err(CompareError::NeitherCanonical),
    };

    let canon_subtypes = canon.subtypes();
    let test_subtypes = test.subtypes();
    if canon_subtypes != test_subtypes {
        return Err(CompareError::SubtypeMismatch {
            canonical: codes(&canon_subtypes),
            test: codes(&test_subtypes),
        });
    }

    let compared: BTreeSet<DataSubtype> = match &options.subtypes {
        None => canon_subtypes.clone(),
        Some(requested) => {
            let requested: BTreeSet<DataSubtype> = requested.iter().cloned().collect();
            if !requested.is_subset(&canon_subtypes) {
                return Err(CompareError::UnavailableSubtypes {
                    requested: codes(&requested),
                    available: codes(&canon_subtypes),
                });
            }
            requested
        }
    };

    let mut report = ComparisonReport::new(
        canon.path.clone(),
        test.path.clone(),
        tolerance,
        compared.iter().cloned().collect(),
    );

    for subtype in &compared {
        let (Some(canon_data), Some(test_data)) = (canon.get(subtype), test.get(subtype)) else {
            continue;
        };

        if canon_data.submodel != test_data.submodel {
            return Err(CompareError::SubmodelMismatch {
                subtype: subtype.to_string(),
                canonical: canon_data.submodel.clone(),
                test: test_data.submodel.clone(),
            });
        }

        canon_data.validate()?;
        test_data.validate()?;
        let (canon_rows, canon_cols) = canon_data.shape();
        let (test_rows, test_cols) = test_data.shape();
        if (canon_rows, canon_cols) != (test_rows, test_cols) {
            return Err(CompareError::ShapeMismatch {
                subtype: subtype.to_string(),
                canonical_rows: canon_rows,
                canonical_cols: canon_cols,
                test_rows,
                test_cols,
            });
        }

        let diff = relative_difference(&canon_data.values, &test_data.values);
        let found: Vec<Exceedance> = exceeding_positions(&diff, tolerance)
            .into_iter()
            .map(|(row, col)| Exceedance {
                identifier: test_data.identifiers[row].clone(),
                time: test_data.time[col],
                relative_error: diff[row][col],
                row,
                col,
            })
            .collect();

        if found.is_empty() {
            log::debug!("{}.{subtype}: within tolerance", canon_data.submodel);
        } else {
            log::warn!(
                "{}.{subtype}: {} values exceed relative tolerance {tolerance}",
                canon_data.submodel,
                found.len()
            );
        }

        report.record(&canon_data.submodel, subtype, &test_data.units, found);
    }

    log::info!(
        "Compared {} against canonical {}: {} exceedances",
        test.path.display(),
        canon.path.display(),
        report.total_exceedances()
    );

    Ok(report)
}

impl Dataset {
    /// Compare with `other`; see [`compare`].
    pub fn compare(
        &self,
        other: &Dataset,
        options: &CompareOptions,
    ) -> Result<ComparisonReport, CompareError> {
        compare(self, other, options)
    }
}
