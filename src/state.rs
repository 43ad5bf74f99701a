use std::path::Path;

use crate::color::SubtypeColors;
use crate::compare::{CompareOptions, DEFAULT_TOLERANCE, compare};
use crate::data::loader::load_dataset;
use crate::data::model::{DataSubtype, Dataset};
use crate::report::ComparisonReport;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which side of the comparison a dataset is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Canonical,
    Test,
}

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Canonical dataset (None until loaded).
    pub canon: Option<Dataset>,

    /// Test dataset (None until loaded).
    pub test: Option<Dataset>,

    /// Submodel to load from newly opened files.
    pub submodel: String,

    /// Subtypes to load; empty loads all.
    pub subtypes: Vec<DataSubtype>,

    /// Relative tolerance used for the comparison.
    pub tolerance: f64,

    /// Latest comparison (None until both datasets are loaded).
    pub report: Option<ComparisonReport>,

    /// Subtype shown in the plot.
    pub selected: Option<DataSubtype>,

    /// Overlay exceeding item values on the mean plot.
    pub show_exceedances: bool,

    /// Colour per subtype.
    pub colors: Option<SubtypeColors>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            canon: None,
            test: None,
            submodel: String::new(),
            subtypes: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
            report: None,
            selected: None,
            show_exceedances: true,
            colors: None,
            status_message: None,
        }
    }
}

impl AppState {
    pub fn new(submodel: String, subtypes: Vec<DataSubtype>, tolerance: f64) -> Self {
        Self {
            submodel,
            subtypes,
            tolerance,
            ..Self::default()
        }
    }

    /// Load `path` into the given role, then re-run the comparison.
    pub fn load(&mut self, role: Role, path: &Path) {
        match load_dataset(path, role == Role::Canonical, &self.submodel, &self.subtypes) {
            Ok(dataset) => self.set_dataset(role, dataset),
            Err(e) => {
                log::error!("Failed to load {}: {e:#}", path.display());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded dataset and refresh selection, colours and report.
    pub fn set_dataset(&mut self, role: Role, dataset: Dataset) {
        let subtypes = dataset.subtypes();
        self.colors = Some(SubtypeColors::new(&subtypes));
        if self
            .selected
            .as_ref()
            .map_or(true, |s| !subtypes.contains(s))
        {
            self.selected = subtypes.iter().next().cloned();
        }

        match role {
            Role::Canonical => self.canon = Some(dataset),
            Role::Test => self.test = Some(dataset),
        }
        self.status_message = None;
        self.recompare();
    }

    /// Re-run the comparison if both sides are loaded.
    pub fn recompare(&mut self) {
        let (Some(canon), Some(test)) = (&self.canon, &self.test) else {
            self.report = None;
            return;
        };

        match compare(canon, test, &CompareOptions::with_tolerance(self.tolerance)) {
            Ok(report) => {
                self.report = Some(report);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Comparison failed: {e}");
                self.report = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Subtypes available for plotting.
    pub fn plottable_subtypes(&self) -> Vec<DataSubtype> {
        self.canon
            .as_ref()
            .or(self.test.as_ref())
            .map(|ds| ds.subtypes().into_iter().collect())
            .unwrap_or_default()
    }

    /// `(time, mean over items)` points of `subtype` in the given dataset.
    pub fn mean_series(&self, role: Role, subtype: &DataSubtype) -> Vec<[f64; 2]> {
        let dataset = match role {
            Role::Canonical => self.canon.as_ref(),
            Role::Test => self.test.as_ref(),
        };
        let Some(data) = dataset.and_then(|ds| ds.get(subtype)) else {
            return Vec::new();
        };
        data.time
            .iter()
            .zip(data.mean_over_items())
            .map(|(&t, mean)| [t, mean])
            .collect()
    }

    /// `(time, test value)` of every exceedance of `subtype`.
    pub fn exceedance_points(&self, subtype: &DataSubtype) -> Vec<[f64; 2]> {
        let (Some(report), Some(test)) = (&self.report, &self.test) else {
            return Vec::new();
        };
        let (Some(found), Some(data)) = (report.get(&test.submodel, subtype), test.get(subtype))
        else {
            return Vec::new();
        };
        found
            .exceedances
            .iter()
            .filter_map(|e| {
                let value = data.values.get(e.row)?.get(e.col)?;
                Some([e.time, *value])
            })
            .collect()
    }

    /// Exceedance count of `subtype` in the current report.
    pub fn exceedance_count(&self, subtype: &DataSubtype) -> usize {
        match (&self.report, &self.test) {
            (Some(report), Some(test)) => report.count(&test.submodel, subtype),
            _ => 0,
        }
    }

    /// Units label of `subtype`, from whichever side is loaded.
    pub fn units(&self, subtype: &DataSubtype) -> Option<&str> {
        self.canon
            .as_ref()
            .or(self.test.as_ref())
            .and_then(|ds| ds.get(subtype))
            .map(|d| d.units.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::data::model::{SubmodelKind, SubtypeData};

    fn dataset(canonical: bool, values: Vec<Vec<f64>>) -> Dataset {
        let tl = DataSubtype::new("TL");
        let data = SubtypeData {
            submodel: "FLOW".into(),
            subtype: tl.clone(),
            identifiers: (1..=values.len()).map(|i| format!("FLOW.{i}")).collect(),
            values,
            units: "K".into(),
            time: vec![0.0, 60.0],
        };
        Dataset {
            path: PathBuf::from("run.json"),
            is_canonical: canonical,
            submodel: "FLOW".into(),
            kind: SubmodelKind::Fluid,
            data: BTreeMap::from([(tl, data)]),
        }
    }

    #[test]
    fn comparison_runs_once_both_sides_are_loaded() {
        let mut state = AppState::default();
        state.set_dataset(Role::Canonical, dataset(true, vec![vec![300.0, 300.0]]));
        assert!(state.report.is_none());
        assert_eq!(state.selected, Some(DataSubtype::new("TL")));

        state.set_dataset(Role::Test, dataset(false, vec![vec![300.0, 330.0]]));
        let tl = DataSubtype::new("TL");
        assert_eq!(state.exceedance_count(&tl), 1);
        assert_eq!(state.exceedance_points(&tl), vec![[60.0, 330.0]]);
    }

    #[test]
    fn tolerance_change_refreshes_report() {
        let mut state = AppState::default();
        state.set_dataset(Role::Canonical, dataset(true, vec![vec![300.0, 300.0]]));
        state.set_dataset(Role::Test, dataset(false, vec![vec![300.0, 330.0]]));
        state.tolerance = 0.5;
        state.recompare();
        assert_eq!(state.exceedance_count(&DataSubtype::new("TL")), 0);
    }

    #[test]
    fn mean_series_pairs_time_with_item_mean() {
        let mut state = AppState::default();
        state.set_dataset(
            Role::Canonical,
            dataset(true, vec![vec![300.0, 310.0], vec![302.0, 320.0]]),
        );
        let tl = DataSubtype::new("TL");
        assert_eq!(
            state.mean_series(Role::Canonical, &tl),
            vec![[0.0, 301.0], [60.0, 315.0]]
        );
        assert!(state.mean_series(Role::Test, &tl).is_empty());
        assert_eq!(state.units(&tl), Some("K"));
    }

    #[test]
    fn two_canonical_datasets_report_an_error() {
        let mut state = AppState::default();
        state.set_dataset(Role::Canonical, dataset(true, vec![vec![1.0, 1.0]]));
        state.set_dataset(Role::Test, dataset(true, vec![vec![1.0, 1.0]]));
        assert!(state.report.is_none());
        assert!(state.status_message.as_deref().unwrap_or("").contains("both datasets"));
    }
}
