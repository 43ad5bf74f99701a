use serde::{Deserialize, Serialize};

use super::model::{DataSubtype, ItemKind};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// ResultsSource – the seam to the results-access library
// ---------------------------------------------------------------------------

/// What a results query hands back for one subtype of one submodel.
#[derive(Debug, Clone, PartialEq)]
pub struct DataWrapper {
    /// `values[item][timestep]`.
    pub values: Vec<Vec<f64>>,
    /// Identifiers of the source items, one per row.
    pub identifiers: Vec<String>,
    /// Units label of the returned values.
    pub units: String,
}

/// Read access to an opened save file.
///
/// Unit conversion and identifier resolution are the source's business; the
/// loader only shapes what comes back.
pub trait ResultsSource {
    /// Names of the thermal submodels in the save file.
    fn thermal_submodels(&self) -> &[String];

    /// Names of the fluid submodels in the save file.
    fn fluid_submodels(&self) -> &[String];

    /// Record times, shared by every quantity.
    fn times(&self) -> &[f64];

    /// Subtypes stored for the given items.
    fn subtypes(&self, kind: ItemKind, submodel: &str) -> Vec<DataSubtype>;

    /// Fetch one subtype for every item of a submodel.
    fn get_data(
        &self,
        kind: ItemKind,
        submodel: &str,
        subtype: &DataSubtype,
    ) -> Result<DataWrapper, LoadError>;
}

// ---------------------------------------------------------------------------
// ResultsExport – a save file's contents held in memory
// ---------------------------------------------------------------------------

/// One subtype of one submodel inside a results export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub submodel: String,
    pub kind: ItemKind,
    pub subtype: DataSubtype,
    #[serde(default)]
    pub units: String,
    pub items: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Everything the results library would report for a save file.
///
/// This is what the JSON and Parquet exports deserialize into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsExport {
    pub times: Vec<f64>,
    #[serde(default)]
    pub thermal_submodels: Vec<String>,
    #[serde(default)]
    pub fluid_submodels: Vec<String>,
    #[serde(default)]
    pub records: Vec<ExportRecord>,
}

impl ResultsExport {
    fn find(&self, kind: ItemKind, submodel: &str, subtype: &DataSubtype) -> Option<&ExportRecord> {
        self.records
            .iter()
            .find(|r| r.kind == kind && r.submodel == submodel && &r.subtype == subtype)
    }
}

impl ResultsSource for ResultsExport {
    fn thermal_submodels(&self) -> &[String] {
        &self.thermal_submodels
    }

    fn fluid_submodels(&self) -> &[String] {
        &self.fluid_submodels
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn subtypes(&self, kind: ItemKind, submodel: &str) -> Vec<DataSubtype> {
        let mut found: Vec<DataSubtype> = self
            .records
            .iter()
            .filter(|r| r.kind == kind && r.submodel == submodel)
            .map(|r| r.subtype.clone())
            .collect();
        found.sort();
        found.dedup();
        found
    }

    fn get_data(
        &self,
        kind: ItemKind,
        submodel: &str,
        subtype: &DataSubtype,
    ) -> Result<DataWrapper, LoadError> {
        let record = self
            .find(kind, submodel, subtype)
            .ok_or_else(|| LoadError::SubtypeUnavailable {
                kind: kind.to_string(),
                submodel: submodel.to_string(),
                subtype: subtype.to_string(),
            })?;

        Ok(DataWrapper {
            values: record.values.clone(),
            identifiers: record.items.clone(),
            units: record.units.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export() -> ResultsExport {
        ResultsExport {
            times: vec![0.0, 1.0],
            thermal_submodels: vec!["WALL".into()],
            fluid_submodels: vec!["FLOW".into()],
            records: vec![
                ExportRecord {
                    submodel: "FLOW".into(),
                    kind: ItemKind::Lump,
                    subtype: "PL".into(),
                    units: "Pa".into(),
                    items: vec!["FLOW.1".into()],
                    values: vec![vec![1.0e5, 1.1e5]],
                },
                ExportRecord {
                    submodel: "FLOW".into(),
                    kind: ItemKind::Lump,
                    subtype: "TL".into(),
                    units: "K".into(),
                    items: vec!["FLOW.1".into()],
                    values: vec![vec![300.0, 301.0]],
                },
            ],
        }
    }

    #[test]
    fn subtypes_are_sorted_per_submodel() {
        let src = export();
        assert_eq!(
            src.subtypes(ItemKind::Lump, "FLOW"),
            vec![DataSubtype::new("PL"), DataSubtype::new("TL")]
        );
        assert!(src.subtypes(ItemKind::Node, "FLOW").is_empty());
    }

    #[test]
    fn get_data_returns_wrapper() {
        let src = export();
        let wrapper = src
            .get_data(ItemKind::Lump, "FLOW", &DataSubtype::new("TL"))
            .unwrap();
        assert_eq!(wrapper.units, "K");
        assert_eq!(wrapper.identifiers, vec!["FLOW.1".to_string()]);
        assert_eq!(wrapper.values, vec![vec![300.0, 301.0]]);
    }

    #[test]
    fn get_data_rejects_wrong_item_kind() {
        let src = export();
        let err = src
            .get_data(ItemKind::Node, "FLOW", &DataSubtype::new("TL"))
            .unwrap_err();
        assert_eq!(err.to_string(), "NODE submodel FLOW has no TL data");
    }
}
