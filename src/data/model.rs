use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Item and submodel kinds
// ---------------------------------------------------------------------------

/// Which family of items a results query addresses.
///
/// Serializes lowercase; reads any case, same as the Parquet `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Thermal network node.
    Node,
    /// Fluid network lump.
    Lump,
}

impl ItemKind {
    /// Case-insensitive parse of `node` / `lump`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" => Some(ItemKind::Node),
            "lump" => Some(ItemKind::Lump),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Node => "node",
            ItemKind::Lump => "lump",
        }
    }
}

impl<'de> Deserialize<'de> for ItemKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ItemKind::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown item kind {s:?}, expected node or lump"))
        })
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Node => write!(f, "NODE"),
            ItemKind::Lump => write!(f, "LUMP"),
        }
    }
}

/// Whether a submodel was found among the thermal or the fluid submodels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmodelKind {
    Thermal,
    Fluid,
}

impl SubmodelKind {
    /// Thermal submodels hold nodes, fluid submodels hold lumps.
    pub fn item_kind(self) -> ItemKind {
        match self {
            SubmodelKind::Thermal => ItemKind::Node,
            SubmodelKind::Fluid => ItemKind::Lump,
        }
    }
}

impl fmt::Display for SubmodelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmodelKind::Thermal => write!(f, "thermal"),
            SubmodelKind::Fluid => write!(f, "fluid"),
        }
    }
}

// ---------------------------------------------------------------------------
// DataSubtype – physical quantity code
// ---------------------------------------------------------------------------

/// Codes the results library knows by name, with the items they apply to.
const KNOWN_SUBTYPES: &[(&str, ItemKind)] = &[
    ("T", ItemKind::Node), // temperature
    ("Q", ItemKind::Node), // heat rate
    ("C", ItemKind::Node), // capacitance
    ("TL", ItemKind::Lump), // temperature
    ("PL", ItemKind::Lump), // pressure
    ("XL", ItemKind::Lump), // quality
    ("AL", ItemKind::Lump), // void fraction
    ("DL", ItemKind::Lump), // density
    ("HL", ItemKind::Lump), // enthalpy
];

/// A data subtype code such as `T` or `PL`.
///
/// Codes are normalised to trimmed upper case. Codes outside the known table
/// are still valid; the results source decides whether it has them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DataSubtype(String);

impl DataSubtype {
    pub fn new(code: impl AsRef<str>) -> Self {
        DataSubtype(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Item kind a well-known code applies to.
    pub fn item_kind(&self) -> Option<ItemKind> {
        KNOWN_SUBTYPES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, kind)| *kind)
    }

    /// False only for a well-known code of the other item kind (`T` on lumps).
    pub fn fits(&self, kind: ItemKind) -> bool {
        self.item_kind().map_or(true, |known| known == kind)
    }

    /// Parse a comma-separated list (`"TL, PL,XL"`), skipping empty entries.
    pub fn parse_list(s: &str) -> Vec<DataSubtype> {
        s.split(',')
            .filter(|tok| !tok.trim().is_empty())
            .map(DataSubtype::new)
            .collect()
    }
}

impl FromStr for DataSubtype {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(DataSubtype::new(s))
    }
}

impl From<&str> for DataSubtype {
    fn from(s: &str) -> Self {
        DataSubtype::new(s)
    }
}

impl From<String> for DataSubtype {
    fn from(s: String) -> Self {
        DataSubtype::new(s)
    }
}

impl From<DataSubtype> for String {
    fn from(subtype: DataSubtype) -> Self {
        subtype.0
    }
}

impl fmt::Display for DataSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SubtypeData – one quantity for every item of a submodel
// ---------------------------------------------------------------------------

/// Values of a single subtype: rows are items, columns are timesteps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtypeData {
    pub submodel: String,
    pub subtype: DataSubtype,
    /// `values[item][timestep]`.
    pub values: Vec<Vec<f64>>,
    /// One identifier per row of `values`.
    pub identifiers: Vec<String>,
    /// Units label in the working unit system.
    pub units: String,
    /// Save-file time vector, one entry per column.
    pub time: Vec<f64>,
}

impl SubtypeData {
    /// `(items, timesteps)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.identifiers.len(), self.time.len())
    }

    /// Check that rows, identifiers and time agree.
    pub fn validate(&self) -> Result<(), LoadError> {
        let shape_error = |detail: String| LoadError::Shape {
            submodel: self.submodel.clone(),
            subtype: self.subtype.to_string(),
            detail,
        };

        if self.values.len() != self.identifiers.len() {
            return Err(shape_error(format!(
                "{} value rows but {} item identifiers",
                self.values.len(),
                self.identifiers.len()
            )));
        }
        for (row, values) in self.values.iter().enumerate() {
            if values.len() != self.time.len() {
                return Err(shape_error(format!(
                    "row {row} ({}) has {} values but there are {} timesteps",
                    self.identifiers[row],
                    values.len(),
                    self.time.len()
                )));
            }
        }
        Ok(())
    }

    /// Mean over all items at each timestep. Empty when there are no items.
    pub fn mean_over_items(&self) -> Vec<f64> {
        if self.values.is_empty() {
            return Vec::new();
        }
        let n = self.values.len() as f64;
        (0..self.time.len())
            .map(|col| {
                self.values
                    .iter()
                    .map(|row| row.get(col).copied().unwrap_or(f64::NAN))
                    .sum::<f64>()
                    / n
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dataset – everything extracted from one save file
// ---------------------------------------------------------------------------

/// A save file's extracted values for one submodel, keyed by subtype.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub is_canonical: bool,
    pub submodel: String,
    pub kind: SubmodelKind,
    pub data: BTreeMap<DataSubtype, SubtypeData>,
}

impl Dataset {
    pub fn subtypes(&self) -> BTreeSet<DataSubtype> {
        self.data.keys().cloned().collect()
    }

    pub fn get(&self, subtype: &DataSubtype) -> Option<&SubtypeData> {
        self.data.get(subtype)
    }

    /// The shared time vector (empty if nothing was loaded).
    pub fn time(&self) -> &[f64] {
        self.data
            .values()
            .next()
            .map(|d| d.time.as_slice())
            .unwrap_or(&[])
    }

    /// Number of loaded subtypes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SubtypeData {
        SubtypeData {
            submodel: "FLOW".into(),
            subtype: DataSubtype::new("TL"),
            values: vec![vec![1.0, 2.0, 3.0], vec![3.0, 4.0, 5.0]],
            identifiers: vec!["FLOW.1".into(), "FLOW.2".into()],
            units: "K".into(),
            time: vec![0.0, 10.0, 20.0],
        }
    }

    #[test]
    fn subtype_codes_are_normalised() {
        assert_eq!(DataSubtype::new(" pl ").code(), "PL");
        assert_eq!(DataSubtype::new("tl").item_kind(), Some(ItemKind::Lump));
        assert_eq!(DataSubtype::new("FOO").item_kind(), None);
    }

    #[test]
    fn known_codes_fit_their_item_kind() {
        assert!(DataSubtype::new("T").fits(ItemKind::Node));
        assert!(!DataSubtype::new("T").fits(ItemKind::Lump));
        assert!(!DataSubtype::new("pl").fits(ItemKind::Node));
        assert!(DataSubtype::new("FOO").fits(ItemKind::Node));
        assert!(DataSubtype::new("FOO").fits(ItemKind::Lump));
    }

    #[test]
    fn deserialized_codes_are_normalised() {
        let parsed: Vec<DataSubtype> = serde_json::from_str(r#"["tl", " PL"]"#).unwrap();
        assert_eq!(parsed, vec![DataSubtype::new("TL"), DataSubtype::new("PL")]);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"["TL","PL"]"#);
    }

    #[test]
    fn parse_list_skips_blanks() {
        let parsed = DataSubtype::parse_list("TL, pl,,XL ");
        let codes: Vec<&str> = parsed.iter().map(|s| s.code()).collect();
        assert_eq!(codes, ["TL", "PL", "XL"]);
    }

    #[test]
    fn mean_over_items_averages_rows() {
        assert_eq!(sample().mean_over_items(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn validate_catches_ragged_rows() {
        let mut data = sample();
        assert!(data.validate().is_ok());
        data.values[1].pop();
        let err = data.validate().unwrap_err();
        assert!(err.to_string().contains("row 1 (FLOW.2)"));
    }

    #[test]
    fn validate_catches_missing_identifiers() {
        let mut data = sample();
        data.identifiers.pop();
        assert!(matches!(data.validate(), Err(LoadError::Shape { .. })));
    }

    #[test]
    fn submodel_kind_maps_to_item_kind() {
        assert_eq!(SubmodelKind::Thermal.item_kind(), ItemKind::Node);
        assert_eq!(SubmodelKind::Fluid.item_kind(), ItemKind::Lump);
        assert_eq!(ItemKind::parse("LUMP"), Some(ItemKind::Lump));
        assert_eq!(ItemKind::parse("tie"), None);
    }

    #[test]
    fn item_kind_reads_any_case() {
        let kinds: Vec<ItemKind> = serde_json::from_str(r#"["LUMP", "Node", "lump"]"#).unwrap();
        assert_eq!(kinds, vec![ItemKind::Lump, ItemKind::Node, ItemKind::Lump]);
        assert_eq!(serde_json::to_string(&ItemKind::Lump).unwrap(), r#""lump""#);
        assert!(serde_json::from_str::<ItemKind>(r#""tie""#).is_err());
    }
}
