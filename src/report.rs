//! Exceedance reporting — collects comparison findings into human-readable
//! and machine-readable reports.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::model::DataSubtype;

/// Exceedances listed per subtype in the printed summary.
const SUMMARY_ROWS: usize = 10;

/// One value outside the tolerance band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exceedance {
    pub identifier: String,
    pub time: f64,
    /// Signed `(test - canon) / canon`.
    #[serde(with = "non_finite")]
    pub relative_error: f64,
    /// Position in the value arrays.
    pub row: usize,
    pub col: usize,
}

/// JSON has no infinities: non-finite errors travel as `"inf"`, `"-inf"`
/// and `"NaN"`.
mod non_finite {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("not a relative error: {other:?}"))),
            },
        }
    }
}

/// All exceedances of one subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtypeExceedances {
    pub units: String,
    pub exceedances: Vec<Exceedance>,
}

impl SubtypeExceedances {
    pub fn identifiers(&self) -> Vec<&str> {
        self.exceedances.iter().map(|e| e.identifier.as_str()).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.exceedances.iter().map(|e| e.time).collect()
    }

    pub fn errors(&self) -> Vec<f64> {
        self.exceedances.iter().map(|e| e.relative_error).collect()
    }

    /// Largest `|relative_error|`, infinities included.
    pub fn max_abs_error(&self) -> f64 {
        self.exceedances
            .iter()
            .map(|e| e.relative_error.abs())
            .fold(0.0, f64::max)
    }
}

/// Result of comparing a test dataset against a canonical one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub canonical: PathBuf,
    pub test: PathBuf,
    pub tolerance: f64,
    /// Subtypes that were compared, exceeding or not.
    pub compared: Vec<DataSubtype>,
    /// submodel → subtype → exceedances. Subtypes within tolerance are absent.
    pub exceedances: BTreeMap<String, BTreeMap<DataSubtype, SubtypeExceedances>>,
}

impl ComparisonReport {
    pub fn new(canonical: PathBuf, test: PathBuf, tolerance: f64, compared: Vec<DataSubtype>) -> Self {
        Self {
            canonical,
            test,
            tolerance,
            compared,
            exceedances: BTreeMap::new(),
        }
    }

    /// Record a subtype's findings. Nothing is stored when `found` is empty.
    pub fn record(
        &mut self,
        submodel: &str,
        subtype: &DataSubtype,
        units: &str,
        found: Vec<Exceedance>,
    ) {
        if found.is_empty() {
            return;
        }
        self.exceedances
            .entry(submodel.to_string())
            .or_default()
            .insert(
                subtype.clone(),
                SubtypeExceedances {
                    units: units.to_string(),
                    exceedances: found,
                },
            );
    }

    pub fn get(&self, submodel: &str, subtype: &DataSubtype) -> Option<&SubtypeExceedances> {
        self.exceedances.get(submodel)?.get(subtype)
    }

    /// Number of exceedances in `submodel`'s `subtype` (0 when within tolerance).
    pub fn count(&self, submodel: &str, subtype: &DataSubtype) -> usize {
        self.get(submodel, subtype)
            .map(|s| s.exceedances.len())
            .unwrap_or(0)
    }

    pub fn total_exceedances(&self) -> usize {
        self.exceedances
            .values()
            .flat_map(|by_subtype| by_subtype.values())
            .map(|s| s.exceedances.len())
            .sum()
    }

    /// True if nothing exceeded the tolerance.
    pub fn passed(&self) -> bool {
        self.total_exceedances() == 0
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let compared: Vec<&str> = self.compared.iter().map(|s| s.code()).collect();

        let _ = writeln!(out, "============================================================");
        let _ = writeln!(
            out,
            "Comparison: {} vs canonical {}",
            self.test.display(),
            self.canonical.display()
        );
        let _ = writeln!(out, "Relative tolerance: {:e}", self.tolerance);
        let _ = writeln!(out, "Subtypes compared: {}", compared.join(", "));
        let _ = writeln!(out, "Result: {}", if self.passed() { "PASS" } else { "FAIL" });
        let _ = writeln!(out, "Exceedances: {}", self.total_exceedances());

        for (submodel, by_subtype) in &self.exceedances {
            for (subtype, found) in by_subtype {
                let _ = writeln!(
                    out,
                    "\n  {submodel}.{subtype} [{}]: {} exceedances, max |error| {:.3e}",
                    found.units,
                    found.exceedances.len(),
                    found.max_abs_error()
                );
                for e in found.exceedances.iter().take(SUMMARY_ROWS) {
                    let _ = writeln!(
                        out,
                        "    {} @ t={}: {:+.3e}",
                        e.identifier, e.time, e.relative_error
                    );
                }
                if found.exceedances.len() > SUMMARY_ROWS {
                    let _ = writeln!(
                        out,
                        "    ... and {} more",
                        found.exceedances.len() - SUMMARY_ROWS
                    );
                }
            }
        }

        let _ = writeln!(out, "============================================================");
        out
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("{}", self.summary());
    }

    /// Serialize to a JSON string.
    ///
    /// Infinite errors (canonical value of zero) serialize as `"inf"` / `"-inf"`.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exceedance(identifier: &str, col: usize, relative_error: f64) -> Exceedance {
        Exceedance {
            identifier: identifier.into(),
            time: col as f64 * 60.0,
            relative_error,
            row: 0,
            col,
        }
    }

    fn report() -> ComparisonReport {
        ComparisonReport::new(
            "canon.parquet".into(),
            "test.parquet".into(),
            0.01,
            vec!["PL".into(), "TL".into()],
        )
    }

    #[test]
    fn empty_findings_are_not_recorded() {
        let mut r = report();
        r.record("FLOW", &"TL".into(), "K", Vec::new());
        assert!(r.passed());
        assert!(r.exceedances.is_empty());
        assert!(r.summary().contains("Result: PASS"));
    }

    #[test]
    fn subtypes_accumulate_under_their_submodel() {
        let mut r = report();
        r.record("FLOW", &"TL".into(), "K", vec![exceedance("FLOW.1", 1, 0.02)]);
        r.record(
            "FLOW",
            &"PL".into(),
            "Pa",
            vec![exceedance("FLOW.1", 0, -0.5), exceedance("FLOW.3", 2, 0.04)],
        );
        assert_eq!(r.total_exceedances(), 3);
        assert_eq!(r.count("FLOW", &"PL".into()), 2);
        assert_eq!(r.count("FLOW", &"XL".into()), 0);
        assert_eq!(r.get("FLOW", &"PL".into()).unwrap().max_abs_error(), 0.5);
    }

    #[test]
    fn summary_lists_exceedances() {
        let mut r = report();
        r.record("FLOW", &"TL".into(), "K", vec![exceedance("FLOW.7", 2, 0.025)]);
        let text = r.summary();
        assert!(text.contains("Result: FAIL"));
        assert!(text.contains("Subtypes compared: PL, TL"));
        assert!(text.contains("FLOW.TL [K]: 1 exceedances"));
        assert!(text.contains("FLOW.7 @ t=120: +2.500e-2"));
    }

    #[test]
    fn summary_truncates_long_lists() {
        let mut r = report();
        let found = (0..15).map(|c| exceedance("FLOW.1", c, 0.5)).collect();
        r.record("FLOW", &"TL".into(), "K", found);
        assert!(r.summary().contains("... and 5 more"));
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let mut r = report();
        r.record("FLOW", &"TL".into(), "K", vec![exceedance("FLOW.1", 1, 0.02)]);
        let value: serde_json::Value = serde_json::from_str(&r.to_json()).unwrap();
        assert_eq!(value["exceedances"]["FLOW"]["TL"]["units"], "K");
        assert_eq!(
            value["exceedances"]["FLOW"]["TL"]["exceedances"][0]["identifier"],
            "FLOW.1"
        );
        assert_eq!(value["tolerance"], 0.01);
    }

    #[test]
    fn infinite_errors_survive_json() {
        let mut r = report();
        r.record(
            "FLOW",
            &"TL".into(),
            "K",
            vec![
                exceedance("FLOW.1", 0, f64::INFINITY),
                exceedance("FLOW.2", 1, f64::NEG_INFINITY),
                exceedance("FLOW.3", 2, -0.25),
            ],
        );
        let json = r.to_json();
        assert!(json.contains(r#""relative_error": "inf""#));
        assert!(json.contains(r#""relative_error": "-inf""#));

        let back: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.get("FLOW", &"TL".into()).unwrap().errors(),
            vec![f64::INFINITY, f64::NEG_INFINITY, -0.25]
        );
    }

    #[test]
    fn unknown_error_text_is_rejected() {
        let json = r#"{"identifier": "FLOW.1", "time": 0.0, "relative_error": "huge", "row": 0, "col": 0}"#;
        assert!(serde_json::from_str::<Exceedance>(json).is_err());
    }
}
