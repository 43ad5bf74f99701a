use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{DataSubtype, Dataset, ItemKind, SubmodelKind, SubtypeData};
use super::source::{ExportRecord, ResultsExport, ResultsSource};
use crate::error::LoadError;

/// Schema metadata keys of a Parquet results export.
pub const META_TIMES: &str = "savdiff.times";
pub const META_THERMAL: &str = "savdiff.thermal_submodels";
pub const META_FLUID: &str = "savdiff.fluid_submodels";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load one submodel of a save file.
///
/// An empty `subtypes` list loads every subtype the file offers for the
/// submodel.
pub fn load_dataset(
    path: &Path,
    is_canonical: bool,
    submodel: &str,
    subtypes: &[DataSubtype],
) -> Result<Dataset> {
    let source = open_save_file(path)
        .with_context(|| format!("opening save file {}", path.display()))?;
    let dataset = load_from_source(&source, path, is_canonical, submodel, subtypes)
        .with_context(|| format!("loading {submodel} from {}", path.display()))?;
    Ok(dataset)
}

/// Open a save file export.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – one row per item and subtype (recommended)
/// * `.json`            – the [`ResultsExport`] document
pub fn open_save_file(path: &Path) -> Result<ResultsExport> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported save file extension: .{other}"),
    }
}

/// Decide whether `submodel` is thermal or fluid.
///
/// Thermal membership wins when a name appears in both lists.
pub fn resolve_submodel(
    source: &dyn ResultsSource,
    submodel: &str,
) -> Result<SubmodelKind, LoadError> {
    let thermal = source.thermal_submodels();
    let fluid = source.fluid_submodels();

    if thermal.iter().any(|s| s == submodel) {
        Ok(SubmodelKind::Thermal)
    } else if fluid.iter().any(|s| s == submodel) {
        Ok(SubmodelKind::Fluid)
    } else {
        Err(LoadError::UnknownSubmodel {
            submodel: submodel.to_string(),
            thermal: thermal.to_vec(),
            fluid: fluid.to_vec(),
        })
    }
}

/// Pull the requested subtypes of `submodel` out of an opened source.
pub fn load_from_source(
    source: &dyn ResultsSource,
    path: &Path,
    is_canonical: bool,
    submodel: &str,
    subtypes: &[DataSubtype],
) -> Result<Dataset, LoadError> {
    let kind = resolve_submodel(source, submodel)?;
    let item_kind = kind.item_kind();

    let requested: Vec<DataSubtype> = if subtypes.is_empty() {
        let available = source.subtypes(item_kind, submodel);
        if available.is_empty() {
            return Err(LoadError::NoSubtypes(submodel.to_string()));
        }
        log::debug!("{submodel}: loading all subtypes {available:?}");
        available
    } else {
        subtypes.to_vec()
    };

    let time = source.times().to_vec();
    let mut data = BTreeMap::new();

    for subtype in requested {
        if data.contains_key(&subtype) {
            log::debug!("{submodel}: {subtype} requested twice, loading once");
            continue;
        }
        if !subtype.fits(item_kind) {
            log::warn!("{submodel}: {subtype} is not usually a {item_kind} quantity");
        }

        let wrapper = source.get_data(item_kind, submodel, &subtype)?;
        let subtype_data = SubtypeData {
            submodel: submodel.to_string(),
            subtype: subtype.clone(),
            values: wrapper.values,
            identifiers: wrapper.identifiers,
            units: wrapper.units,
            time: time.clone(),
        };
        subtype_data.validate()?;

        log::debug!(
            "{submodel}.{subtype}: {} items x {} timesteps [{}]",
            subtype_data.identifiers.len(),
            subtype_data.time.len(),
            subtype_data.units
        );
        data.insert(subtype, subtype_data);
    }

    log::info!(
        "Loaded {} subtypes of {kind} submodel {submodel} from {}",
        data.len(),
        path.display()
    );

    Ok(Dataset {
        path: path.to_path_buf(),
        is_canonical,
        submodel: submodel.to_string(),
        kind,
        data,
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema:
///
/// ```json
/// {
///   "times": [0.0, 60.0, ...],
///   "thermal_submodels": ["WALL"],
///   "fluid_submodels": ["FLOW"],
///   "records": [
///     {
///       "submodel": "FLOW", "kind": "lump", "subtype": "TL", "units": "K",
///       "items": ["FLOW.1", ...],
///       "values": [[300.0, 301.2, ...], ...]
///     }
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<ResultsExport> {
    let file = std::fs::File::open(path).context("opening JSON file")?;
    let reader = std::io::BufReader::new(file);
    let export: ResultsExport = serde_json::from_reader(reader).context("parsing JSON")?;
    Ok(export)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet results export.
///
/// Expected schema, one row per (submodel, subtype, item):
/// - `submodel`, `kind`, `subtype`, `units`, `item`: Utf8
/// - `values`: List<Float64> or LargeList<Float64>, one entry per timestep
///
/// The time vector and submodel lists are JSON arrays stored in the schema
/// metadata under [`META_TIMES`], [`META_THERMAL`] and [`META_FLUID`].
fn load_parquet(path: &Path) -> Result<ResultsExport> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;

    let metadata = builder.schema().metadata().clone();
    let times: Vec<f64> = metadata_json(&metadata, META_TIMES)?;
    let thermal_submodels: Vec<String> = metadata_json(&metadata, META_THERMAL)?;
    let fluid_submodels: Vec<String> = metadata_json(&metadata, META_FLUID)?;

    let reader = builder.build().context("building parquet reader")?;

    // Rows of the same (submodel, kind, subtype) are gathered into one record,
    // keeping first-seen order.
    let mut records: Vec<ExportRecord> = Vec::new();
    let mut index: HashMap<(String, ItemKind, DataSubtype), usize> = HashMap::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let submodel_col = string_column(&batch, "submodel")?;
        let kind_col = string_column(&batch, "kind")?;
        let subtype_col = string_column(&batch, "subtype")?;
        let units_col = string_column(&batch, "units")?;
        let item_col = string_column(&batch, "item")?;
        let values_idx = batch
            .schema()
            .index_of("values")
            .map_err(|_| anyhow::anyhow!("Parquet file missing 'values' column"))?;
        let values_col = batch.column(values_idx);

        for row in 0..batch.num_rows() {
            let submodel = submodel_col.value(row).to_string();
            let kind = ItemKind::parse(kind_col.value(row))
                .with_context(|| format!("Row {row}: unknown item kind '{}'", kind_col.value(row)))?;
            let subtype = DataSubtype::new(subtype_col.value(row));
            let values = extract_f64_list(values_col, row)
                .with_context(|| format!("Row {row}: failed to read 'values'"))?;

            let key = (submodel.clone(), kind, subtype.clone());
            let slot = *index.entry(key).or_insert_with(|| {
                records.push(ExportRecord {
                    submodel,
                    kind,
                    subtype,
                    units: units_col.value(row).to_string(),
                    items: Vec::new(),
                    values: Vec::new(),
                });
                records.len() - 1
            });

            let record = &mut records[slot];
            record.items.push(item_col.value(row).to_string());
            record.values.push(values);
        }
    }

    Ok(ResultsExport {
        times,
        thermal_submodels,
        fluid_submodels,
        records,
    })
}

// -- Parquet / Arrow helpers --

fn metadata_json<T: serde::de::DeserializeOwned>(
    metadata: &HashMap<String, String>,
    key: &str,
) -> Result<T> {
    let raw = metadata
        .get(key)
        .with_context(|| format!("Parquet schema metadata missing '{key}'"))?;
    serde_json::from_str(raw).with_context(|| format!("parsing '{key}' metadata"))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("'{name}' column is not Utf8"))
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // Missing entries become NaN so they never count as exceedances.
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(submodel: &str, kind: ItemKind, subtype: &str, values: Vec<Vec<f64>>) -> ExportRecord {
        ExportRecord {
            submodel: submodel.into(),
            kind,
            subtype: subtype.into(),
            units: "SI".into(),
            items: (1..=values.len()).map(|i| format!("{submodel}.{i}")).collect(),
            values,
        }
    }

    fn source() -> ResultsExport {
        ResultsExport {
            times: vec![0.0, 60.0],
            thermal_submodels: vec!["WALL".into(), "SHARED".into()],
            fluid_submodels: vec!["FLOW".into(), "SHARED".into()],
            records: vec![
                record("WALL", ItemKind::Node, "T", vec![vec![290.0, 291.0]]),
                record("FLOW", ItemKind::Lump, "TL", vec![vec![300.0, 301.0], vec![302.0, 303.0]]),
                record("FLOW", ItemKind::Lump, "PL", vec![vec![1e5, 1e5], vec![2e5, 2e5]]),
                record("SHARED", ItemKind::Node, "T", vec![vec![1.0, 2.0]]),
            ],
        }
    }

    fn path() -> PathBuf {
        PathBuf::from("run.json")
    }

    #[test]
    fn resolves_thermal_and_fluid() {
        let src = source();
        assert_eq!(resolve_submodel(&src, "WALL").unwrap(), SubmodelKind::Thermal);
        assert_eq!(resolve_submodel(&src, "FLOW").unwrap(), SubmodelKind::Fluid);
        assert_eq!(resolve_submodel(&src, "SHARED").unwrap(), SubmodelKind::Thermal);
    }

    #[test]
    fn unknown_submodel_lists_valid_names() {
        let err = resolve_submodel(&source(), "NOPE").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("NOPE is neither a thermal nor fluid submodel"));
        assert!(msg.contains(r#"thermal submodels: ["WALL", "SHARED"]"#));
        assert!(msg.contains(r#"fluid submodels: ["FLOW", "SHARED"]"#));
    }

    #[test]
    fn loads_requested_subtypes() {
        let ds = load_from_source(&source(), &path(), true, "FLOW", &["TL".into()]).unwrap();
        assert_eq!(ds.kind, SubmodelKind::Fluid);
        assert!(ds.is_canonical);
        assert_eq!(ds.len(), 1);
        let tl = ds.get(&"TL".into()).unwrap();
        assert_eq!(tl.identifiers, vec!["FLOW.1", "FLOW.2"]);
        assert_eq!(tl.time, vec![0.0, 60.0]);
        assert_eq!(tl.units, "SI");
        assert_eq!(tl.submodel, "FLOW");
    }

    #[test]
    fn empty_request_loads_everything() {
        let ds = load_from_source(&source(), &path(), false, "FLOW", &[]).unwrap();
        let codes: Vec<String> = ds.subtypes().iter().map(|s| s.to_string()).collect();
        assert_eq!(codes, ["PL", "TL"]);
        assert_eq!(ds.time(), &[0.0, 60.0]);
    }

    #[test]
    fn duplicate_requests_load_once() {
        let ds =
            load_from_source(&source(), &path(), false, "FLOW", &["tl".into(), "TL".into()]).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn missing_subtype_is_an_error() {
        let err = load_from_source(&source(), &path(), false, "WALL", &["Q".into()]).unwrap_err();
        assert!(matches!(err, LoadError::SubtypeUnavailable { .. }));
    }

    #[test]
    fn ragged_values_are_rejected() {
        let mut src = source();
        src.records[1].values[0].push(999.0);
        let err = load_from_source(&src, &path(), false, "FLOW", &["TL".into()]).unwrap_err();
        assert!(matches!(err, LoadError::Shape { .. }));
    }

    #[test]
    fn unsupported_extension() {
        let err = open_save_file(Path::new("melt_frost.sav")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported save file extension: .sav");
    }

    #[test]
    fn off_kind_subtype_is_still_asked_for() {
        let mut src = source();
        src.records.push(record("FLOW", ItemKind::Lump, "T", vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
        assert!(!DataSubtype::new("T").fits(ItemKind::Lump));

        let ds = load_from_source(&src, &path(), false, "FLOW", &["T".into()]).unwrap();
        assert_eq!(ds.get(&"T".into()).unwrap().values[1], vec![3.0, 4.0]);

        let err = load_from_source(&source(), &path(), false, "FLOW", &["T".into()]).unwrap_err();
        assert!(matches!(err, LoadError::SubtypeUnavailable { .. }));
    }
}
