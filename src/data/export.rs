use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::loader::{META_FLUID, META_THERMAL, META_TIMES};
use super::model::SubtypeData;
use super::source::ResultsExport;

// ---------------------------------------------------------------------------
// Results exports
// ---------------------------------------------------------------------------

impl ResultsExport {
    /// Write the export as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).context("writing JSON export")?;
        Ok(())
    }

    /// Write the export as Parquet, one row per (submodel, subtype, item).
    pub fn write_parquet(&self, path: &Path) -> Result<()> {
        let mut submodels = Vec::new();
        let mut kinds = Vec::new();
        let mut subtypes = Vec::new();
        let mut units = Vec::new();
        let mut items = Vec::new();
        let mut values_builder = ListBuilder::new(Float64Builder::new());

        for record in &self.records {
            if record.items.len() != record.values.len() {
                bail!(
                    "{}.{}: {} items but {} value rows",
                    record.submodel,
                    record.subtype,
                    record.items.len(),
                    record.values.len()
                );
            }
            if let Some((item, row)) = record
                .items
                .iter()
                .zip(&record.values)
                .find(|(_, row)| row.len() != self.times.len())
            {
                bail!(
                    "{}.{}: {item} has {} values but there are {} timesteps",
                    record.submodel,
                    record.subtype,
                    row.len(),
                    self.times.len()
                );
            }
            for (item, row) in record.items.iter().zip(&record.values) {
                submodels.push(record.submodel.as_str());
                kinds.push(record.kind.as_str());
                subtypes.push(record.subtype.code());
                units.push(record.units.as_str());
                items.push(item.as_str());

                let values = values_builder.values();
                for &v in row {
                    values.append_value(v);
                }
                values_builder.append(true);
            }
        }

        let metadata: HashMap<String, String> = HashMap::from([
            (META_TIMES.to_string(), serde_json::to_string(&self.times)?),
            (
                META_THERMAL.to_string(),
                serde_json::to_string(&self.thermal_submodels)?,
            ),
            (
                META_FLUID.to_string(),
                serde_json::to_string(&self.fluid_submodels)?,
            ),
        ]);

        let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
        let schema = Arc::new(
            Schema::new(vec![
                Field::new("submodel", DataType::Utf8, false),
                Field::new("kind", DataType::Utf8, false),
                Field::new("subtype", DataType::Utf8, false),
                Field::new("units", DataType::Utf8, false),
                Field::new("item", DataType::Utf8, false),
                Field::new("values", list_type, false),
            ])
            .with_metadata(metadata),
        );

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(submodels)),
            Arc::new(StringArray::from(kinds)),
            Arc::new(StringArray::from(subtypes)),
            Arc::new(StringArray::from(units)),
            Arc::new(StringArray::from(items)),
            Arc::new(values_builder.finish()),
        ];
        let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer =
            ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
        writer.write(&batch).context("writing parquet batch")?;
        writer.close().context("closing parquet writer")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Per-subtype tables
// ---------------------------------------------------------------------------

impl SubtypeData {
    /// Table view: an `item` column followed by one column per timestep,
    /// named after the time value.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        self.validate()?;

        let mut fields = vec![Field::new("item", DataType::Utf8, false)];
        let mut columns: Vec<ArrayRef> = vec![Arc::new(StringArray::from(self.identifiers.clone()))];

        for (col, t) in self.time.iter().enumerate() {
            fields.push(Field::new(t.to_string(), DataType::Float64, false));
            let column: Vec<f64> = self.values.iter().map(|row| row[col]).collect();
            columns.push(Arc::new(Float64Array::from(column)));
        }

        let schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new(schema, columns)
            .with_context(|| format!("building table for {}.{}", self.submodel, self.subtype))
    }

    /// Render the table view as an ASCII grid for the terminal.
    pub fn pretty_table(&self) -> Result<String> {
        let batch = self.to_record_batch()?;
        let table = arrow::util::pretty::pretty_format_batches(&[batch])
            .with_context(|| format!("formatting {}.{}", self.submodel, self.subtype))?;
        Ok(table.to_string())
    }

    /// Write the table view as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        self.validate()?;

        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["item".to_string()];
        header.extend(self.time.iter().map(|t| t.to_string()));
        wtr.write_record(&header).context("writing CSV header")?;

        for (id, row) in self.identifiers.iter().zip(&self.values) {
            let mut record = vec![id.clone()];
            record.extend(row.iter().map(|v| v.to_string()));
            wtr.write_record(&record)
                .with_context(|| format!("writing CSV row {id}"))?;
        }
        wtr.flush().context("flushing CSV")?;
        Ok(())
    }

    /// Write the table view as CSV to `path`.
    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        self.write_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{DataSubtype, ItemKind};
    use crate::data::source::ExportRecord;

    fn table() -> SubtypeData {
        SubtypeData {
            submodel: "WALL".into(),
            subtype: DataSubtype::new("T"),
            values: vec![vec![290.0, 291.5], vec![300.0, 300.25]],
            identifiers: vec!["WALL.10".into(), "WALL.20".into()],
            units: "K".into(),
            time: vec![0.0, 60.0],
        }
    }

    #[test]
    fn record_batch_has_item_index_and_time_columns() {
        let batch = table().to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);

        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ["item", "0", "60"]);

        let at_60 = batch
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(at_60.value(1), 300.25);
    }

    #[test]
    fn csv_table_layout() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "item,0,60\nWALL.10,290,291.5\nWALL.20,300,300.25\n");
    }

    #[test]
    fn malformed_table_is_rejected() {
        let mut data = table();
        data.values[0].pop();
        assert!(data.to_record_batch().is_err());
        assert!(data.write_csv(Vec::new()).is_err());
    }

    #[test]
    fn pretty_table_shows_items_and_values() {
        let text = table().pretty_table().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].contains("item") && lines[1].contains("60"));
        assert!(text.contains("WALL.20"));
        assert!(text.contains("300.25"));
        assert_eq!(lines.len(), 6);
    }

    fn export(values: Vec<Vec<f64>>) -> ResultsExport {
        ResultsExport {
            times: vec![0.0, 60.0],
            thermal_submodels: vec!["WALL".into()],
            fluid_submodels: Vec::new(),
            records: vec![ExportRecord {
                submodel: "WALL".into(),
                kind: ItemKind::Node,
                subtype: DataSubtype::new("T"),
                units: "K".into(),
                items: vec!["WALL.10".into(), "WALL.20".into()],
                values,
            }],
        }
    }

    #[test]
    fn parquet_export_refuses_ragged_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.parquet");

        let err = export(vec![vec![290.0, 291.0]]).write_parquet(&path).unwrap_err();
        assert!(err.to_string().contains("WALL.T: 2 items but 1 value rows"));

        let err = export(vec![vec![290.0, 291.0], vec![300.0]])
            .write_parquet(&path)
            .unwrap_err();
        assert!(err.to_string().contains("WALL.20 has 1 values but there are 2 timesteps"));
        assert!(!path.exists());

        export(vec![vec![290.0, 291.0], vec![300.0, 301.0]])
            .write_parquet(&path)
            .unwrap();
        assert!(path.exists());
    }
}
