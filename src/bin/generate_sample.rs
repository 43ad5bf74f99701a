use std::path::Path;

use anyhow::{Context, Result};
use savdiff::{DataSubtype, ExportRecord, ItemKind, ResultsExport};

const THERMAL: &str = "WALL";
const FLUID: &str = "FLOW";
const NODES: usize = 12;
const LUMPS: usize = 8;

/// First-order approach from `start` towards `end` with time constant `tau`.
fn relax(t: f64, start: f64, end: f64, tau: f64) -> f64 {
    end + (start - end) * (-t / tau).exp()
}

fn record(
    submodel: &str,
    kind: ItemKind,
    subtype: &str,
    units: &str,
    n_items: usize,
    times: &[f64],
    value: impl Fn(usize, f64) -> f64,
) -> ExportRecord {
    ExportRecord {
        submodel: submodel.to_string(),
        kind,
        subtype: DataSubtype::new(subtype),
        units: units.to_string(),
        items: (1..=n_items).map(|i| format!("{submodel}.{}", i * 10)).collect(),
        values: (0..n_items)
            .map(|i| times.iter().map(|&t| value(i, t)).collect())
            .collect(),
    }
}

/// A melt/frost transient: a wall warming up and a fluid loop whose lumps
/// pass from frozen to fully melted.
fn melt_frost(times: &[f64]) -> ResultsExport {
    let records = vec![
        record(THERMAL, ItemKind::Node, "T", "K", NODES, times, |i, t| {
            relax(t, 250.0 + i as f64, 290.0 + 0.5 * i as f64, 900.0)
        }),
        record(THERMAL, ItemKind::Node, "Q", "W", NODES, times, |i, t| {
            40.0 * (-t / 900.0).exp() + i as f64
        }),
        record(FLUID, ItemKind::Lump, "TL", "K", LUMPS, times, |i, t| {
            relax(t, 260.0 + 2.0 * i as f64, 300.0 + i as f64, 1200.0)
        }),
        record(FLUID, ItemKind::Lump, "PL", "Pa", LUMPS, times, |i, t| {
            1.0e5 + 5.0e3 * (1.0 - i as f64 / LUMPS as f64) + 10.0 * (t / 600.0).sin()
        }),
        record(FLUID, ItemKind::Lump, "XL", "-", LUMPS, times, |i, t| {
            (t / 3600.0 + 0.05 * i as f64).clamp(0.01, 1.0)
        }),
        record(FLUID, ItemKind::Lump, "AL", "-", LUMPS, times, |i, t| {
            (0.2 + t / 4000.0 + 0.02 * i as f64).clamp(0.01, 1.0)
        }),
    ];

    ResultsExport {
        times: times.to_vec(),
        thermal_submodels: vec![THERMAL.to_string()],
        fluid_submodels: vec![FLUID.to_string()],
        records,
    }
}

/// Relative jitter in [-1e-7, 1e-7], fixed per cell so reruns write the same files.
fn jitter(row: usize, col: usize) -> f64 {
    1e-7 * ((row * 31 + col * 17) as f64).sin()
}

/// Copy of `canon` with relative jitter everywhere and a drift in one lump.
fn perturb(canon: &ResultsExport) -> ResultsExport {
    let mut test = canon.clone();
    for record in &mut test.records {
        let drifting = record.submodel == FLUID && record.subtype.code() == "TL";
        for (row, values) in record.values.iter_mut().enumerate() {
            for (col, v) in values.iter_mut().enumerate() {
                *v *= 1.0 + jitter(row, col);
                // Lump 3 runs 3% hot in the second half of the transient.
                if drifting && row == 2 && canon.times[col] > 1800.0 {
                    *v *= 1.03;
                }
            }
        }
    }
    test
}

fn write_pair(export: &ResultsExport, dir: &Path, stem: &str) -> Result<()> {
    export.write_parquet(&dir.join(format!("{stem}.parquet")))?;
    export.write_json(&dir.join(format!("{stem}.json")))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = Path::new("dummy_results");
    std::fs::create_dir_all(dir).context("creating dummy_results")?;

    // One record per minute over an hour.
    let times: Vec<f64> = (0..=60).map(|i| i as f64 * 60.0).collect();

    let canon = melt_frost(&times);
    let test = perturb(&canon);

    write_pair(&canon, dir, "melt_frost_canon")?;
    write_pair(&test, dir, "melt_frost_test")?;

    println!(
        "Wrote canonical and test save files ({} records, {} timesteps) to {}",
        canon.records.len(),
        times.len(),
        dir.display()
    );
    Ok(())
}
