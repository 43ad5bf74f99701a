/// Data layer: core types, results access, loading and export.
///
/// Architecture:
/// ```text
///  save file (.parquet / .json export)
///        │
///        ▼
///   ┌───────────────┐
///   │ ResultsSource  │  submodel lists, times, per-subtype data wrappers
///   └───────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  resolve thermal/fluid → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │   Dataset     │  subtype → values[item][timestep], ids, units, time
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Arrow table / CSV per subtype
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
pub mod source;
