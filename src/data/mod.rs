/// Data layer: column model, decoders, export, and the source that ties them.
///
/// Architecture:
/// ```text
///  .json / .npy / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  Decoder strategy: file → Columns
///   └──────────┘
///        │
///        ▼
///   ┌──────────────────┐
///   │ ColumnDataSource  │  path + decoder + loaded Columns, weighted mean
///   └──────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Columns → "# x,y" header + %.2f rows
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod model;
pub mod npy;
pub mod source;
