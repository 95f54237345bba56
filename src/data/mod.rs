/// Data layer: core types, sources, loading, and star selection.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → MemorySource
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  DataSource   │  named columns, one row per star
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  quality cuts → ResultBundle { ids, columns, indices }
///   └──────────┘
/// ```

pub mod columns;
pub mod filter;
pub mod loader;
pub mod model;
pub mod source;
