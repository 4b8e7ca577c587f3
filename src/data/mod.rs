/// Data layer: core types, loading, batch folding and series math.
///
/// Architecture:
/// ```text
///  .csv / .parquet / .json   (one file per run)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Run
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  batch    │  fold run index range → RunCollection (+ missing files)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  series   │  aggregate → AggregateSeries, moving-average smoothing
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pipeline  │  ChartConfig → Chart (styled lines ready to draw)
///   └──────────┘
/// ```

pub mod batch;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod series;
