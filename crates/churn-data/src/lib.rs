//! churn-data: Dataset access and deterministic data-science operations
//!
//! - `dataset`: CSV loading, column type inference, feature/target split
//! - `cache`: path-keyed dataset cache with explicit invalidation
//! - `eda`: overview, numeric summary and value counts
//! - `modeling`: baseline logistic-regression pipeline

pub mod cache;
pub mod dataset;
pub mod eda;
pub mod modeling;

pub use cache::{CacheStats, DatasetCache};
pub use dataset::{clean_and_split, Column, ColumnData, DType, Dataset, ID_COLUMNS};
pub use eda::{basic_overview, numeric_summary, value_counts, NumericSummary, Overview, ValueCounts};
pub use modeling::{train_baseline, BaselineModel, ModelMetrics, TrainConfig};
