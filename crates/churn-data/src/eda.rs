//! Exploratory analysis over a [`Dataset`]
//!
//! Each operation returns a typed record whose `Display` form is the text a
//! tool hands back to the reasoning engine.

use churn_core::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::dataset::{Column, DType, Dataset};

/// Column-ordered mapping, serialized as an object in column order
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<V>(pub Vec<(String, V)>);

impl<V> ColumnMap<V> {
    pub fn get(&self, column: &str) -> Option<&V> {
        self.0.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Serialize> Serialize for ColumnMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Shape, types and missing counts of a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub n_rows: usize,
    pub n_cols: usize,
    pub dtypes: ColumnMap<DType>,
    pub missing_per_column: ColumnMap<usize>,
}

impl fmt::Display for Overview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

pub fn basic_overview(dataset: &Dataset) -> Overview {
    Overview {
        n_rows: dataset.n_rows(),
        n_cols: dataset.n_cols(),
        dtypes: ColumnMap(
            dataset
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.dtype()))
                .collect(),
        ),
        missing_per_column: ColumnMap(
            dataset
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.missing_count()))
                .collect(),
        ),
    }
}

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnStats {
    fn from_column(column: &Column) -> Self {
        let mut values: Vec<f64> = (0..column.len())
            .filter_map(|row| column.numeric(row))
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let mean = if count == 0 {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / count as f64
        };
        let std = if count < 2 {
            f64::NAN
        } else {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        Self {
            column: column.name().to_string(),
            count,
            mean,
            std,
            min: values.first().copied().unwrap_or(f64::NAN),
            q25: quantile(&values, 0.25),
            q50: quantile(&values, 0.50),
            q75: quantile(&values, 0.75),
            max: values.last().copied().unwrap_or(f64::NAN),
        }
    }

    fn row(&self) -> [f64; 8] {
        [
            self.count as f64,
            self.mean,
            self.std,
            self.min,
            self.q25,
            self.q50,
            self.q75,
            self.max,
        ]
    }
}

/// Linear-interpolated quantile of already sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

const STAT_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

/// count/mean/std/min/quartiles/max for every numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub columns: Vec<ColumnStats>,
}

impl NumericSummary {
    pub fn get(&self, column: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.column == column)
    }
}

impl fmt::Display for NumericSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.row().iter().map(|v| format_stat(*v)).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&cells)
            .map(|(c, values)| {
                values
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(c.column.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let label_width = STAT_LABELS.iter().map(|l| l.len()).max().unwrap_or(0);

        write!(f, "{:label_width$}", "")?;
        for (c, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", c.column)?;
        }
        for (i, label) in STAT_LABELS.iter().enumerate() {
            write!(f, "\n{:<label_width$}", label)?;
            for (values, width) in cells.iter().zip(&widths) {
                write!(f, "  {:>width$}", values[i])?;
            }
        }
        Ok(())
    }
}

fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{:.6}", value)
    }
}

/// Fails when the dataset has no numeric columns.
pub fn numeric_summary(dataset: &Dataset) -> Result<NumericSummary> {
    let columns: Vec<ColumnStats> = dataset
        .columns()
        .iter()
        .filter(|c| c.is_numeric())
        .map(ColumnStats::from_column)
        .collect();

    if columns.is_empty() {
        return Err(Error::dataset("dataset has no numeric columns to describe"));
    }
    Ok(NumericSummary { columns })
}

/// Frequency of each distinct value in one column, most frequent first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCounts {
    pub column: String,
    pub counts: Vec<(String, usize)>,
}

impl ValueCounts {
    pub fn get(&self, value: &str) -> Option<usize> {
        self.counts
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, n)| *n)
    }
}

impl fmt::Display for ValueCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return write!(f, "Series([], Name: count, dtype: int64)");
        }
        let key_width = self
            .counts
            .iter()
            .map(|(v, _)| v.len())
            .max()
            .unwrap_or(0);
        let count_width = self
            .counts
            .iter()
            .map(|(_, n)| n.to_string().len())
            .max()
            .unwrap_or(0);

        writeln!(f, "{}", self.column)?;
        for (value, count) in &self.counts {
            writeln!(f, "{:<key_width$}    {:>count_width$}", value, count)?;
        }
        write!(f, "Name: count, dtype: int64")
    }
}

/// Counts exclude missing cells; equal counts keep first-appearance order.
pub fn value_counts(dataset: &Dataset, column: &str) -> Result<ValueCounts> {
    let col = dataset.require_column(column)?;

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in 0..col.len() {
        if let Some(label) = col.label(row) {
            let entry = counts.entry(label.clone()).or_insert_with(|| {
                order.push(label);
                0
            });
            *entry += 1;
        }
    }

    let mut ordered: Vec<(String, usize)> = order
        .into_iter()
        .map(|value| {
            let n = counts[&value];
            (value, n)
        })
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(ValueCounts {
        column: column.to_string(),
        counts: ordered,
    })
}
