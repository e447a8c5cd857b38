//! Dataset Access
//!
//! Loads a CSV file into typed columns and splits it into features and target
//! for modeling. Column types are inferred per column the way a dataframe
//! reader does it: integers, floats (with missing values), booleans, and
//! everything else as `object` text.

use churn_core::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Identifier columns dropped before modeling
pub const ID_COLUMNS: &[&str] = &["RowNumber", "CustomerId", "Surname"];

/// Cell contents treated as missing values
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Inferred column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int64,
    Float64,
    Bool,
    Object,
}

impl DType {
    pub fn is_numeric(self) -> bool {
        matches!(self, DType::Int64 | DType::Float64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Int64 => write!(f, "int64"),
            DType::Float64 => write!(f, "float64"),
            DType::Bool => write!(f, "bool"),
            DType::Object => write!(f, "object"),
        }
    }
}

/// Typed column storage. Integer and boolean columns never hold missing
/// values; a missing cell demotes the column to `Float` or `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i64>),
    Float(Vec<Option<f64>>),
    Bool(Vec<bool>),
    Text(Vec<Option<String>>),
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Build a column from raw cells, inferring its type.
    pub fn infer(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let name = name.into();
        let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
        let has_missing = present.len() < cells.len();

        if cells.is_empty() {
            return Self::new(name, ColumnData::Text(cells));
        }

        if !has_missing {
            if let Some(ints) = present
                .iter()
                .map(|v| v.parse::<i64>().ok())
                .collect::<Option<Vec<_>>>()
            {
                return Self::new(name, ColumnData::Int(ints));
            }
        }

        let floats: Option<Vec<Option<f64>>> = cells
            .iter()
            .map(|cell| match cell {
                Some(v) => v.parse::<f64>().ok().map(Some),
                None => Some(None),
            })
            .collect();
        if let Some(floats) = floats {
            return Self::new(name, ColumnData::Float(floats));
        }

        if !has_missing {
            if let Some(bools) = present
                .iter()
                .map(|v| parse_bool(v))
                .collect::<Option<Vec<_>>>()
            {
                return Self::new(name, ColumnData::Bool(bools));
            }
        }

        Self::new(name, ColumnData::Text(cells))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        match self.data {
            ColumnData::Int(_) => DType::Int64,
            ColumnData::Float(_) => DType::Float64,
            ColumnData::Bool(_) => DType::Bool,
            ColumnData::Text(_) => DType::Object,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.dtype().is_numeric()
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Int(_) | ColumnData::Bool(_) => false,
            ColumnData::Float(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    /// Numeric value of a cell, `None` for missing or non-numeric cells
    pub fn numeric(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Int(v) => Some(v[row] as f64),
            ColumnData::Float(v) => v[row],
            ColumnData::Bool(_) | ColumnData::Text(_) => None,
        }
    }

    /// Display form of a cell, `None` when missing
    pub fn label(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Int(v) => Some(v[row].to_string()),
            ColumnData::Float(v) => v[row].map(format_float),
            ColumnData::Bool(v) => Some(if v[row] { "True" } else { "False" }.to_string()),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    /// Copy of the column restricted to `rows`, in that order
    pub fn select(&self, rows: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Int(v) => ColumnData::Int(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Bool(v) => ColumnData::Bool(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        };
        Column::new(self.name.clone(), data)
    }
}

/// An in-memory table of equally long columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from columns of equal length
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(Error::dataset(format!(
                "column '{}' has {} rows, expected {}",
                bad.name(),
                bad.len(),
                n_rows
            )));
        }
        Ok(Self { columns, n_rows })
    }

    /// Load a CSV file whose first row is a header
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::dataset(format!("cannot open {}: {}", path.display(), e))
        })?;
        let dataset = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            rows = dataset.n_rows(),
            cols = dataset.n_cols(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV text from any reader. Ragged rows are an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Err(Error::dataset("No columns to parse from file"));
        }
        let names = column_names(headers.iter());

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for record in rdr.records() {
            let record = record?;
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(parse_cell(field));
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| Column::infer(name, cells))
            .collect();
        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Like [`Dataset::column`] but fails with `ColumnNotFound`
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Copy without the named columns; names that are absent are ignored
    pub fn drop_columns(&self, names: &[&str]) -> Dataset {
        Dataset {
            columns: self
                .columns
                .iter()
                .filter(|c| !names.contains(&c.name()))
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Copy restricted to `rows`, in that order
    pub fn select_rows(&self, rows: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.iter().map(|c| c.select(rows)).collect(),
            n_rows: rows.len(),
        }
    }
}

/// Drop identifier columns and split into features and target.
pub fn clean_and_split(dataset: &Dataset, target: &str) -> Result<(Dataset, Column)> {
    let cleaned = dataset.drop_columns(ID_COLUMNS);
    let y = cleaned.require_column(target)?.clone();
    let x = cleaned.drop_columns(&[target]);
    Ok((x, y))
}

/// Render a float the way a dataframe prints it: integral values keep a `.0`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn parse_cell(field: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&field) {
        None
    } else {
        Some(field.to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Header names with blanks filled in and duplicates suffixed (`a`, `a.1`).
fn column_names<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .enumerate()
        .map(|(i, raw)| {
            let base = if raw.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                raw.to_string()
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            name
        })
        .collect()
}
