//! Baseline churn model
//!
//! Preprocessing passes numeric columns through and one-hot encodes
//! categorical (`object`/`bool`) columns, then an L2-regularized logistic
//! regression is fitted on a seeded train/test split. The split depends only
//! on the number of usable rows and the seed, so repeated training on the
//! same data yields the same split sizes and the same metrics.

use churn_core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::dataset::{Column, Dataset};

/// Category label used for missing categorical cells
const MISSING_CATEGORY: &str = "NaN";

/// Training parameters
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Fraction of usable rows held out for evaluation
    pub test_size: f64,
    /// Shuffle seed for the split
    pub seed: u64,
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    /// Stop when the largest gradient component falls below this
    pub tolerance: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tolerance: 1e-6,
        }
    }
}

/// Evaluation record returned with the fitted model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
}

impl fmt::Display for ModelMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Numeric passthrough plus one-hot encoding of categorical columns
#[derive(Debug, Clone)]
pub struct Preprocessor {
    numeric: Vec<String>,
    categorical: Vec<(String, Vec<String>)>,
}

impl Preprocessor {
    /// Learn column roles and category sets from training features
    pub fn fit(x: &Dataset) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for column in x.columns() {
            if column.is_numeric() {
                numeric.push(column.name().to_string());
            } else {
                let mut categories: Vec<String> =
                    (0..column.len()).map(|row| category(column, row)).collect();
                categories.sort();
                categories.dedup();
                categorical.push((column.name().to_string(), categories));
            }
        }

        Self {
            numeric,
            categorical,
        }
    }

    pub fn n_features(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|(_, cats)| cats.len())
                .sum::<usize>()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric.clone();
        for (column, categories) in &self.categorical {
            names.extend(categories.iter().map(|c| format!("{}_{}", column, c)));
        }
        names
    }

    /// Encode rows into a dense matrix. Unseen categories encode as all zeros;
    /// missing numeric cells are rejected.
    pub fn transform(&self, x: &Dataset) -> Result<Vec<Vec<f64>>> {
        let numeric: Vec<&Column> = self
            .numeric
            .iter()
            .map(|name| x.require_column(name))
            .collect::<Result<_>>()?;
        let categorical: Vec<(&Column, &Vec<String>)> = self
            .categorical
            .iter()
            .map(|(name, cats)| x.require_column(name).map(|c| (c, cats)))
            .collect::<Result<_>>()?;

        let mut matrix = Vec::with_capacity(x.n_rows());
        for row in 0..x.n_rows() {
            let mut features = Vec::with_capacity(self.n_features());
            for column in &numeric {
                let value = column.numeric(row).ok_or_else(|| {
                    Error::dataset(format!(
                        "missing value in numeric column '{}' at row {}",
                        column.name(),
                        row
                    ))
                })?;
                features.push(value);
            }
            for (column, categories) in &categorical {
                let value = category(column, row);
                features.extend(categories.iter().map(|c| if *c == value { 1.0 } else { 0.0 }));
            }
            matrix.push(features);
        }
        Ok(matrix)
    }
}

fn category(column: &Column, row: usize) -> String {
    column
        .label(row)
        .unwrap_or_else(|| MISSING_CATEGORY.to_string())
}

/// Binary logistic regression fitted by full-batch gradient descent on
/// standardized features
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl LogisticRegression {
    pub fn fit(x: &[Vec<f64>], y: &[u8], config: &TrainConfig) -> Self {
        let n = x.len();
        let d = x.first().map(Vec::len).unwrap_or(0);

        let mut means = vec![0.0; d];
        let mut scales = vec![1.0; d];
        if n > 0 {
            for j in 0..d {
                let mean = x.iter().map(|row| row[j]).sum::<f64>() / n as f64;
                let var = x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n as f64;
                means[j] = mean;
                scales[j] = if var > 0.0 { var.sqrt() } else { 1.0 };
            }
        }

        let xs: Vec<Vec<f64>> = x
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - means[j]) / scales[j])
                    .collect()
            })
            .collect();

        let mut model = Self {
            weights: vec![0.0; d],
            bias: 0.0,
            means,
            scales,
        };
        if n == 0 {
            return model;
        }

        let penalty = 1.0 / (config.c * n as f64);
        let mut iterations = 0;
        for _ in 0..config.max_iter {
            iterations += 1;
            let mut grad_w = vec![0.0; d];
            let mut grad_b = 0.0;
            for (row, &label) in xs.iter().zip(y) {
                let err = sigmoid(model.margin(row)) - f64::from(label);
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }

            let mut largest = (grad_b / n as f64).abs();
            for (j, g) in grad_w.iter_mut().enumerate() {
                *g = *g / n as f64 + penalty * model.weights[j];
                largest = largest.max(g.abs());
            }

            for (w, g) in model.weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * g;
            }
            model.bias -= config.learning_rate * grad_b / n as f64;

            if largest < config.tolerance {
                break;
            }
        }
        debug!(iterations, features = d, "Logistic regression fitted");
        model
    }

    fn margin(&self, standardized: &[f64]) -> f64 {
        self.bias
            + self
                .weights
                .iter()
                .zip(standardized)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    /// Probability of the positive class for one raw feature row
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let standardized: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.means[j]) / self.scales[j])
            .collect();
        sigmoid(self.margin(&standardized))
    }

    pub fn predict(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Fitted preprocessing + classifier
#[derive(Debug, Clone)]
pub struct BaselineModel {
    preprocessor: Preprocessor,
    classifier: LogisticRegression,
    /// Target labels for class 0 and class 1
    classes: [String; 2],
}

impl BaselineModel {
    pub fn classes(&self) -> &[String; 2] {
        &self.classes
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.preprocessor.feature_names()
    }

    /// Predicted target label for every row of `x`
    pub fn predict(&self, x: &Dataset) -> Result<Vec<String>> {
        let matrix = self.preprocessor.transform(x)?;
        Ok(matrix
            .iter()
            .map(|row| self.classes[usize::from(self.classifier.predict(row))].clone())
            .collect())
    }
}

/// Fit the baseline pipeline and evaluate it on the held-out split.
///
/// Rows with a missing target or a missing numeric feature are dropped
/// before splitting. The target must have exactly two distinct values.
pub fn train_baseline(
    x: &Dataset,
    y: &Column,
    config: &TrainConfig,
) -> Result<(BaselineModel, ModelMetrics)> {
    if x.n_rows() != y.len() {
        return Err(Error::dataset(format!(
            "features have {} rows but target has {}",
            x.n_rows(),
            y.len()
        )));
    }

    let usable: Vec<usize> = (0..y.len())
        .filter(|&row| {
            !y.is_missing(row)
                && x.columns()
                    .iter()
                    .filter(|c| c.is_numeric())
                    .all(|c| !c.is_missing(row))
        })
        .collect();
    if usable.len() < 2 {
        return Err(Error::dataset(format!(
            "need at least 2 usable rows to train, found {}",
            usable.len()
        )));
    }

    let classes = binary_classes(y, &usable)?;

    let mut shuffled = usable;
    let mut rng = StdRng::seed_from_u64(config.seed);
    shuffled.shuffle(&mut rng);

    let n = shuffled.len();
    let n_test = (config.test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::dataset(format!(
            "test_size {} leaves an empty split for {} rows",
            config.test_size, n
        )));
    }
    let (test_rows, train_rows) = shuffled.split_at(n_test);

    let x_train = x.select_rows(train_rows);
    let x_test = x.select_rows(test_rows);
    let y_train = encode_target(y, train_rows, &classes);
    let y_test = encode_target(y, test_rows, &classes);

    if y_train.iter().all(|&v| v == y_train[0]) {
        return Err(Error::dataset(
            "training split contains a single class; need samples of both classes",
        ));
    }

    let preprocessor = Preprocessor::fit(&x_train);
    let train_matrix = preprocessor.transform(&x_train)?;
    let test_matrix = preprocessor.transform(&x_test)?;

    let classifier = LogisticRegression::fit(&train_matrix, &y_train, config);

    let correct = test_matrix
        .iter()
        .zip(&y_test)
        .filter(|(row, &label)| classifier.predict(row) == label)
        .count();
    let metrics = ModelMetrics {
        accuracy: correct as f64 / y_test.len() as f64,
        n_train: train_rows.len(),
        n_test: test_rows.len(),
    };

    info!(
        accuracy = metrics.accuracy,
        n_train = metrics.n_train,
        n_test = metrics.n_test,
        features = preprocessor.n_features(),
        "Baseline model trained"
    );

    Ok((
        BaselineModel {
            preprocessor,
            classifier,
            classes,
        },
        metrics,
    ))
}

/// The two target labels in ascending order
fn binary_classes(y: &Column, rows: &[usize]) -> Result<[String; 2]> {
    let mut labels: Vec<(Option<f64>, String)> = rows
        .iter()
        .filter_map(|&row| y.label(row).map(|label| (y.numeric(row), label)))
        .collect();
    labels.sort_by(|a, b| match (a.0, b.0) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        _ => a.1.cmp(&b.1),
    });
    labels.dedup_by(|a, b| a.1 == b.1);

    match labels.as_slice() {
        [(_, negative), (_, positive)] => Ok([negative.clone(), positive.clone()]),
        _ => Err(Error::dataset(format!(
            "target '{}' must have exactly 2 classes, found {}",
            y.name(),
            labels.len()
        ))),
    }
}

fn encode_target(y: &Column, rows: &[usize], classes: &[String; 2]) -> Vec<u8> {
    rows.iter()
        .map(|&row| u8::from(y.label(row).as_deref() == Some(classes[1].as_str())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{clean_and_split, ColumnData};

    const TEN_ROWS: &str = "\
RowNumber,CustomerId,Surname,CreditScore,Geography,Balance,Exited
1,101,A,619,France,0.0,1
2,102,B,608,Spain,83807.86,0
3,103,C,502,France,159660.8,1
4,104,D,699,France,0.0,0
5,105,E,850,Spain,125510.82,0
6,106,F,645,Spain,113755.78,1
7,107,G,822,France,0.0,0
8,108,H,376,Germany,115046.74,1
9,109,I,501,France,142051.07,0
10,110,J,684,France,134603.88,1
";

    fn ten_rows() -> (Dataset, Column) {
        let ds = Dataset::from_reader(TEN_ROWS.as_bytes()).unwrap();
        clean_and_split(&ds, "Exited").unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = ten_rows();
        let (_, metrics) = train_baseline(&x, &y, &TrainConfig::default()).unwrap();
        assert_eq!(metrics.n_test, 2);
        assert_eq!(metrics.n_train, 8);
        assert!((0.0..=1.0).contains(&metrics.accuracy));
    }

    #[test]
    fn test_training_is_deterministic() {
        let (x, y) = ten_rows();
        let config = TrainConfig::default();
        let (_, first) = train_baseline(&x, &y, &config).unwrap();
        let (_, second) = train_baseline(&x, &y, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_separable_data_is_learned() {
        let mut csv = String::from("Balance,Exited\n");
        for i in 0..10 {
            csv.push_str(&format!("{},0\n", i));
            csv.push_str(&format!("{},1\n", 100 + i));
        }
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let (x, y) = clean_and_split(&ds, "Exited").unwrap();
        let (model, metrics) = train_baseline(&x, &y, &TrainConfig::default()).unwrap();

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(model.classes(), &["0".to_string(), "1".to_string()]);
        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions[0], "0");
        assert_eq!(predictions[1], "1");
    }

    #[test]
    fn test_rows_with_missing_values_are_dropped() {
        let csv = "\
Age,City,Exited
30,Paris,0
,Rome,1
40,,1
50,Paris,
60,Rome,0
70,Paris,1
";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let (x, y) = clean_and_split(&ds, "Exited").unwrap();
        let (_, metrics) = train_baseline(&x, &y, &TrainConfig::default()).unwrap();
        // row 2 has no Age, row 4 has no target; the missing City stays
        assert_eq!(metrics.n_train + metrics.n_test, 4);
    }

    #[test]
    fn test_multiclass_target_rejected() {
        let csv = "f,label\n1,a\n2,b\n3,c\n4,a\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let (x, y) = clean_and_split(&ds, "label").unwrap();
        let err = train_baseline(&x, &y, &TrainConfig::default()).unwrap_err();
        assert!(err.to_string().contains("exactly 2 classes"));
    }

    #[test]
    fn test_too_few_rows() {
        let csv = "f,label\n1,0\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let (x, y) = clean_and_split(&ds, "label").unwrap();
        assert!(train_baseline(&x, &y, &TrainConfig::default()).is_err());
    }

    #[test]
    fn test_one_hot_encoding() {
        let train = Dataset::new(vec![
            Column::new("score", ColumnData::Int(vec![1, 2])),
            Column::new(
                "country",
                ColumnData::Text(vec![Some("Spain".into()), Some("France".into())]),
            ),
        ])
        .unwrap();
        let pre = Preprocessor::fit(&train);
        assert_eq!(
            pre.feature_names(),
            vec!["score", "country_France", "country_Spain"]
        );

        let test = Dataset::new(vec![
            Column::new("score", ColumnData::Int(vec![7, 8])),
            Column::new(
                "country",
                ColumnData::Text(vec![Some("Spain".into()), Some("Germany".into())]),
            ),
        ])
        .unwrap();
        let matrix = pre.transform(&test).unwrap();
        assert_eq!(matrix[0], vec![7.0, 0.0, 1.0]);
        assert_eq!(matrix[1], vec![8.0, 0.0, 0.0]);
    }

    #[test]
    fn test_metrics_text() {
        let metrics = ModelMetrics {
            accuracy: 0.5,
            n_train: 8,
            n_test: 2,
        };
        assert_eq!(
            metrics.to_string(),
            "{\"accuracy\":0.5,\"n_train\":8,\"n_test\":2}"
        );
    }
}
