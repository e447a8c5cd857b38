//! Built-in dataset tools
//!
//! The four tools the agent sees, in catalog order: `basic_overview`,
//! `numeric_summary`, `value_counts`, `train_baseline`. Each loads the
//! configured CSV through the shared [`DatasetCache`] on the blocking pool
//! and renders its result as text.

use async_trait::async_trait;
use churn_core::{Error, Result};
use churn_data::{
    basic_overview, clean_and_split, numeric_summary, train_baseline, value_counts, Dataset,
    DatasetCache, TrainConfig,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::registry::ToolRegistry;
use crate::tool::{ArgSpec, Tool, ToolArgs};

/// Where the data tools read from
#[derive(Clone)]
pub struct DataContext {
    cache: Arc<DatasetCache>,
    data_path: PathBuf,
    target: String,
    train: TrainConfig,
}

impl DataContext {
    pub fn new(
        cache: Arc<DatasetCache>,
        data_path: impl Into<PathBuf>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            data_path: data_path.into(),
            target: target.into(),
            train: TrainConfig::default(),
        }
    }

    pub fn with_train_config(mut self, train: TrainConfig) -> Self {
        self.train = train;
        self
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Forget the cached copy of the dataset
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(&self.data_path)
    }

    /// Load the dataset and run `op` on the blocking pool
    async fn with_dataset<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Dataset) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.cache.clone();
        let path = self.data_path.clone();
        tokio::task::spawn_blocking(move || {
            let dataset = cache.load(&path)?;
            op(&dataset)
        })
        .await
        .map_err(|e| Error::internal(format!("dataset task failed: {}", e)))?
    }
}

/// Structural overview: rows, columns, dtypes, missing counts
pub struct BasicOverviewTool {
    ctx: DataContext,
}

#[async_trait]
impl Tool for BasicOverviewTool {
    fn name(&self) -> &str {
        "basic_overview"
    }

    fn description(&self) -> &str {
        "Get a basic overview of the fintech dataset (rows, cols, dtypes, missing)."
    }

    async fn execute(&self, _args: ToolArgs) -> Result<String> {
        self.ctx
            .with_dataset(|ds| Ok(basic_overview(ds).to_string()))
            .await
    }
}

/// describe()-style table of the numeric columns
pub struct NumericSummaryTool {
    ctx: DataContext,
}

#[async_trait]
impl Tool for NumericSummaryTool {
    fn name(&self) -> &str {
        "numeric_summary"
    }

    fn description(&self) -> &str {
        "Get numeric summary statistics (describe()) for the fintech dataset."
    }

    async fn execute(&self, _args: ToolArgs) -> Result<String> {
        self.ctx
            .with_dataset(|ds| numeric_summary(ds).map(|s| s.to_string()))
            .await
    }
}

/// Frequency table of one column
pub struct ValueCountsTool {
    ctx: DataContext,
}

#[async_trait]
impl Tool for ValueCountsTool {
    fn name(&self) -> &str {
        "value_counts"
    }

    fn description(&self) -> &str {
        "Get value counts for a given column in the dataset. Input: column name as a string."
    }

    fn arg_spec(&self) -> ArgSpec {
        ArgSpec::text("column")
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        let column = args.require_text(self.name())?.to_string();
        self.ctx
            .with_dataset(move |ds| value_counts(ds, &column).map(|c| c.to_string()))
            .await
    }
}

/// Fits the baseline pipeline and reports its metrics
pub struct TrainBaselineTool {
    ctx: DataContext,
}

#[async_trait]
impl Tool for TrainBaselineTool {
    fn name(&self) -> &str {
        "train_baseline"
    }

    fn description(&self) -> &str {
        "Train a logistic regression churn model on label 'Exited' and return metrics. \
         Use this when the user asks for model accuracy. After calling this tool once, \
         use the accuracy in the observation to answer the question; do NOT call it again."
    }

    fn max_calls_per_turn(&self) -> Option<u32> {
        Some(1)
    }

    async fn execute(&self, _args: ToolArgs) -> Result<String> {
        let target = self.ctx.target.clone();
        let config = self.ctx.train.clone();
        let metrics = self
            .ctx
            .with_dataset(move |ds| {
                let (x, y) = clean_and_split(ds, &target)?;
                train_baseline(&x, &y, &config).map(|(_, metrics)| metrics)
            })
            .await?;
        Ok(metrics.to_string())
    }
}

/// Register the four dataset tools in catalog order
pub async fn register_data_tools(registry: &ToolRegistry, ctx: DataContext) -> Result<()> {
    registry
        .register(Arc::new(BasicOverviewTool { ctx: ctx.clone() }))
        .await?;
    registry
        .register(Arc::new(NumericSummaryTool { ctx: ctx.clone() }))
        .await?;
    registry
        .register(Arc::new(ValueCountsTool { ctx: ctx.clone() }))
        .await?;
    registry
        .register(Arc::new(TrainBaselineTool { ctx: ctx.clone() }))
        .await?;

    info!(
        path = %ctx.data_path().display(),
        target = %ctx.target(),
        "Registered dataset tools"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CHURN_CSV: &str = "\
RowNumber,CustomerId,Surname,CreditScore,Geography,Age,Balance,Exited
1,15634602,Hargrave,619,France,42,0.0,1
2,15647311,Hill,608,Spain,41,83807.86,0
3,15619304,Onio,502,France,42,159660.8,1
4,15701354,Boni,699,France,39,0.0,0
5,15737888,Mitchell,850,Spain,43,125510.82,0
6,15574012,Chu,645,Spain,44,113755.78,1
7,15592531,Bartlett,822,France,50,0.0,0
8,15656148,Obinna,376,Germany,29,115046.74,1
9,15792365,He,501,France,44,142051.07,0
10,15592389,H?,684,France,27,134603.88,1
";

    async fn setup() -> (tempfile::TempDir, ToolRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fintech.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(CHURN_CSV.as_bytes()).unwrap();

        let registry = ToolRegistry::new();
        let ctx = DataContext::new(Arc::new(DatasetCache::new(4)), &path, "Exited");
        register_data_tools(&registry, ctx).await.unwrap();
        (dir, registry)
    }

    #[tokio::test]
    async fn test_catalog_order() {
        let (_dir, registry) = setup().await;
        assert_eq!(
            registry.names().await,
            vec![
                "basic_overview",
                "numeric_summary",
                "value_counts",
                "train_baseline"
            ]
        );
    }

    #[tokio::test]
    async fn test_basic_overview() {
        let (_dir, registry) = setup().await;
        let observation = registry.dispatch("basic_overview", "").await;
        let value: serde_json::Value = serde_json::from_str(&observation).unwrap();
        assert_eq!(value["n_rows"], 10);
        assert_eq!(value["n_cols"], 8);
        assert_eq!(value["dtypes"]["Geography"], "object");
        assert_eq!(value["missing_per_column"]["Balance"], 0);
    }

    #[tokio::test]
    async fn test_numeric_summary() {
        let (_dir, registry) = setup().await;
        let observation = registry.dispatch("numeric_summary", "").await;
        assert!(observation.contains("CreditScore"));
        assert!(observation.contains("25%"));
        assert!(!observation.contains("Geography"));
    }

    #[tokio::test]
    async fn test_value_counts() {
        let (_dir, registry) = setup().await;
        let observation = registry.dispatch("value_counts", "\"Geography\"").await;
        let lines: Vec<&str> = observation.lines().collect();
        assert_eq!(lines[0], "Geography");
        assert!(lines[1].starts_with("France"));
        assert!(lines[1].ends_with('6'));
        assert!(lines[2].starts_with("Spain"));
        assert!(lines[3].starts_with("Germany"));
    }

    #[tokio::test]
    async fn test_value_counts_missing_column() {
        let (_dir, registry) = setup().await;
        let observation = registry.dispatch("value_counts", "Country").await;
        assert_eq!(
            observation,
            "Error: value_counts failed: Column 'Country' not in dataframe"
        );
    }

    #[tokio::test]
    async fn test_train_baseline_is_repeatable_across_turns() {
        let (_dir, registry) = setup().await;

        let first = registry.turn().dispatch("train_baseline", "").await;
        let second = registry.turn().dispatch("train_baseline", "").await;
        assert_eq!(first, second);

        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value["n_train"], 8);
        assert_eq!(value["n_test"], 2);
        let accuracy = value["accuracy"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[tokio::test]
    async fn test_train_baseline_budget() {
        let (_dir, registry) = setup().await;
        let mut turn = registry.turn();
        assert!(!turn.dispatch("train_baseline", "").await.starts_with("Error"));
        assert!(turn.dispatch("train_baseline", "").await.starts_with("Error"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_observation() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::new();
        let ctx = DataContext::new(
            Arc::new(DatasetCache::new(1)),
            dir.path().join("absent.csv"),
            "Exited",
        );
        register_data_tools(&registry, ctx).await.unwrap();

        let observation = registry.dispatch("basic_overview", "").await;
        assert!(observation.starts_with("Error: basic_overview failed:"));
    }
}
