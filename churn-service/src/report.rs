//! Batch report: the same operations the tools expose, run once in order
//! without a reasoning engine.

use anyhow::{Context, Result};
use churn_core::Settings;
use churn_data::{basic_overview, clean_and_split, numeric_summary, train_baseline, Dataset, TrainConfig};
use tracing::info;

/// Load the configured dataset and render the report
pub async fn run(settings: &Settings) -> Result<String> {
    let path = settings.data_path.clone();
    let target = settings.target_column.clone();
    info!(data = %path.display(), target = %target, "Building report");

    tokio::task::spawn_blocking(move || -> Result<String> {
        let dataset = Dataset::from_path(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(render(&dataset, &target, &TrainConfig::default())?)
    })
    .await
    .context("Report task panicked")?
}

/// Overview, numeric summary and baseline metrics as printable sections
pub fn render(dataset: &Dataset, target: &str, config: &TrainConfig) -> churn_core::Result<String> {
    let overview = basic_overview(dataset);
    let summary = numeric_summary(dataset)?;
    let (x, y) = clean_and_split(dataset, target)?;
    let (_, metrics) = train_baseline(&x, &y, config)?;

    Ok(format!(
        "=== Overview ===\n{}\n\n=== Numeric Summary ===\n{}\n\n=== Model Metrics ===\n{}",
        overview, summary, metrics
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CSV: &str = "\
RowNumber,CustomerId,Surname,CreditScore,Geography,Age,Exited
1,15634602,Hargrave,619,France,42,1
2,15647311,Hill,608,Spain,41,0
3,15619304,Onio,502,France,42,1
4,15701354,Boni,699,France,39,0
5,15737888,Mitchell,850,Spain,43,0
";

    fn settings_for(path: PathBuf) -> Settings {
        Settings {
            data_path: path,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_report_sections_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fintech.csv");
        std::fs::write(&path, CSV).unwrap();

        let text = run(&settings_for(path)).await.unwrap();
        let overview = text.find("=== Overview ===").unwrap();
        let summary = text.find("=== Numeric Summary ===").unwrap();
        let model = text.find("=== Model Metrics ===").unwrap();
        assert!(overview < summary && summary < model);
        assert!(text.contains("\"n_rows\":5"));
        assert!(text.contains("\"n_train\":4"));
        assert!(text.contains("\"n_test\":1"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&settings_for(dir.path().join("absent.csv")))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("absent.csv"));
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fintech.csv");
        std::fs::write(&path, CSV).unwrap();
        let dataset = Dataset::from_path(&path).unwrap();

        let err = render(&dataset, "Churned", &TrainConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Churned"));
    }
}
