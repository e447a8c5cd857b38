//! End-to-end turns against a scripted reasoning engine and a CSV on disk.

mod common;

use churn_core::Error;
use common::{agent_for, write_csv, ScriptedProvider, TEN_ROWS, THREE_ROWS};

#[tokio::test]
async fn overview_turn_reports_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "Thought: I need the dataset shape.\nAction: basic_overview\nAction Input: None",
        "Thought: I now know the final answer\nFinal Answer: The dataset has 10 rows and 9 columns.",
    ]);
    let agent = agent_for(&path, provider.clone(), 6).await;

    let metered = agent.handle("How big is the dataset?").await.unwrap();
    let turn = metered.result;

    assert_eq!(turn.trace.len(), 1);
    assert_eq!(turn.trace[0].tool, "basic_overview");
    let overview: serde_json::Value = serde_json::from_str(&turn.trace[0].observation).unwrap();
    assert_eq!(overview["n_rows"], 10);
    assert_eq!(overview["n_cols"], 9);
    assert_eq!(turn.final_output, "The dataset has 10 rows and 9 columns.");
    assert!(!turn.stopped_early);

    assert!(metered.metrics.latency_sec > 0.0);
    assert_eq!(metered.metrics.total_requests, 1);

    // second prompt carries the observation
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Observation: {\"n_rows\":10"));
}

#[tokio::test]
async fn value_counts_turn_orders_descending() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, THREE_ROWS);
    let provider = ScriptedProvider::new(&[
        "Thought: count countries\nAction: value_counts\nAction Input: \"Geography\"",
        "Final Answer: France appears twice and Spain once.",
    ]);
    let agent = agent_for(&path, provider, 6).await;

    let turn = agent.handle("Which countries?").await.unwrap().result;
    assert_eq!(turn.trace[0].arg, "\"Geography\"");
    let lines: Vec<&str> = turn.trace[0].observation.lines().collect();
    assert_eq!(lines[0], "Geography");
    assert_eq!(lines[1], "France    2");
    assert_eq!(lines[2], "Spain     1");
}

#[tokio::test]
async fn unparsable_output_gets_one_corrective_retry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "I think about 20% of customers churn.",
        "Thought: I now know the final answer\nFinal Answer: About half of the customers exited.",
    ]);
    let agent = agent_for(&path, provider.clone(), 6).await;

    let turn = agent.handle("What is the churn rate?").await.unwrap().result;
    assert!(turn.trace.is_empty());
    assert_eq!(turn.iterations, 2);
    assert_eq!(turn.final_output, "About half of the customers exited.");

    let prompts = provider.prompts();
    assert!(prompts[1].contains("Invalid Format: Missing 'Action:' after 'Thought:'"));
}

#[tokio::test]
async fn iteration_cap_yields_fallback_answer() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&["nonsense", "more nonsense", "still nonsense"]);
    let agent = agent_for(&path, provider, 3).await;

    let turn = agent.handle("Anything?").await.unwrap().result;
    assert!(turn.stopped_early);
    assert_eq!(turn.iterations, 3);
    assert!(!turn.final_output.trim().is_empty());
    assert!(turn.final_output.contains("within 3 steps"));
}

#[tokio::test]
async fn fallback_answer_includes_last_observation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "Action: basic_overview\nAction Input: None",
        "Action: basic_overview\nAction Input: None",
    ]);
    let agent = agent_for(&path, provider, 2).await;

    let turn = agent.handle("Rows?").await.unwrap().result;
    assert!(turn.stopped_early);
    assert_eq!(turn.trace.len(), 2);
    assert!(turn.final_output.contains("\"n_rows\":10"));
}

#[tokio::test]
async fn fallback_answer_skips_error_observations() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "Action: train_baseline\nAction Input: None",
        "Action: train_baseline\nAction Input: None",
    ]);
    let agent = agent_for(&path, provider, 2).await;

    let turn = agent.handle("Accuracy?").await.unwrap().result;
    assert!(turn.stopped_early);
    assert!(turn.trace[1].observation.starts_with("Error:"));
    assert!(turn.final_output.contains("Please rephrase the question."));
    assert!(!turn.final_output.contains("Error:"));
}

#[tokio::test]
async fn unknown_tool_and_bad_column_keep_the_turn_alive() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "Action: churn_rate\nAction Input: Exited",
        "Action: value_counts\nAction Input: Country",
        "Final Answer: I could not find that column.",
    ]);
    let agent = agent_for(&path, provider, 6).await;

    let turn = agent.handle("Churn by country?").await.unwrap().result;
    assert_eq!(turn.trace.len(), 2);
    assert!(turn.trace[0]
        .observation
        .starts_with("Error: Tool not found: churn_rate"));
    assert_eq!(
        turn.trace[1].observation,
        "Error: value_counts failed: Column 'Country' not in dataframe"
    );
    assert_eq!(turn.final_output, "I could not find that column.");
}

#[tokio::test]
async fn train_baseline_runs_once_per_turn() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[
        "Action: train_baseline\nAction Input: None",
        "Action: train_baseline\nAction Input: None",
        "Final Answer: Accuracy reported above.",
    ]);
    let agent = agent_for(&path, provider.clone(), 6).await;

    let turn = agent.handle("How accurate is the model?").await.unwrap().result;
    assert_eq!(turn.trace.len(), 2);
    let metrics: serde_json::Value = serde_json::from_str(&turn.trace[0].observation).unwrap();
    assert_eq!(metrics["n_train"], 8);
    assert_eq!(metrics["n_test"], 2);
    assert!(turn.trace[1].observation.contains("may only be called 1 time(s)"));

    // the next turn gets a fresh budget and the same split
    provider.push("Action: train_baseline\nAction Input: None");
    provider.push("Final Answer: Same as before.");
    let again = agent.handle("And again?").await.unwrap().result;
    assert_eq!(again.trace[0].observation, turn.trace[0].observation);
}

#[tokio::test]
async fn backend_failure_is_fatal_but_counted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&[]);
    let agent = agent_for(&path, provider.clone(), 6).await;

    let failed = agent.handle("Hello?").await.unwrap_err();
    assert!(matches!(failed.result, Error::Backend(_)));
    assert!(failed.result.to_string().contains("connection refused"));
    assert_eq!(failed.metrics.total_requests, 1);

    provider.push("Final Answer: Back online.");
    let ok = agent.handle("Hello again?").await.unwrap();
    assert_eq!(ok.metrics.total_requests, 2);
    assert_eq!(agent.metrics().total_requests(), 2);
    assert_eq!(agent.metrics().failures(), 1);
}

#[tokio::test]
async fn catalog_is_presented_in_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(&dir, TEN_ROWS);
    let provider = ScriptedProvider::new(&["Final Answer: hi"]);
    let agent = agent_for(&path, provider.clone(), 6).await;

    agent.handle("hi").await.unwrap();
    let prompt = &provider.prompts()[0];
    let positions: Vec<usize> = [
        "basic_overview:",
        "numeric_summary:",
        "value_counts:",
        "train_baseline:",
    ]
    .iter()
    .map(|name| prompt.find(name).unwrap())
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(prompt.contains("Question: hi"));

    // every catalog line states the argument shape
    let names = ["basic_overview:", "numeric_summary:", "value_counts:", "train_baseline:"];
    let catalog: Vec<&str> = prompt
        .lines()
        .filter(|l| names.iter().any(|n| l.starts_with(n)))
        .collect();
    assert_eq!(catalog.len(), 4);
    assert!(catalog[0].ends_with("(no input)"));
    assert!(catalog[1].ends_with("(no input)"));
    assert!(catalog[2].ends_with("(input: column name as a string)"));
    assert!(catalog[3].ends_with("(no input)"));
}
