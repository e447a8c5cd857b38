//! Interactive chat loop
//!
//! One line in, one agent turn out. `exit` or `quit` ends the session, as
//! does end of input. A failed turn is reported and the loop keeps reading.

use anyhow::Result;
use churn_agent::Agent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

const BANNER: &str = "Churn data agent. Type 'exit' to quit.";

pub fn is_exit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit")
}

/// Run the loop over `input`/`output`, returning the number of turns taken
pub async fn run<R, W>(agent: &Agent, input: R, output: W) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    run_lines(agent, BufReader::new(input), output).await
}

async fn run_lines<R, W>(agent: &Agent, input: R, mut output: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(format!("{}\n", BANNER).as_bytes()).await?;
    let mut lines = input.lines();
    let mut turns = 0;

    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_exit(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        turns += 1;
        debug!(turn = turns, "Forwarding input to agent");
        let text = match agent.handle(&line).await {
            Ok(metered) => format!(
                "\nAgent: {}\n({:.2}s, request #{})\n",
                metered.result.final_output,
                metered.metrics.latency_sec,
                metered.metrics.total_requests
            ),
            Err(metered) => format!("\nError: {}\n", metered.result),
        };
        output.write_all(text.as_bytes()).await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(turns)
}
