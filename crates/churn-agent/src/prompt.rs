//! Prompt construction for the ReAct loop
//!
//! A turn's prompt is the tool catalog, the format instructions, the user's
//! question, and the scratchpad of earlier steps in the same turn.

use churn_tools::ToolDefinition;

const PREFIX: &str =
    "Answer the following questions as best you can. You have access to the following tools:";

const SUFFIX: &str = "Begin!";

/// Steps taken so far in one turn, replayed to the engine on every call
#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    entries: Vec<(String, String)>,
}

impl Scratchpad {
    /// Record the engine's raw output and the observation that followed it
    pub fn push(&mut self, log: impl Into<String>, observation: impl Into<String>) {
        self.entries.push((log.into(), observation.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent observation, if any
    pub fn last_observation(&self) -> Option<&str> {
        self.entries.last().map(|(_, obs)| obs.as_str())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (log, observation) in &self.entries {
            out.push(' ');
            out.push_str(log.trim());
            out.push_str("\nObservation: ");
            out.push_str(observation.trim_end());
            out.push_str("\nThought:");
        }
        out
    }
}

/// The catalog block shown to the engine, one `name: description (input)`
/// line per tool
pub fn render_catalog(tools: &[ToolDefinition]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {} ({})", t.name, t.description, t.argument.hint()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_instructions(tools: &[ToolDefinition]) -> String {
    let names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Use the following format:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question",
        names
    )
}

/// Full prompt for the next engine call
pub fn build_prompt(tools: &[ToolDefinition], input: &str, scratchpad: &Scratchpad) -> String {
    format!(
        "{}\n\n{}\n\n{}\n\n{}\n\nQuestion: {}\nThought:{}",
        PREFIX,
        render_catalog(tools),
        format_instructions(tools),
        SUFFIX,
        input.trim(),
        scratchpad.render()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use churn_tools::ArgSpec;

    fn tools() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "basic_overview".to_string(),
                description: "Overview of the dataset.".to_string(),
                argument: ArgSpec::None,
                max_calls_per_turn: None,
            },
            ToolDefinition {
                name: "value_counts".to_string(),
                description: "Counts per value. Input: column name as a string.".to_string(),
                argument: ArgSpec::text("column"),
                max_calls_per_turn: None,
            },
        ]
    }

    #[test]
    fn test_catalog_in_order() {
        let prompt = build_prompt(&tools(), "How many rows?", &Scratchpad::default());
        let overview = prompt.find("basic_overview: Overview").unwrap();
        let counts = prompt.find("value_counts: Counts").unwrap();
        assert!(overview < counts);
        assert!(prompt.contains("basic_overview: Overview of the dataset. (no input)"));
        assert!(prompt.contains("(input: column name as a string)"));
        assert!(prompt.contains("should be one of [basic_overview, value_counts]"));
        assert!(prompt.ends_with("Question: How many rows?\nThought:"));
    }

    #[test]
    fn test_scratchpad_replayed() {
        let mut pad = Scratchpad::default();
        pad.push(
            "I need the shape.\nAction: basic_overview\nAction Input: None",
            "{\"n_rows\":10}",
        );
        assert_eq!(pad.last_observation(), Some("{\"n_rows\":10}"));

        let prompt = build_prompt(&tools(), "How many rows?", &pad);
        assert!(prompt.ends_with(
            "Thought: I need the shape.\nAction: basic_overview\nAction Input: None\n\
             Observation: {\"n_rows\":10}\nThought:"
        ));
    }
}
