use super::evaluator::EvalError;
use super::types::Action;

/// Successful output of one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Value { value: f64 },
    Saved { note: String },
    Matches { matches: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Input too long ({length} characters, max {max})")]
    InputTooLong { length: usize, max: usize },

    #[error("Empty input")]
    EmptyInput,

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

/// Outcome of one action. Failures are values, they never abort the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(ToolOutput),
    Failure(ToolError),
}

impl From<Result<ToolOutput, ToolError>> for ToolResult {
    fn from(result: Result<ToolOutput, ToolError>) -> Self {
        match result {
            Ok(output) => ToolResult::Success(output),
            Err(error) => ToolResult::Failure(error),
        }
    }
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    // Format a message describing the result, shown to both user and model
    pub fn format_message(&self) -> String {
        match self {
            ToolResult::Success(ToolOutput::Value { value }) => format!("Result: {}", value),
            ToolResult::Success(ToolOutput::Saved { note }) => format!("Saved note: {}", note),
            ToolResult::Success(ToolOutput::Matches { matches }) => {
                if matches.is_empty() {
                    "No matching notes found.".to_string()
                } else {
                    let lines = matches
                        .iter()
                        .map(|note| format!("- {}", note))
                        .collect::<Vec<_>>()
                        .join("\n");
                    format!("Found notes:\n{}", lines)
                }
            }
            ToolResult::Failure(error) => format!("Error: {}", error),
        }
    }
}

/// An executed action paired with what it produced
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub action: Action,
    pub result: ToolResult,
}
