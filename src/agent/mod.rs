#[cfg(test)]
mod tests;

#[allow(clippy::module_inception)]
mod agent;

pub use agent::{Agent, AgentError, AgentState, StepResponse};

use crate::llm::LLMResponse;
use crate::tools::{parse_text_actions, parse_tool_use_blocks, Action};
use clap::ValueEnum;

/// Specifies how the model invokes tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolSyntax {
    /// `ACTION: tool_name: parameter` lines in plain text, single pass
    Text,
    /// Structured tool calls via the API, looping until a final answer
    #[default]
    Native,
}

/// Implements ValueEnum for ToolSyntax to use with clap
impl ValueEnum for ToolSyntax {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Text, Self::Native]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
            Self::Native => Some(clap::builder::PossibleValue::new("native")),
        }
    }
}

impl ToolSyntax {
    pub fn extract_actions(&self, response: &LLMResponse) -> Vec<Action> {
        match self {
            ToolSyntax::Text => parse_text_actions(&response.text()),
            ToolSyntax::Native => parse_tool_use_blocks(&response.content),
        }
    }
}
