use super::definitions::Tools;
use super::evaluator::Evaluator;
use super::result::{ToolError, ToolOutput, ToolResult};
use super::types::ActionParameters;
use crate::llm::ToolDefinition;
use tracing::{debug, warn};

/// The closed set of built-in tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Calculate,
    SaveNote,
    SearchMemory,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Calculate, Tool::SaveNote, Tool::SearchMemory];

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Calculate => "calculate",
            Tool::SaveNote => "save_note",
            Tool::SearchMemory => "search_memory",
        }
    }

    /// Each tool takes exactly one string parameter
    pub fn parameter_name(&self) -> &'static str {
        match self {
            Tool::Calculate => "expression",
            Tool::SaveNote => "note",
            Tool::SearchMemory => "query",
        }
    }
}

/// Executes tools on behalf of one agent session and owns its notes
pub struct ToolRegistry {
    notes: Vec<String>,
    evaluator: Evaluator,
    max_note_length: usize,
}

impl ToolRegistry {
    pub fn new(max_note_length: usize) -> Self {
        Self {
            notes: Vec::new(),
            evaluator: Evaluator::new(),
            max_note_length,
        }
    }

    pub fn describe(&self) -> Vec<ToolDefinition> {
        Tools::all()
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Runs the named tool. Every problem is reported through the returned result.
    pub fn invoke(&mut self, name: &str, parameters: &ActionParameters) -> ToolResult {
        let Some(tool) = Tool::from_name(name) else {
            warn!("Model requested unknown tool '{}'", name);
            return ToolResult::Failure(ToolError::UnknownTool(name.to_string()));
        };

        let Some(input) = parameters.get(tool.parameter_name()) else {
            warn!(
                "Tool '{}' called without '{}' parameter",
                name,
                tool.parameter_name()
            );
            return ToolResult::Failure(ToolError::MissingParameter(
                tool.parameter_name().to_string(),
            ));
        };

        debug!("Invoking {} with {:?}", name, input);
        let result = match tool {
            Tool::Calculate => self.calculate(input),
            Tool::SaveNote => self.save_note(input),
            Tool::SearchMemory => Ok(self.search_memory(input)),
        };
        result.into()
    }

    fn calculate(&self, expression: &str) -> Result<ToolOutput, ToolError> {
        let value = self.evaluator.evaluate(expression)?;
        Ok(ToolOutput::Value { value })
    }

    fn save_note(&mut self, note: &str) -> Result<ToolOutput, ToolError> {
        let note = note.trim();
        if note.is_empty() {
            return Err(ToolError::EmptyInput);
        }
        let length = note.chars().count();
        if length > self.max_note_length {
            return Err(ToolError::InputTooLong {
                length,
                max: self.max_note_length,
            });
        }

        self.notes.push(note.to_string());
        debug!("Stored note #{}", self.notes.len());
        Ok(ToolOutput::Saved {
            note: note.to_string(),
        })
    }

    fn search_memory(&self, query: &str) -> ToolOutput {
        let query = query.to_lowercase();
        let matches = self
            .notes
            .iter()
            .filter(|note| note.to_lowercase().contains(&query))
            .cloned()
            .collect();
        ToolOutput::Matches { matches }
    }
}
