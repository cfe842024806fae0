use crate::llm::ToolDefinition;
use serde_json::json;

/// Schemas advertised to the model for native tool calls
pub struct Tools;

impl Tools {
    /// Returns all available tool definitions
    pub fn all() -> Vec<ToolDefinition> {
        vec![Self::calculate(), Self::save_note(), Self::search_memory()]
    }

    pub fn calculate() -> ToolDefinition {
        ToolDefinition {
            name: "calculate".to_string(),
            description: "Perform math calculations. Supports +, -, *, /, ^, ()".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Math expression to evaluate (e.g., '5 + 3 * 2')"
                    }
                },
                "required": ["expression"]
            }),
        }
    }

    pub fn save_note() -> ToolDefinition {
        ToolDefinition {
            name: "save_note".to_string(),
            description: "Save a note to memory for later retrieval.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "note": {
                        "type": "string",
                        "description": "The note or information to save"
                    }
                },
                "required": ["note"]
            }),
        }
    }

    pub fn search_memory() -> ToolDefinition {
        ToolDefinition {
            name: "search_memory".to_string(),
            description: "Search through previously saved notes.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The keyword or phrase to search for"
                    }
                },
                "required": ["query"]
            }),
        }
    }
}
