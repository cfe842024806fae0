use std::fmt;

/// Parameters of an action, in the shape the model produced them
#[derive(Debug, Clone, PartialEq)]
pub enum ActionParameters {
    /// Raw text after `ACTION: tool_name:`
    Text(String),
    /// JSON object from a `tool_use` block
    Named(serde_json::Value),
}

impl ActionParameters {
    /// Resolves the value of a tool's single string parameter.
    /// Text parameters are the value itself; named ones must carry `name` as a string.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            ActionParameters::Text(text) => Some(text),
            ActionParameters::Named(value) => value.get(name).and_then(|v| v.as_str()),
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Correlation id of the `tool_use` block, absent for text actions
    pub id: Option<String>,
    pub tool_name: String,
    pub parameters: ActionParameters,
}

impl Action {
    pub fn text(tool_name: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            id: None,
            tool_name: tool_name.into(),
            parameters: ActionParameters::Text(parameter.into()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameters {
            ActionParameters::Text(text) => write!(f, "{}: {}", self.tool_name, text),
            ActionParameters::Named(value) => write!(f, "{}: {}", self.tool_name, value),
        }
    }
}
