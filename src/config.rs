use crate::llm::AnthropicClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const APP_NAME: &str = "simple-agent";
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ANTHROPIC_API_KEY not found in environment variables")]
    MissingApiKey,

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] confy::ConfyError),
}

/// Settings for one agent session, fixed once the session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub base_url: String,
    pub max_tokens: usize,
    pub max_history_length: usize,
    pub max_tool_iterations: usize,
    pub max_note_length: usize,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: AnthropicClient::default_base_url(),
            max_tokens: 1024,
            max_history_length: 50,
            max_tool_iterations: 10,
            max_note_length: 1000,
            max_retries: 3,
            request_timeout_secs: 60,
        }
    }
}

impl AgentConfig {
    /// Load from the user's config directory, writing defaults on first run
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = confy::get_configuration_file_path(APP_NAME, None) {
            debug!("Loading configuration from {}", path.display());
        }
        Ok(confy::load(APP_NAME, None)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_length < 2 {
            return Err(ConfigError::InvalidValue {
                field: "max_history_length",
                reason: format!("must be at least 2, got {}", self.max_history_length),
            });
        }
        for (field, value) in [
            ("max_tool_iterations", self.max_tool_iterations),
            ("max_note_length", self.max_note_length),
            ("max_tokens", self.max_tokens),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        // Every request of a native step must still include that step's user turn
        let step_turns = self.max_tool_iterations.saturating_mul(2);
        if self.max_history_length <= step_turns {
            return Err(ConfigError::InvalidValue {
                field: "max_history_length",
                reason: format!(
                    "must exceed twice max_tool_iterations ({}), got {}",
                    step_turns, self.max_history_length
                ),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Reads the API key from the environment. It is never stored in the config file.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey),
    }
}
