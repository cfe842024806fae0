use crate::agent::ToolSyntax;
use crate::config::AgentConfig;
use clap::Parser;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about = "Conversational agent with calculator and note tools", long_about = None)]
pub struct Args {
    /// Tool invocation syntax ('native' = tools via API, 'text' = ACTION lines in the response)
    #[arg(long, default_value = "native")]
    pub tool_syntax: ToolSyntax,

    /// Model name to use
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum number of turns kept in the conversation history
    #[arg(long)]
    pub max_history: Option<usize>,

    /// Maximum number of model calls per user turn (native syntax)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Maximum length of a saved note, in characters
    #[arg(long)]
    pub max_note_length: Option<usize>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Command line values take precedence over the config file
    pub fn apply_overrides(&self, config: &mut AgentConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_history) = self.max_history {
            config.max_history_length = max_history;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_tool_iterations = max_iterations;
        }
        if let Some(max_note_length) = self.max_note_length {
            config.max_note_length = max_note_length;
        }
    }
}
