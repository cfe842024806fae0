//! A conversational agent that observes user input, asks a hosted model what
//! to do, and acts through a small set of tools. Tools can be invoked through
//! `ACTION:` lines in plain text or through the API's native tool calls.

pub mod agent;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod logging;
pub mod repl;
pub mod tools;
