//! Hosted model API integration
//!
//! This module implements:
//! - Common interface for model interactions via the LLMProvider trait
//! - Shared message, content block and tool schema types
//! - The Anthropic Messages API client with bounded retry


mod utils;

pub mod anthropic;
pub mod types;

pub use anthropic::AnthropicClient;
pub use types::*;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for different LLM provider implementations
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Sends a request to the LLM service
    async fn send_message(&mut self, request: LLMRequest) -> Result<LLMResponse>;
}
