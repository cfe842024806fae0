use super::ToolSyntax;
use crate::config::AgentConfig;
use crate::history::ConversationHistory;
use crate::llm::{
    ContentBlock, LLMProvider, LLMRequest, LLMResponse, Message, StopReason, ToolDefinition,
    Usage,
};
use crate::tools::{strip_action_lines, Action, ActionResult, ToolRegistry};
use tracing::{debug, info, warn};

const SYSTEM_MESSAGE: &str = include_str!("../../resources/system_message.md");
const SYSTEM_MESSAGE_NATIVE: &str = include_str!("../../resources/system_message_native.md");

/// Where the agent is within a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingInput,
    ModelCall,
    ToolDispatch,
    Terminal,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Stopped after {limit} model calls without a final answer")]
    IterationLimitExceeded {
        limit: usize,
        completed: Vec<ActionResult>,
    },

    #[error("Model request failed: {0}")]
    Upstream(anyhow::Error),

    #[error("Unexpected stop reason: {0:?}")]
    UnexpectedStopReason(StopReason),
}

/// What one user turn produced
#[derive(Debug, Clone, PartialEq)]
pub struct StepResponse {
    pub text: String,
    pub actions: Vec<ActionResult>,
}

pub struct Agent {
    llm_provider: Box<dyn LLMProvider>,
    syntax: ToolSyntax,
    history: ConversationHistory,
    registry: ToolRegistry,
    state: AgentState,
    // Accumulated over the whole session
    usage: Usage,
    max_tokens: usize,
    max_tool_iterations: usize,
}

impl Agent {
    pub fn new(
        llm_provider: Box<dyn LLMProvider>,
        syntax: ToolSyntax,
        config: &AgentConfig,
    ) -> Self {
        Self {
            llm_provider,
            syntax,
            history: ConversationHistory::new(config.max_history_length),
            registry: ToolRegistry::new(config.max_note_length),
            state: AgentState::AwaitingInput,
            usage: Usage::zero(),
            max_tokens: config.max_tokens,
            max_tool_iterations: config.max_tool_iterations,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn notes(&self) -> &[String] {
        self.registry.notes()
    }

    pub fn tool_syntax(&self) -> ToolSyntax {
        self.syntax
    }

    /// Handles one user turn: Observe, Think, Act.
    /// A failed step leaves history and notes intact, so the next call can proceed.
    /// The agent reports `Failed` until then.
    pub async fn run_step(&mut self, user_text: &str) -> Result<StepResponse, AgentError> {
        self.state = AgentState::AwaitingInput;
        info!("[Observe] Received user input");
        self.history.push(Message::new_user(user_text));

        let result = match self.syntax {
            ToolSyntax::Text => self.run_text_step().await,
            ToolSyntax::Native => self.run_native_step().await,
        };

        match &result {
            Ok(_) => self.state = AgentState::AwaitingInput,
            Err(e) => {
                warn!("Step failed: {}", e);
                self.state = AgentState::Failed;
            }
        }
        result
    }

    async fn run_text_step(&mut self) -> Result<StepResponse, AgentError> {
        info!("[Think] Querying model");
        let response = self.think(SYSTEM_MESSAGE, None).await?;
        let text = response.text();
        if !text.is_empty() {
            self.history.push(Message::new_assistant(text.clone()));
        }

        info!("[Act] Parsing and executing actions");
        let actions = self.syntax.extract_actions(&response);
        let results = self.act(actions);
        if !results.is_empty() {
            // Lets the model see the outcomes, including failures, on the next turn
            self.history
                .push(Message::new_user(format_action_results(&results)));
        }

        self.state = AgentState::Terminal;
        Ok(StepResponse {
            text: strip_action_lines(&text),
            actions: results,
        })
    }

    async fn run_native_step(&mut self) -> Result<StepResponse, AgentError> {
        let tools = self.registry.describe();
        let mut completed = Vec::new();

        for iteration in 1..=self.max_tool_iterations {
            info!(
                "[Think] Querying model with tool definitions ({}/{})",
                iteration, self.max_tool_iterations
            );
            let response = self
                .think(SYSTEM_MESSAGE_NATIVE, Some(tools.clone()))
                .await?;

            match response.stop_reason {
                StopReason::EndTurn | StopReason::StopSequence | StopReason::MaxTokens => {
                    if response.stop_reason == StopReason::MaxTokens {
                        warn!("Response was cut off by the max_tokens limit");
                    }
                    return Ok(self.finish(&response, completed));
                }
                StopReason::ToolUse => {
                    let actions = self.syntax.extract_actions(&response);
                    if actions.is_empty() {
                        warn!("Model stopped for tool use without any usable tool call");
                        return Ok(self.finish(&response, completed));
                    }

                    self.history
                        .push(Message::new_assistant_content(answerable_content(&response)));
                    info!("[Act] Executing {} requested tools", actions.len());
                    let results = self.act(actions);
                    self.history
                        .push(Message::new_user_content(tool_result_blocks(&results)));
                    completed.extend(results);
                }
                other => return Err(AgentError::UnexpectedStopReason(other)),
            }
        }

        Err(AgentError::IterationLimitExceeded {
            limit: self.max_tool_iterations,
            completed,
        })
    }

    async fn think(
        &mut self,
        system_prompt: &str,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<LLMResponse, AgentError> {
        self.state = AgentState::ModelCall;
        let request = LLMRequest {
            messages: self.history.request_messages(),
            system_prompt: system_prompt.to_string(),
            tools,
            max_tokens: self.max_tokens,
        };
        debug!("Sending request with {} messages", request.messages.len());

        let response = self
            .llm_provider
            .send_message(request)
            .await
            .map_err(AgentError::Upstream)?;

        self.usage.add(&response.usage);
        debug!(
            "Usage: {} input, {} output tokens (session: {} input, {} output)",
            response.usage.input_tokens,
            response.usage.output_tokens,
            self.usage.input_tokens,
            self.usage.output_tokens
        );
        Ok(response)
    }

    /// Runs actions strictly in the order they were requested
    fn act(&mut self, actions: Vec<Action>) -> Vec<ActionResult> {
        self.state = AgentState::ToolDispatch;
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = self
                .registry
                .invoke(&action.tool_name, &action.parameters);
            info!("[Act] {} -> {}", action, result.format_message());
            results.push(ActionResult { action, result });
        }
        results
    }

    /// Records the final assistant turn and returns its text
    fn finish(&mut self, response: &LLMResponse, completed: Vec<ActionResult>) -> StepResponse {
        // Tool calls without results would make the history invalid
        let content: Vec<ContentBlock> = response
            .content
            .iter()
            .filter(|block| !matches!(block, ContentBlock::ToolUse { .. }))
            .cloned()
            .collect();
        if !content.is_empty() {
            self.history.push(Message::new_assistant_content(content));
        }

        self.state = AgentState::Terminal;
        StepResponse {
            text: response.text(),
            actions: completed,
        }
    }
}

/// Response content minus tool calls that were dropped during extraction
fn answerable_content(response: &LLMResponse) -> Vec<ContentBlock> {
    response
        .content
        .iter()
        .filter(|block| !matches!(block, ContentBlock::ToolUse { id, .. } if id.is_empty()))
        .cloned()
        .collect()
}

fn tool_result_blocks(results: &[ActionResult]) -> Vec<ContentBlock> {
    results
        .iter()
        .map(|r| ContentBlock::ToolResult {
            tool_use_id: r.action.id.clone().unwrap_or_default(),
            content: r.result.format_message(),
            is_error: (!r.result.is_success()).then_some(true),
        })
        .collect()
}

fn format_action_results(results: &[ActionResult]) -> String {
    let lines = results
        .iter()
        .map(|r| format!("- {}", r.result.format_message()))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Action results:\n{}", lines)
}
