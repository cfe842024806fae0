use super::*;
use crate::config::AgentConfig;
use crate::llm::{types::*, LLMProvider, LLMRequest};
use crate::tools::{ToolError, ToolOutput, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

// Mock LLM Provider, serves the scripted responses in the given order
#[derive(Default, Clone)]
struct MockLLMProvider {
    requests: Arc<Mutex<Vec<LLMRequest>>>,
    responses: Arc<Mutex<Vec<Result<LLMResponse, anyhow::Error>>>>,
}

impl MockLLMProvider {
    fn new(mut responses: Vec<Result<LLMResponse, anyhow::Error>>) -> Self {
        responses.reverse();
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(responses)),
        }
    }

    fn get_requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn send_message(&mut self, request: LLMRequest) -> Result<LLMResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Err(anyhow::anyhow!("No more mock responses")))
    }
}

fn text_response(text: &str) -> LLMResponse {
    LLMResponse {
        content: vec![ContentBlock::new_text(text)],
        stop_reason: StopReason::EndTurn,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

fn tool_response(id: &str, name: &str, input: serde_json::Value) -> LLMResponse {
    LLMResponse {
        content: vec![
            ContentBlock::new_text("Let me use a tool."),
            ContentBlock::new_tool_use(id, name, input),
        ],
        stop_reason: StopReason::ToolUse,
        usage: Usage {
            input_tokens: 20,
            output_tokens: 8,
        },
    }
}

fn create_agent(
    syntax: ToolSyntax,
    config: &AgentConfig,
    responses: Vec<Result<LLMResponse, anyhow::Error>>,
) -> (Agent, MockLLMProvider) {
    let provider = MockLLMProvider::new(responses);
    let agent = Agent::new(Box::new(provider.clone()), syntax, config);
    (agent, provider)
}

#[tokio::test]
async fn test_text_syntax_single_pass() -> Result<()> {
    let (mut agent, provider) = create_agent(
        ToolSyntax::Text,
        &AgentConfig::default(),
        vec![Ok(text_response(
            "I'll calculate that for you.\nACTION: calculate: 15 * 7",
        ))],
    );

    let response = agent.run_step("What is 15 * 7?").await?;

    assert_eq!(response.text, "I'll calculate that for you.");
    assert_eq!(response.actions.len(), 1);
    assert_eq!(response.actions[0].action.tool_name, "calculate");
    assert_eq!(
        response.actions[0].result,
        ToolResult::Success(ToolOutput::Value { value: 105.0 })
    );

    let requests = provider.get_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].tools.is_none());
    assert!(requests[0].system_prompt.contains("ACTION: tool_name: parameter"));
    assert_eq!(requests[0].messages, vec![Message::new_user("What is 15 * 7?")]);

    // user, assistant, action results
    assert_eq!(agent.history().len(), 3);
    assert_eq!(
        agent.history().last(),
        Some(&Message::new_user("Action results:\n- Result: 105"))
    );
    assert_eq!(agent.state(), AgentState::AwaitingInput);

    Ok(())
}

#[tokio::test]
async fn test_text_syntax_notes_across_turns() -> Result<()> {
    let (mut agent, provider) = create_agent(
        ToolSyntax::Text,
        &AgentConfig::default(),
        vec![
            Ok(text_response(
                "Got it!\nACTION: save_note: Meeting at 3pm\nACTION: fly: away",
            )),
            Ok(text_response("Let me look.\nACTION: search_memory: meeting")),
        ],
    );

    let first = agent.run_step("Remember my meeting at 3pm").await?;
    assert_eq!(first.text, "Got it!");
    assert_eq!(first.actions.len(), 2);
    assert_eq!(
        first.actions[1].result,
        ToolResult::Failure(ToolError::UnknownTool("fly".to_string()))
    );
    assert_eq!(agent.notes(), ["Meeting at 3pm"]);

    let second = agent.run_step("When is my meeting?").await?;
    assert_eq!(
        second.actions[0].result,
        ToolResult::Success(ToolOutput::Matches {
            matches: vec!["Meeting at 3pm".to_string()]
        })
    );

    // The second request carries the outcomes of the first turn
    let requests = provider.get_requests();
    assert_eq!(
        requests[1].messages[2],
        Message::new_user("Action results:\n- Saved note: Meeting at 3pm\n- Error: Unknown tool 'fly'")
    );

    Ok(())
}

#[tokio::test]
async fn test_text_syntax_long_note_is_rejected_not_truncated() -> Result<()> {
    let note = "x".repeat(1500);
    let (mut agent, _provider) = create_agent(
        ToolSyntax::Text,
        &AgentConfig::default(),
        vec![Ok(text_response(&format!("ACTION: save_note: {}", note)))],
    );

    let response = agent.run_step("Remember this").await?;
    assert_eq!(response.actions.len(), 1);
    assert_eq!(
        response.actions[0].result,
        ToolResult::Failure(ToolError::InputTooLong {
            length: 1500,
            max: 1000
        })
    );
    assert!(agent.notes().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_text_syntax_without_actions() -> Result<()> {
    let (mut agent, _provider) = create_agent(
        ToolSyntax::Text,
        &AgentConfig::default(),
        vec![Ok(text_response("Hello! How can I help?"))],
    );

    let response = agent.run_step("Hi").await?;
    assert_eq!(response.text, "Hello! How can I help?");
    assert!(response.actions.is_empty());
    assert_eq!(agent.history().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_native_syntax_loops_until_end_turn() -> Result<()> {
    let (mut agent, provider) = create_agent(
        ToolSyntax::Native,
        &AgentConfig::default(),
        vec![
            Ok(tool_response(
                "toolu_1",
                "calculate",
                json!({"expression": "15 * 7"}),
            )),
            Ok(text_response("15 * 7 is 105.")),
        ],
    );

    let response = agent.run_step("What is 15 * 7?").await?;

    assert_eq!(response.text, "15 * 7 is 105.");
    assert_eq!(response.actions.len(), 1);
    assert_eq!(response.actions[0].action.id.as_deref(), Some("toolu_1"));

    let requests = provider.get_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(3));
    assert_eq!(
        requests[1].messages[2],
        Message::new_user_content(vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "Result: 105".to_string(),
            is_error: None,
        }])
    );

    assert_eq!(
        agent.usage(),
        &Usage {
            input_tokens: 30,
            output_tokens: 13
        }
    );
    assert_eq!(agent.history().len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_native_tool_failure_is_reported_to_model() -> Result<()> {
    let (mut agent, provider) = create_agent(
        ToolSyntax::Native,
        &AgentConfig::default(),
        vec![
            Ok(tool_response("toolu_1", "calculate", json!({"expression": "1/0"}))),
            Ok(text_response("You can't divide by zero.")),
        ],
    );

    let response = agent.run_step("What is 1/0?").await?;
    assert!(!response.actions[0].result.is_success());

    let requests = provider.get_requests();
    assert_eq!(
        requests[1].messages[2],
        Message::new_user_content(vec![ContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "Error: Division by zero".to_string(),
            is_error: Some(true),
        }])
    );

    Ok(())
}

#[tokio::test]
async fn test_native_iteration_limit() -> Result<()> {
    let config = AgentConfig {
        max_tool_iterations: 3,
        ..AgentConfig::default()
    };
    let responses = (0..5)
        .map(|i| {
            Ok(tool_response(
                &format!("toolu_{}", i),
                "calculate",
                json!({"expression": "1 + 1"}),
            ))
        })
        .collect();
    let (mut agent, provider) = create_agent(ToolSyntax::Native, &config, responses);

    let error = agent
        .run_step("Keep calculating")
        .await
        .expect_err("loop must stop at the limit");

    match error {
        AgentError::IterationLimitExceeded { limit, completed } => {
            assert_eq!(limit, 3);
            assert_eq!(completed.len(), 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(provider.get_requests().len(), 3);
    assert_eq!(agent.state(), AgentState::Failed);

    // The results of the last call were recorded before giving up
    let last = agent.history().last().expect("history is not empty");
    assert_eq!(last.tool_result_ids(), vec!["toolu_2"]);

    Ok(())
}

#[tokio::test]
async fn test_tool_loop_requests_open_with_user_turn() -> Result<()> {
    // Smallest window that validates for three model calls per step
    let config = AgentConfig {
        max_history_length: 7,
        max_tool_iterations: 3,
        ..AgentConfig::default()
    };
    config.validate()?;
    let (mut agent, provider) = create_agent(
        ToolSyntax::Native,
        &config,
        vec![
            Ok(text_response("Hello.")),
            Ok(text_response("Hi again.")),
            Ok(tool_response("toolu_1", "calculate", json!({"expression": "1 + 1"}))),
            Ok(tool_response("toolu_2", "calculate", json!({"expression": "2 + 2"}))),
            Ok(text_response("2 and 4.")),
            Ok(text_response("You're welcome.")),
        ],
    );

    agent.run_step("Hello").await?;
    agent.run_step("Hi again").await?;
    let response = agent.run_step("What are 1 + 1 and 2 + 2?").await?;
    assert_eq!(response.actions.len(), 2);
    agent.run_step("Thanks").await?;

    let requests = provider.get_requests();
    assert_eq!(requests.len(), 6);
    for request in &requests {
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert!(request.messages[0].tool_result_ids().is_empty());
    }
    // The window slid during the tool loop
    assert_eq!(requests[4].messages[0], Message::new_user("Hi again"));
    assert_eq!(
        requests[5].messages[0],
        Message::new_user("What are 1 + 1 and 2 + 2?")
    );

    Ok(())
}

#[tokio::test]
async fn test_upstream_failure_keeps_session_usable() -> Result<()> {
    let (mut agent, _provider) = create_agent(
        ToolSyntax::Native,
        &AgentConfig::default(),
        vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(text_response("I'm back.")),
        ],
    );

    let error = agent
        .run_step("Hello?")
        .await
        .expect_err("first call fails");
    assert!(matches!(error, AgentError::Upstream(_)));
    assert!(error.to_string().contains("connection reset"));
    assert_eq!(agent.state(), AgentState::Failed);

    let response = agent.run_step("Are you there?").await?;
    assert_eq!(response.text, "I'm back.");
    assert_eq!(agent.state(), AgentState::AwaitingInput);

    Ok(())
}

#[tokio::test]
async fn test_unexpected_stop_reason() -> Result<()> {
    let mut response = text_response("...");
    response.stop_reason = StopReason::Other;
    let (mut agent, _provider) =
        create_agent(ToolSyntax::Native, &AgentConfig::default(), vec![Ok(response)]);

    let error = agent.run_step("Hi").await.expect_err("unknown stop reason");
    assert!(matches!(
        error,
        AgentError::UnexpectedStopReason(StopReason::Other)
    ));

    Ok(())
}

#[tokio::test]
async fn test_max_tokens_drops_unanswerable_tool_calls() -> Result<()> {
    let mut response = tool_response("toolu_1", "save_note", json!({"note": "half"}));
    response.stop_reason = StopReason::MaxTokens;
    let (mut agent, _provider) =
        create_agent(ToolSyntax::Native, &AgentConfig::default(), vec![Ok(response)]);

    let step = agent.run_step("Save something long").await?;
    assert_eq!(step.text, "Let me use a tool.");
    assert!(step.actions.is_empty());
    assert!(agent.notes().is_empty());
    assert_eq!(
        agent.history().last(),
        Some(&Message::new_assistant_content(vec![ContentBlock::new_text(
            "Let me use a tool."
        )]))
    );

    Ok(())
}

#[test]
fn test_extract_actions_by_syntax() {
    let response = LLMResponse {
        content: vec![
            ContentBlock::new_text("ACTION: calculate: 2 + 2"),
            ContentBlock::new_tool_use("toolu_1", "save_note", json!({"note": "x"})),
        ],
        stop_reason: StopReason::ToolUse,
        usage: Usage::zero(),
    };

    let text = ToolSyntax::Text.extract_actions(&response);
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].tool_name, "calculate");

    let native = ToolSyntax::Native.extract_actions(&response);
    assert_eq!(native.len(), 1);
    assert_eq!(native[0].tool_name, "save_note");
}
