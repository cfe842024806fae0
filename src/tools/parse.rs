use super::types::{Action, ActionParameters};
use crate::llm::ContentBlock;
use tracing::{debug, trace, warn};

pub const ACTION_MARKER: &str = "ACTION:";
const MAX_ACTIONS_PER_RESPONSE: usize = 10;

fn is_action_line(line: &str) -> bool {
    line.trim().starts_with(ACTION_MARKER)
}

/// Extracts `ACTION: tool_name: parameter` lines in order of appearance.
/// Malformed marker lines are skipped without error.
pub fn parse_text_actions(text: &str) -> Vec<Action> {
    let mut actions = Vec::new();

    for line in text.lines() {
        let Some(rest) = line.trim().strip_prefix(ACTION_MARKER) else {
            continue;
        };
        if actions.len() >= MAX_ACTIONS_PER_RESPONSE {
            warn!(
                "Response contains more than {} actions, ignoring the rest",
                MAX_ACTIONS_PER_RESPONSE
            );
            break;
        }

        let Some((tool_name, parameter)) = rest.trim().split_once(':') else {
            debug!("Dropping malformed action line: {}", line);
            continue;
        };
        let tool_name = tool_name.trim();
        if tool_name.is_empty() {
            debug!("Dropping action line without tool name: {}", line);
            continue;
        }

        // Length limits belong to the tool, not the parser
        let parameter = parameter.trim();
        trace!("Found action {}: {}", tool_name, parameter);
        actions.push(Action::text(tool_name, parameter));
    }

    actions
}

/// Response text with every action line removed
pub fn strip_action_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_action_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Turns `tool_use` blocks into actions, keeping their correlation ids
pub fn parse_tool_use_blocks(blocks: &[ContentBlock]) -> Vec<Action> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                if id.is_empty() {
                    warn!("Ignoring tool_use block for '{}' without id", name);
                    return None;
                }
                Some(Action {
                    id: Some(id.clone()),
                    tool_name: name.clone(),
                    parameters: ActionParameters::Named(input.clone()),
                })
            }
            _ => None,
        })
        .collect()
}
