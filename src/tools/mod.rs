//! Built-in tools, their schemas, and action extraction from model output

mod definitions;
mod evaluator;
mod parse;
mod registry;
mod result;
mod types;

pub use definitions::Tools;
pub use evaluator::{EvalError, Evaluator};
pub use parse::{parse_text_actions, parse_tool_use_blocks, strip_action_lines, ACTION_MARKER};
pub use registry::{Tool, ToolRegistry};
pub use result::{ActionResult, ToolError, ToolOutput, ToolResult};
pub use types::{Action, ActionParameters};
