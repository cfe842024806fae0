use crate::agent::{Agent, AgentError, StepResponse, ToolSyntax};
use crate::tools::ActionResult;
use anyhow::Result;
use crossterm::style::{Color, Stylize};
use rustyline::{error::ReadlineError, history::DefaultHistory, Config, Editor};
use std::io::{self, Write};
use tracing::debug;

const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

fn is_quit_command(input: &str) -> bool {
    QUIT_COMMANDS.contains(&input.to_lowercase().as_str())
}

fn banner(syntax: ToolSyntax) -> &'static str {
    match syntax {
        ToolSyntax::Text => "Simple Agent (Manual Parsing)",
        ToolSyntax::Native => "Advanced Agent (Native Tool Use)",
    }
}

fn format_action_result(action_result: &ActionResult) -> String {
    let (symbol, color) = if action_result.result.is_success() {
        ("✓", Color::Green)
    } else {
        ("✗", Color::Red)
    };
    // Indent continuation lines of multi-line results
    let message = action_result
        .result
        .format_message()
        .replace('\n', "\n     ");
    format!(
        "   {} {} {}",
        symbol.with(color),
        action_result.action.to_string().bold(),
        message
    )
}

fn write_actions(writer: &mut dyn Write, actions: &[ActionResult]) -> io::Result<()> {
    if actions.is_empty() {
        return Ok(());
    }
    writeln!(writer, "\n{}", "[Actions]".with(Color::DarkGrey))?;
    for action_result in actions {
        writeln!(writer, "{}", format_action_result(action_result))?;
    }
    Ok(())
}

fn write_response(writer: &mut dyn Write, response: &StepResponse) -> io::Result<()> {
    write_actions(writer, &response.actions)?;
    if !response.text.is_empty() {
        writeln!(writer, "\n{} {}", ">> Agent:".with(Color::Green).bold(), response.text)?;
    }
    writer.flush()
}

fn write_error(writer: &mut dyn Write, error: &AgentError) -> io::Result<()> {
    if let AgentError::IterationLimitExceeded { completed, .. } = error {
        write_actions(writer, completed)?;
    }
    writeln!(writer, "\n{} {}", "Error:".with(Color::Red).bold(), error)?;
    writer.flush()
}

/// Interactive loop around one agent session
pub struct Repl {
    line_editor: Editor<(), DefaultHistory>,
}

impl Repl {
    pub fn new() -> Result<Self> {
        let config = Config::builder()
            .edit_mode(rustyline::EditMode::Emacs)
            .build();
        let line_editor = Editor::with_config(config)?;
        Ok(Self { line_editor })
    }

    /// Reads the next non-empty line. `None` means the user wants to leave.
    fn read_input(&mut self) -> Result<Option<String>> {
        let prompt = format!("\n{} ", ">> You:".with(Color::Blue).bold());
        loop {
            match self.line_editor.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    if is_quit_command(input) {
                        return Ok(None);
                    }
                    let _ = self.line_editor.add_history_entry(input);
                    return Ok(Some(input.to_string()));
                }
                // Ctrl-C / Ctrl-D
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn run(&mut self, agent: &mut Agent) -> Result<()> {
        let mut stdout = io::stdout();
        let rule = "=".repeat(60);
        writeln!(stdout, "{}", rule)?;
        writeln!(stdout, "{}", banner(agent.tool_syntax()).bold())?;
        writeln!(stdout, "{}", rule)?;
        writeln!(stdout, "Type 'quit' or 'exit' to end the conversation")?;
        writeln!(stdout, "Try: 'Calculate 15 * 7' or 'Remember to buy milk'")?;

        while let Some(input) = self.read_input()? {
            match agent.run_step(&input).await {
                Ok(response) => write_response(&mut stdout, &response)?,
                // The session stays usable after a failed turn
                Err(error) => write_error(&mut stdout, &error)?,
            }
        }

        let usage = agent.usage();
        debug!(
            "Session used {} input and {} output tokens",
            usage.input_tokens, usage.output_tokens
        );
        writeln!(stdout, "\nGoodbye!")?;
        Ok(())
    }
}
