//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the react-agent CLI.
//! Answers and conversation steps go to stdout; errors go to stderr.

use crate::agents::react::Step;
use crate::types::{Message, ToolCall, ToolDefinition};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Tool output longer than this is shortened in step listings.
const MAX_RESULT_PREVIEW: usize = 240;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the session banner
    pub fn banner(&self, provider: &str, model: &str) {
        if self.colored {
            println!(
                "\n  {} {}",
                "ReAct Agent".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
            println!("  {}\n", format!("{} · {}", provider, model).dimmed());
        } else {
            println!(
                "\n  ReAct Agent v{}\n  {} / {}\n",
                env!("CARGO_PKG_VERSION"),
                provider,
                model
            );
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {}", message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print the user's question
    pub fn question(&self, query: &str) {
        if self.colored {
            println!("\n  {} {}", "Q:".bright_cyan().bold(), query.bright_white());
        } else {
            println!("\n  Q: {}", query);
        }
    }

    /// Print a final answer
    pub fn answer(&self, content: &str) {
        if self.colored {
            println!("  {} {}", "A:".green().bold(), content);
        } else {
            println!("  A: {}", content);
        }
    }

    /// Print the messages a loop step appended
    pub fn step(&self, step: &Step) {
        for message in &step.emitted {
            self.message(message);
        }
    }

    /// Print one conversation message
    pub fn message(&self, message: &Message) {
        match message {
            Message::Human { content } => self.question(content),
            Message::Assistant {
                content,
                tool_calls,
            } if tool_calls.is_empty() => self.answer(content),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if !content.trim().is_empty() {
                    self.thought(content);
                }
                for call in tool_calls {
                    self.tool_call(call);
                }
            }
            Message::ToolResult {
                tool_call_id,
                content,
            } => self.tool_result(tool_call_id, content),
        }
    }

    fn thought(&self, content: &str) {
        if self.colored {
            println!("  {}", content.dimmed().italic());
        } else {
            println!("  ... {}", content);
        }
    }

    /// Print a tool request
    pub fn tool_call(&self, call: &ToolCall) {
        let line = format_tool_call(call);
        if self.colored {
            println!("  {} {}", "→".yellow().bold(), line.yellow());
        } else {
            println!("  -> {}", line);
        }
    }

    /// Print a tool result
    pub fn tool_result(&self, tool_call_id: &str, content: &str) {
        let preview = truncate(content, MAX_RESULT_PREVIEW);
        let failed = content.starts_with("Error:");
        if self.colored {
            if failed {
                println!("  {} {}", "←".red().bold(), preview.red());
            } else {
                println!("  {} {}", "←".blue().bold(), preview);
            }
            println!("    {}", format!("[{}]", tool_call_id).dimmed());
        } else {
            println!("  <- {} [{}]", preview, tool_call_id);
        }
    }

    /// Print the tool listing
    pub fn tools(&self, definitions: &[ToolDefinition]) {
        self.header("Tools");
        for tool in definitions {
            if self.colored {
                println!("\n    {}", tool.name.bright_white().bold());
                println!("    {}", tool.description.dimmed());
            } else {
                println!("\n    {}", tool.name);
                println!("    {}", tool.description);
            }
            for (name, kind) in parameter_summary(&tool.parameters) {
                self.kv(&name, &kind);
            }
        }
        println!();
    }

    /// Print the interactive prompt without a newline
    pub fn prompt(&self) {
        if self.colored {
            print!("{} ", ">".bright_cyan().bold());
        } else {
            print!("> ");
        }
        io::stdout().flush().ok();
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

/// `name(arg=value, ...)` rendering of a tool call.
pub fn format_tool_call(call: &ToolCall) -> String {
    let args = match call.arguments.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}={:?}", k, s),
                None => format!("{}={}", k, v),
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => call.arguments.to_string(),
    };
    format!("{}({})", call.name, args)
}

/// Parameter names with their type, required ones marked.
fn parameter_summary(schema: &serde_json::Value) -> Vec<(String, String)> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut params: Vec<(String, String)> = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| {
                    let kind = prop
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("any")
                        .to_string();
                    let kind = if required.contains(&name.as_str()) {
                        format!("{} (required)", kind)
                    } else {
                        kind
                    };
                    (name.clone(), kind)
                })
                .collect()
        })
        .unwrap_or_default();
    params.sort();
    params
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}
