//! CLI module for react-agent
//!
//! Provides command-line interface parsing for the `react-agent` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::types::Result;
use crate::utils::config::{Config, ProviderKind};
use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// react-agent - a minimal ReAct agent
///
/// Answers questions by alternating between a language model and local tools
/// until the model produces a final answer.
#[derive(Parser, Debug)]
#[command(
    name = "react-agent",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "A minimal ReAct agent: a language model with a calculator and a web search tool",
    long_about = "Runs the ReAct loop: the model decides, tools act, and the loop repeats\n\
                  until the model answers without requesting a tool.\n\n\
                  Gemini is used by default and reads its key from GOOGLE_API_KEY\n\
                  (a .env file in the working directory is honored).",
    after_help = "EXAMPLES:\n    \
                  react-agent demo                              # Run the three sample queries\n    \
                  react-agent ask \"Calculate 25 * 4 + 10\"       # Answer one question\n    \
                  react-agent ask --stream \"What is LangGraph?\" # Show every step\n    \
                  react-agent chat --export session.json        # Interactive session, saved on exit\n    \
                  react-agent --provider ollama --model llama3.1 chat"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to react-agent.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output (any non-false NO_COLOR value also disables it)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Model backend (overrides config)
    #[arg(long, global = true, value_parser = parse_provider)]
    pub provider: Option<ProviderKind>,

    /// Model to use (overrides config)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Maximum model invocations per question (overrides config)
    #[arg(long, global = true)]
    pub max_iterations: Option<usize>,

    /// Write the conversation as JSON to this file when done
    #[arg(long, global = true)]
    pub export: Option<PathBuf>,

    /// Subcommand to execute (defaults to `demo`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Answer a single question
    Ask {
        /// The question to answer
        query: String,

        /// Print every step (tool requests and results), not just the answer
        #[arg(short, long)]
        stream: bool,
    },

    /// Interactive session; the conversation carries over between questions
    ///
    /// Type `clear` to start over and `exit` or `quit` to leave. Ctrl-C
    /// abandons the current question, or leaves when pressed at the prompt.
    Chat,

    /// Run the built-in sample queries
    Demo,

    /// List the available tools and their parameters
    Tools,
}

fn parse_provider(value: &str) -> std::result::Result<ProviderKind, String> {
    value.parse().map_err(|e: crate::types::AppError| e.to_string())
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Load configuration and layer the command-line overrides on top.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(max_iterations) = self.max_iterations {
            config.agent.max_iterations = max_iterations;
        }
    }

    /// The subcommand to run, `demo` when none was given.
    pub fn command_or_default(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Demo)
    }
}
