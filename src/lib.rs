//! # react-agent
//!
//! A minimal ReAct (reason + act) agent: a language model that can call a
//! calculator and a web search tool, looping until it produces a final answer.
//!
//! ## Overview
//!
//! The crate can be used in two ways:
//!
//! 1. **As a CLI** - Run the `react-agent` binary (`demo`, `ask`, `chat`, `tools`)
//! 2. **As a library** - Drive [`ReactAgent`] with your own [`LLMClient`] or tools
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use react_agent::{AgentConfig, ConversationState, ReactAgent, ToolRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> react_agent::Result<()> {
//!     let config = react_agent::utils::config::Config::load(None)?;
//!     let client = config.provider()?.create_client()?;
//!     let agent = ReactAgent::new(
//!         Arc::from(client),
//!         Arc::new(ToolRegistry::with_default_tools()),
//!         AgentConfig::default(),
//!     )?;
//!
//!     let mut state = ConversationState::from_query("Calculate 25 * 4 + 10");
//!     let response = agent.run(&mut state).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Tools
//!
//! ```rust,ignore
//! let mut registry = ToolRegistry::with_default_tools();
//! registry.register(Arc::new(MyTool));
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - The ReAct loop controller
//! - [`llm`] - Model clients (Gemini, Ollama) and the tool execution step
//! - [`memory`] - Conversation state and session export
//! - [`tools`] - Tool trait, registry and the built-in tools
//! - [`types`] - Messages, tool calls and errors
//! - [`utils`] - Configuration
//! - [`cli`] - Command-line parsing and terminal output

#![warn(rustdoc::missing_crate_level_docs)]

/// The ReAct loop controller.
pub mod agents;
/// Command-line parsing and colored output.
pub mod cli;
/// LLM provider clients and the tool execution step.
pub mod llm;
/// Conversation state and session export.
pub mod memory;
/// Built-in tools (calculator, web search).
pub mod tools;
/// Core types (messages, tool calls, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{AgentConfig, AgentResponse, LoopPhase, ReactAgent};
pub use llm::{LLMClient, LLMResponse, Provider, ToolCallRecord};
pub use memory::{ConversationState, SessionExport};
pub use tools::registry::{Tool, ToolRegistry};
pub use types::{AppError, Message, Result, ToolCall, ToolDefinition};
