//! LLM Provider Clients and Abstractions
//!
//! This module provides the model invocation boundary of the agent. Backends
//! implement [`LLMClient`]; the agent never sees anything provider-specific.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection, validated at client construction
//! - [`ToolCoordinator`] - Executes the tool calls a model turn requested
//!
//! # Example
//!
//! ```ignore
//! use react_agent::llm::Provider;
//!
//! let client = config.provider()?.create_client()?;
//! let response = client
//!     .generate_with_tools_and_history(state.messages(), &registry.get_tool_definitions())
//!     .await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Tool execution step of the agent loop.
pub mod coordinator;
/// Google Gemini REST backend.
pub mod gemini;
/// Local Ollama backend.
pub mod ollama;

pub use client::{GenerationParams, LLMClient, LLMResponse, Provider};
pub use coordinator::{ToolCallRecord, ToolCallingConfig, ToolCoordinator};
