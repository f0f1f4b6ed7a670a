//! Built-in Tools for Agent Capabilities
//!
//! This module provides the tools the model may request during the agent loop.
//!
//! # Module Structure
//!
//! - [`calculator`](crate::tools::calculator) - Arithmetic expression evaluation
//! - [`search`](crate::tools::search) - Web search over a canned keyword table
//! - [`registry`](crate::tools::registry) - Tool registration, argument validation and dispatch
//!
//! # Tool Registry
//!
//! ```ignore
//! let registry = ToolRegistry::with_default_tools();
//! let schemas = registry.get_tool_definitions();
//! let reply = registry.execute("calculator", json!({"expression": "2+2"})).await?;
//! assert_eq!(reply, "Result: 2+2 = 4");
//! ```
//!
//! New tools implement [`Tool`] and are registered before the registry is
//! shared; after that it is read-only.

/// Calculator tool for arithmetic expressions.
pub mod calculator;
/// Tool registry for managing available tools.
pub mod registry;
/// Canned web search tool.
pub mod search;

pub use registry::{Tool, ToolRegistry};
