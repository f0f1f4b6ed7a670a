//! Tool execution step of the agent loop.
//!
//! Given the tool calls of one assistant turn, the [`ToolCoordinator`] runs
//! each against the [`ToolRegistry`] and produces exactly one record per call,
//! in call order:
//!
//! 1. Unknown tools and schema violations become error records
//! 2. Tool errors, panics and timeouts become error records
//! 3. Concurrent execution (opt-in) is joined back into call order
//!
//! Nothing escapes as an `Err`: the model sees every failure as the content of
//! a tool result and can react to it.
//!
//! # Example
//!
//! ```rust,ignore
//! let coordinator = ToolCoordinator::new(registry, ToolCallingConfig::default());
//! let records = coordinator.execute_tool_calls(&assistant_turn_calls).await;
//! let results: Vec<Message> = records.iter().map(ToolCallRecord::to_message).collect();
//! ```

use crate::tools::registry::ToolRegistry;
use crate::types::{Message, ToolCall};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Configuration for tool execution behavior.
#[derive(Debug, Clone)]
pub struct ToolCallingConfig {
    /// Whether to execute multiple tool calls of one turn concurrently.
    /// When false, tools are executed sequentially in call order.
    pub parallel_execution: bool,

    /// Timeout for individual tool execution.
    pub tool_timeout: Duration,
}

impl Default for ToolCallingConfig {
    fn default() -> Self {
        Self {
            parallel_execution: false,
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Record of a single tool call execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Identifier of the call this record answers (from the model).
    pub id: String,
    /// Name of the tool that was called.
    pub name: String,
    /// Arguments passed to the tool.
    pub arguments: serde_json::Value,
    /// Text fed back to the model: the tool output or an error description.
    pub result: String,
    /// Whether the tool execution was successful.
    pub success: bool,
    /// Time taken to execute the tool in milliseconds.
    pub duration_ms: u64,
    /// Error message if the tool failed.
    pub error: Option<String>,
}

impl ToolCallRecord {
    fn failed(call: &ToolCall, error: String, duration_ms: u64) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result: format!("Error: {}", error),
            success: false,
            duration_ms,
            error: Some(error),
        }
    }

    /// The tool result message appended to the conversation.
    pub fn to_message(&self) -> Message {
        Message::tool_result(self.id.clone(), self.result.clone())
    }
}

/// Aborts the wrapped task when dropped, so cancelled turns leave no tool running.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the tool calls of an assistant turn against a shared registry.
pub struct ToolCoordinator {
    registry: Arc<ToolRegistry>,
    config: ToolCallingConfig,
}

impl ToolCoordinator {
    pub fn new(registry: Arc<ToolRegistry>, config: ToolCallingConfig) -> Self {
        Self { registry, config }
    }

    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, ToolCallingConfig::default())
    }

    /// Execute tool calls, either concurrently or sequentially based on config.
    ///
    /// Always returns one record per call, in the order of `calls`.
    pub async fn execute_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolCallRecord> {
        if self.config.parallel_execution {
            self.execute_parallel(calls).await
        } else {
            self.execute_sequential(calls).await
        }
    }

    async fn execute_parallel(&self, calls: &[ToolCall]) -> Vec<ToolCallRecord> {
        // join_all yields results in input order regardless of completion order.
        join_all(calls.iter().map(|call| self.execute_single_tool(call))).await
    }

    async fn execute_sequential(&self, calls: &[ToolCall]) -> Vec<ToolCallRecord> {
        let mut records = Vec::with_capacity(calls.len());
        for call in calls {
            records.push(self.execute_single_tool(call).await);
        }
        records
    }

    /// Execute a single tool call on its own task, with timeout.
    async fn execute_single_tool(&self, call: &ToolCall) -> ToolCallRecord {
        let start = Instant::now();

        if !self.registry.has_tool(&call.name) {
            warn!(tool = %call.name, id = %call.id, "model requested unknown tool");
            return ToolCallRecord::failed(call, format!("Tool not found: {}", call.name), 0);
        }

        let registry = Arc::clone(&self.registry);
        let name = call.name.clone();
        let args = call.arguments.clone();
        let mut task = AbortOnDrop(tokio::spawn(async move {
            registry.execute(&name, args).await
        }));

        let outcome = timeout(self.config.tool_timeout, &mut task.0).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let record = match outcome {
            Ok(Ok(Ok(output))) => ToolCallRecord {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                result: output,
                success: true,
                duration_ms,
                error: None,
            },
            Ok(Ok(Err(e))) => ToolCallRecord::failed(call, e.to_string(), duration_ms),
            Ok(Err(join_error)) => ToolCallRecord::failed(
                call,
                format!("Tool '{}' crashed: {}", call.name, join_error),
                duration_ms,
            ),
            Err(_) => ToolCallRecord::failed(
                call,
                format!(
                    "Tool execution timed out after {}ms",
                    self.config.tool_timeout.as_millis()
                ),
                duration_ms,
            ),
        };

        debug!(
            tool = %record.name,
            id = %record.id,
            success = record.success,
            duration_ms = record.duration_ms,
            "tool call finished"
        );
        record
    }

    /// Get a reference to the tool registry.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &ToolCallingConfig {
        &self.config
    }
}
