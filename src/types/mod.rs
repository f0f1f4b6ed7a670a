use serde::{Deserialize, Serialize};

// ============= Message Types =============

/// A single entry in a conversation.
///
/// The three kinds are matched exhaustively wherever their handling differs
/// (provider request encoding, rendering, invariant checks). Serialized with a
/// `type` tag, which is also the session export format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Text typed by the user.
    Human { content: String },

    /// A model turn: a final answer, a request to run tools, or both.
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },

    /// The textual outcome of one tool call.
    ToolResult {
        tool_call_id: String,
        content: String,
    },
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::ToolResult {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Text content of the message, whatever its kind.
    pub fn content(&self) -> &str {
        match self {
            Message::Human { content }
            | Message::Assistant { content, .. }
            | Message::ToolResult { content, .. } => content,
        }
    }

    /// Tool calls requested by this message (empty unless it is an assistant turn).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            Message::Human { .. } | Message::ToolResult { .. } => &[],
        }
    }

    /// Short kind label, as used in logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Human { .. } => "human",
            Message::Assistant { .. } => "assistant",
            Message::ToolResult { .. } => "tool_result",
        }
    }
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A structured request, emitted by the model, to run one registered tool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid credentials or model configuration. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network, quota or malformed-response failure from the model backend.
    #[error("Model invocation error: {0}")]
    ModelInvocation(String),

    /// A tool failed. Converted into tool result content by the tool execution step.
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// The loop guard tripped before the model produced a final answer.
    #[error("max iterations exceeded ({max_iterations})")]
    LoopLimitExceeded { max_iterations: usize },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Whether a caller may reasonably retry the failed operation.
    ///
    /// The agent core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ModelInvocation(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serialization_is_tagged() {
        let msg = Message::assistant(
            "",
            vec![ToolCall::new("call_1", "calculator", json!({"expression": "2+2"}))],
        );
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "assistant");
        assert_eq!(value["tool_calls"][0]["name"], "calculator");

        let human = serde_json::to_value(Message::human("hi")).unwrap();
        assert_eq!(human, json!({"type": "human", "content": "hi"}));
    }

    #[test]
    fn test_message_roundtrip_through_json() {
        let msg = Message::tool_result("call_1", "Result: 2+2 = 4");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_final_answer_omits_tool_calls() {
        let json = serde_json::to_string(&Message::assistant("done", vec![])).unwrap();
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_accessors() {
        let msg = Message::human("What is LangGraph?");
        assert_eq!(msg.content(), "What is LangGraph?");
        assert!(msg.tool_calls().is_empty());
        assert_eq!(msg.kind(), "human");
    }

    #[test]
    fn test_error_display_and_retryability() {
        let err = AppError::LoopLimitExceeded { max_iterations: 25 };
        assert_eq!(err.to_string(), "max iterations exceeded (25)");
        assert!(!err.is_retryable());
        assert!(AppError::ModelInvocation("quota".into()).is_retryable());
        assert!(!AppError::Configuration("no key".into()).is_retryable());
    }
}
