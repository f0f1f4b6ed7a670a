//! Conversation memory for the agent loop.
//!
//! This module provides:
//! - [`ConversationState`]: the ordered, append-only message history threaded
//!   through every decide/act step
//! - [`SessionExport`]: a JSON document of a finished session
//!
//! Every append is checked against the tool-call invariant: a tool result may
//! only answer a call emitted by the assistant turn directly before it, and a
//! new human or assistant message may only follow once every outstanding call
//! has been answered.

use crate::types::{AppError, Message, Result, ToolCall};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered message history for one session.
///
/// Insertion order is the causal order and is replayed to the model as is.
/// Messages are never edited or removed; the only mutation is appending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Message>", into = "Vec<Message>")]
pub struct ConversationState {
    messages: Vec<Message>,
    /// Ids of calls in the latest assistant turn that have no result yet.
    pending: Vec<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh state holding a single human message.
    pub fn from_query(query: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(query)],
            pending: Vec::new(),
        }
    }

    /// Append one message, rejecting it if it would break the tool-call invariant.
    pub fn push(&mut self, message: Message) -> Result<()> {
        self.pending = advance_pending(&self.pending, &message)?;
        self.messages.push(message);
        Ok(())
    }

    /// Append a human message.
    pub fn push_human(&mut self, content: impl Into<String>) -> Result<()> {
        self.push(Message::human(content))
    }

    /// Append several messages atomically: either all are appended or none.
    pub fn extend(&mut self, messages: Vec<Message>) -> Result<()> {
        let mut pending = self.pending.clone();
        for message in &messages {
            pending = advance_pending(&pending, message)?;
        }
        self.pending = pending;
        self.messages.extend(messages);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m, Message::Assistant { .. }))
    }

    /// Content of the final answer, if the conversation ends on one.
    pub fn final_answer(&self) -> Option<&str> {
        match self.messages.last() {
            Some(Message::Assistant {
                content,
                tool_calls,
            }) if tool_calls.is_empty() => Some(content),
            _ => None,
        }
    }

    /// Calls from the latest assistant turn that still await a result, in call order.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        self.last_assistant()
            .map(|m| {
                m.tool_calls()
                    .iter()
                    .filter(|call| self.pending.contains(&call.id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_pending_tool_calls(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Name of the tool a result id refers to, looked up in the assistant
    /// turns of this conversation.
    pub fn tool_name_for(&self, tool_call_id: &str) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .flat_map(|m| m.tool_calls())
            .find(|call| call.id == tool_call_id)
            .map(|call| call.name.as_str())
    }

    /// Answer every outstanding call with an error result carrying `reason`.
    ///
    /// Used when a user abandons a turn mid-action so that the conversation can
    /// accept new human input.
    pub fn close_pending(&mut self, reason: &str) -> Result<usize> {
        let results: Vec<Message> = self
            .pending_tool_calls()
            .into_iter()
            .map(|call| Message::tool_result(call.id.clone(), format!("Error: {}", reason)))
            .collect();
        let count = results.len();
        self.extend(results)?;
        Ok(count)
    }
}

impl TryFrom<Vec<Message>> for ConversationState {
    type Error = AppError;

    fn try_from(messages: Vec<Message>) -> Result<Self> {
        let mut state = ConversationState::new();
        state.extend(messages)?;
        Ok(state)
    }
}

impl From<ConversationState> for Vec<Message> {
    fn from(state: ConversationState) -> Self {
        state.messages
    }
}

/// Outstanding call ids after `message` is appended to a conversation whose
/// outstanding ids are `pending`.
fn advance_pending(pending: &[String], message: &Message) -> Result<Vec<String>> {
    match message {
        Message::Human { .. } => {
            if !pending.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "cannot add a human message while {} tool call(s) await results",
                    pending.len()
                )));
            }
            Ok(Vec::new())
        }
        Message::Assistant { tool_calls, .. } => {
            if !pending.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "cannot add an assistant message while {} tool call(s) await results",
                    pending.len()
                )));
            }
            let mut ids: Vec<String> = Vec::with_capacity(tool_calls.len());
            for call in tool_calls {
                if ids.contains(&call.id) {
                    return Err(AppError::InvalidInput(format!(
                        "duplicate tool call id: {}",
                        call.id
                    )));
                }
                ids.push(call.id.clone());
            }
            Ok(ids)
        }
        Message::ToolResult { tool_call_id, .. } => {
            let Some(pos) = pending.iter().position(|id| id == tool_call_id) else {
                return Err(AppError::InvalidInput(format!(
                    "tool result references unknown or already answered call: {}",
                    tool_call_id
                )));
            };
            let mut rest = pending.to_vec();
            rest.remove(pos);
            Ok(rest)
        }
    }
}

/// Structured document of a session, written by `--export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExport {
    pub exported_at: DateTime<Utc>,
    pub model: String,
    pub messages: Vec<Message>,
}

impl SessionExport {
    pub fn new(model: impl Into<String>, state: &ConversationState) -> Self {
        Self {
            exported_at: Utc::now(),
            model: model.into(),
            messages: state.messages().to_vec(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Rebuild a resumable conversation from the exported messages.
    pub fn into_state(self) -> Result<ConversationState> {
        ConversationState::try_from(self.messages)
    }
}
