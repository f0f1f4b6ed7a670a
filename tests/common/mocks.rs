//! Mock implementations for testing.
//!
//! This module provides deterministic model stubs that can be used across
//! different test files without duplication. None of them touch the network.

use async_trait::async_trait;
use react_agent::llm::{LLMClient, LLMResponse};
use react_agent::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Model stub that replays a script of responses and records every request.
///
/// Each invocation pops the next scripted entry; once the script runs out the
/// client fails with a `ModelInvocation` error, so a test that loops further
/// than expected fails loudly.
///
/// # Examples
///
/// ```ignore
/// let client = ScriptedLLMClient::new(vec![
///     Ok(LLMResponse::tool_calls("", vec![calculator_call("c1", "2 + 2")])),
///     Ok(LLMResponse::text("4")),
/// ]);
/// ```
pub struct ScriptedLLMClient {
    script: Mutex<VecDeque<Result<LLMResponse>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    tools_seen: Mutex<Vec<Vec<String>>>,
    delay: Option<Duration>,
}

impl ScriptedLLMClient {
    pub fn new(script: Vec<Result<LLMResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            tools_seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Script where every response succeeds.
    pub fn responses(responses: Vec<LLMResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// Wait `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Histories received, one per invocation.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    /// Tool names offered, one list per invocation.
    pub fn tools_seen(&self) -> Vec<Vec<String>> {
        self.tools_seen.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn generate_with_tools_and_history(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.tools_seen
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::ModelInvocation("script exhausted".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Model stub that requests the calculator on every turn and never answers.
pub struct AlwaysToolCallClient {
    calls: AtomicUsize,
}

impl AlwaysToolCallClient {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for AlwaysToolCallClient {
    async fn generate_with_tools_and_history(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LLMResponse::tool_calls(
            "",
            vec![calculator_call(&format!("call-{}", n), "1 + 1")],
        ))
    }

    fn model_name(&self) -> &str {
        "always-tool-call"
    }
}

/// Model stub that always fails.
pub struct FailingLLMClient;

#[async_trait]
impl LLMClient for FailingLLMClient {
    async fn generate_with_tools_and_history(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        Err(AppError::ModelInvocation("quota exceeded".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing-model"
    }
}

pub fn calculator_call(id: &str, expression: &str) -> ToolCall {
    ToolCall::new(id, "calculator", json!({ "expression": expression }))
}

pub fn search_call(id: &str, query: &str) -> ToolCall {
    ToolCall::new(id, "search_web", json!({ "query": query }))
}
