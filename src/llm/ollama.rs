use crate::llm::client::{http_client, GenerationParams, LLMClient, LLMResponse};
use crate::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, params: GenerationParams) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(AppError::Configuration(
                "Ollama model name is empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Configuration(format!(
                "Ollama base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        Ok(Self {
            http: http_client(params.request_timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    /// Build the `/api/chat` request body (non-streaming).
    pub fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut chat = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = &self.params.system_prompt {
            chat.push(json!({ "role": "system", "content": system }));
        }

        let mut names: HashMap<&str, &str> = HashMap::new();
        for msg in messages {
            match msg {
                Message::Human { content } => {
                    chat.push(json!({ "role": "user", "content": content }));
                }
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    if tool_calls.is_empty() {
                        chat.push(json!({ "role": "assistant", "content": content }));
                    } else {
                        let calls: Vec<Value> = tool_calls
                            .iter()
                            .map(|tc| {
                                names.insert(tc.id.as_str(), tc.name.as_str());
                                json!({
                                    "function": {
                                        "name": tc.name,
                                        "arguments": tc.arguments
                                    }
                                })
                            })
                            .collect();
                        chat.push(json!({
                            "role": "assistant",
                            "content": content,
                            "tool_calls": calls
                        }));
                    }
                }
                Message::ToolResult {
                    tool_call_id,
                    content,
                } => {
                    let mut entry = json!({ "role": "tool", "content": content });
                    if let Some(name) = names.get(tool_call_id.as_str()) {
                        entry["tool_name"] = json!(name);
                    }
                    chat.push(entry);
                }
            }
        }

        let tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    }
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": chat,
            "tools": tools,
            "stream": false,
            "options": {
                "temperature": self.params.temperature
            }
        })
    }
}

/// Parse an Ollama `/api/chat` response body.
pub fn parse_response(json: &Value) -> Result<LLMResponse> {
    let message = json
        .get("message")
        .ok_or_else(|| AppError::ModelInvocation("No message in Ollama response".into()))?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls = Vec::new();
    if let Some(tc_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tc in tc_array {
            let Some(func) = tc.get("function") else {
                continue;
            };
            let name = func
                .get("name")
                .and_then(|v| v.as_str())
                .ok_or_else(|| AppError::ModelInvocation("Tool call without a name".into()))?
                .to_string();
            // Some models send arguments as a JSON-encoded string. One that does
            // not parse is kept as-is and fails argument validation.
            let arguments = match func.get("arguments") {
                Some(Value::String(s)) => {
                    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
                }
                Some(v) => v.clone(),
                None => json!({}),
            };
            tool_calls.push(ToolCall {
                id: uuid::Uuid::new_v4().to_string(),
                name,
                arguments,
            });
        }
    }

    let finish_reason = if !tool_calls.is_empty() {
        "tool_calls".to_string()
    } else {
        json.get("done_reason")
            .and_then(|v| v.as_str())
            .unwrap_or("stop")
            .to_string()
    };

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate_with_tools_and_history(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_request(messages, tools);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ModelInvocation(format!(
                "Ollama request failed ({}): {}",
                status, text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("Failed to parse response: {}", e)))?;

        parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OllamaClient {
        OllamaClient::new(
            DEFAULT_OLLAMA_URL.to_string(),
            "llama3.1".to_string(),
            GenerationParams {
                system_prompt: Some("You are helpful.".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let result = OllamaClient::new(
            "localhost:11434".to_string(),
            "llama3.1".to_string(),
            GenerationParams::default(),
        );
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_build_request() {
        let messages = vec![
            Message::human("2+2?"),
            Message::assistant(
                "",
                vec![ToolCall::new("a", "calculator", json!({"expression": "2+2"}))],
            ),
            Message::tool_result("a", "Result: 2+2 = 4"),
        ];
        let body = client().build_request(&messages, &[]);
        let chat = body["messages"].as_array().unwrap();

        assert_eq!(chat.len(), 4);
        assert_eq!(chat[0]["role"], "system");
        assert_eq!(chat[2]["tool_calls"][0]["function"]["name"], "calculator");
        assert_eq!(chat[3]["role"], "tool");
        assert_eq!(chat[3]["tool_name"], "calculator");
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_tool_calls_with_string_arguments() {
        let body = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "search_web", "arguments": "{\"query\": \"langgraph\"}"}}]
            },
            "done": true
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.tool_calls[0].arguments["query"], "langgraph");
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_unparseable_string_arguments_are_kept() {
        use crate::tools::registry::Tool;

        let body = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"function": {"name": "calculator", "arguments": "{expression: 2+2"}}]
            }
        });
        let response = parse_response(&body).unwrap();
        let arguments = &response.tool_calls[0].arguments;
        assert_eq!(arguments, &json!("{expression: 2+2"));

        let schema = crate::tools::calculator::Calculator.parameters_schema();
        let err = crate::tools::registry::validate_arguments(&schema, arguments).unwrap_err();
        assert!(err.to_string().contains("must be an object, got string"));
    }

    #[test]
    fn test_parse_missing_message() {
        assert!(parse_response(&json!({"done": true})).is_err());
    }
}
