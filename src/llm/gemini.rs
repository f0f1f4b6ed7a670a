use crate::llm::client::{http_client, GenerationParams, LLMClient, LLMResponse};
use crate::types::{AppError, Message, Result, ToolCall, ToolDefinition};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: GenerationParams,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        api_base: String,
        model: String,
        params: GenerationParams,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "Gemini API key is not set".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(AppError::Configuration(
                "Gemini model name is empty".to_string(),
            ));
        }

        Ok(Self {
            http: http_client(params.request_timeout)?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    /// Build the `generateContent` request body.
    pub fn build_request(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "contents": encode_contents(messages),
            "generationConfig": {
                "temperature": self.params.temperature
            }
        });

        if !tools.is_empty() {
            let declarations: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        if let Some(system) = &self.params.system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }
}

/// Map the conversation onto Gemini `contents`.
///
/// Gemini has no tool-call ids, so each result is sent as a `functionResponse`
/// carrying the name of the call it answers. Consecutive results are grouped
/// into one turn.
fn encode_contents(messages: &[Message]) -> Vec<Value> {
    let mut names: HashMap<&str, &str> = HashMap::new();
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_responses: Vec<Value> = Vec::new();

    for message in messages {
        if !matches!(message, Message::ToolResult { .. }) && !pending_responses.is_empty() {
            contents.push(json!({ "role": "user", "parts": std::mem::take(&mut pending_responses) }));
        }

        match message {
            Message::Human { content } => {
                contents.push(json!({ "role": "user", "parts": [{ "text": content }] }));
            }
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let mut parts = Vec::new();
                if !content.is_empty() || tool_calls.is_empty() {
                    parts.push(json!({ "text": content }));
                }
                for call in tool_calls {
                    names.insert(call.id.as_str(), call.name.as_str());
                    parts.push(json!({
                        "functionCall": { "name": call.name, "args": call.arguments }
                    }));
                }
                contents.push(json!({ "role": "model", "parts": parts }));
            }
            Message::ToolResult {
                tool_call_id,
                content,
            } => {
                let name = names.get(tool_call_id.as_str()).copied().unwrap_or("unknown");
                pending_responses.push(json!({
                    "functionResponse": {
                        "name": name,
                        "response": { "content": content }
                    }
                }));
            }
        }
    }

    if !pending_responses.is_empty() {
        contents.push(json!({ "role": "user", "parts": pending_responses }));
    }

    contents
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Parse a `generateContent` response body.
pub fn parse_response(body: Value) -> Result<LLMResponse> {
    let response: GenerateContentResponse = serde_json::from_value(body)
        .map_err(|e| AppError::ModelInvocation(format!("Malformed Gemini response: {}", e)))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(AppError::ModelInvocation(format!(
            "Gemini returned no answer: {}",
            reason
        )));
    };

    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            content.push_str(&text);
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: call
                    .id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                name: call.name,
                arguments: call.args.unwrap_or_else(|| json!({})),
            });
        }
    }

    let finish_reason = if tool_calls.is_empty() {
        candidate
            .finish_reason
            .map(|r| r.to_lowercase())
            .unwrap_or_else(|| "stop".to_string())
    } else {
        "tool_calls".to_string()
    };

    Ok(LLMResponse {
        content,
        tool_calls,
        finish_reason,
    })
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate_with_tools_and_history(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let body = self.build_request(messages, tools);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ModelInvocation(format!(
                "Gemini API error ({}): {}",
                status, text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AppError::ModelInvocation(format!("Failed to parse response: {}", e)))?;

        parse_response(json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(system_prompt: Option<&str>) -> GeminiClient {
        GeminiClient::new(
            "key".to_string(),
            format!("{}/", DEFAULT_GEMINI_API_BASE),
            "gemini-1.5-flash".to_string(),
            GenerationParams {
                system_prompt: system_prompt.map(String::from),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client(None).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_encode_contents_groups_function_responses() {
        let messages = vec![
            Message::human("Calculate 2+2 and 3+3"),
            Message::assistant(
                "",
                vec![
                    ToolCall::new("a", "calculator", json!({"expression": "2+2"})),
                    ToolCall::new("b", "calculator", json!({"expression": "3+3"})),
                ],
            ),
            Message::tool_result("a", "Result: 2+2 = 4"),
            Message::tool_result("b", "Result: 3+3 = 6"),
            Message::assistant("4 and 6", vec![]),
        ];

        let contents = encode_contents(&messages);
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "calculator");

        let responses = contents[2]["parts"].as_array().unwrap();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1]["functionResponse"]["name"], "calculator");
        assert_eq!(
            responses[1]["functionResponse"]["response"]["content"],
            "Result: 3+3 = 6"
        );
        assert_eq!(contents[3]["parts"][0]["text"], "4 and 6");
    }

    #[test]
    fn test_build_request_includes_tools_and_system() {
        let tools = vec![ToolDefinition {
            name: "calculator".to_string(),
            description: "math".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let body = client(Some("Be brief.")).build_request(&[Message::human("hi")], &tools);

        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "calculator");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(body["generationConfig"]["temperature"], 0.0);

        let bare = client(None).build_request(&[Message::human("hi")], &[]);
        assert!(bare.get("tools").is_none());
        assert!(bare.get("systemInstruction").is_none());
    }

    #[test]
    fn test_parse_text_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "LangGraph is "}, {"text": "a library."}]},
                "finishReason": "STOP"
            }]
        });
        let response = parse_response(body).unwrap();
        assert_eq!(response.content, "LangGraph is a library.");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.finish_reason, "stop");
    }

    #[test]
    fn test_parse_function_call_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "calculator", "args": {"expression": "25 * 4 + 10"}}}
                ]},
                "finishReason": "STOP"
            }]
        });
        let response = parse_response(body).unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "calculator");
        assert_eq!(response.tool_calls[0].arguments["expression"], "25 * 4 + 10");
        assert!(!response.tool_calls[0].id.is_empty());
        assert_eq!(response.finish_reason, "tool_calls");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, AppError::ModelInvocation(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_malformed_response() {
        let err = parse_response(json!({"candidates": "nope"})).unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }
}
