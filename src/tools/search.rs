//! Web search tool backed by a fixed table of canned snippets.
//!
//! Queries are matched case-insensitively against a small keyword table. The
//! contract (string in, string out) is the same one a real search backend
//! would implement, so the table can be swapped out without touching the
//! agent loop.

use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Keyword to snippet table, checked in order.
const CANNED_RESULTS: &[(&str, &str)] = &[
    (
        "langgraph",
        "LangGraph is a library for building stateful, multi-actor applications with LLMs.",
    ),
    (
        "react agent",
        "ReAct (Reasoning and Acting) is a paradigm that combines reasoning and action in LLM agents.",
    ),
    (
        "gemini api",
        "Google Gemini API provides access to Google's multimodal AI models.",
    ),
];

/// Web search tool over canned results
pub struct SearchTool {
    entries: Vec<(String, String)>,
}

impl SearchTool {
    pub fn new() -> Self {
        Self::with_entries(
            CANNED_RESULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    /// Build a search tool over a custom keyword table. Keywords are lowercased.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect(),
        }
    }

    /// Look `query` up in the table and format the reply.
    pub fn search(&self, query: &str) -> String {
        let query_lower = query.to_lowercase();
        match self
            .entries
            .iter()
            .find(|(keyword, _)| query_lower.contains(keyword.as_str()))
        {
            Some((_, snippet)) => format!("Search results for '{}': {}", query, snippet),
            None => format!(
                "Search results for '{}': No specific results found. This is a mock search tool.",
                query
            ),
        }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for information."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query string"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::InvalidInput("Missing 'query' parameter".to_string()))?;

        Ok(self.search(query))
    }
}
