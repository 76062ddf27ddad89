//! Web search tool
//!
//! Sends a keyword to the search endpoint and renders a bounded text summary
//! of the results for the model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::SearchConfig;
use crate::core::{Config, FerretError, Result, ToolDefinition};
use crate::tools::Tool;

/// Search request body
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    keywords: [&'a str; 1],
    max_results: u32,
}

/// Search endpoint response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub queries: Vec<QueryResult>,
    #[serde(default)]
    pub combined_answer: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
}

/// Results for one keyword
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub response: Option<QueryResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

/// One search result entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl SearchResponse {
    /// Results of the first query, empty when the endpoint returned none
    pub fn hits(&self) -> &[SearchHit] {
        self.queries
            .first()
            .and_then(|q| q.response.as_ref())
            .map(|r| r.results.as_slice())
            .unwrap_or(&[])
    }

    /// Results of the first query, requiring the endpoint to have answered it
    pub fn require_hits(&self) -> Result<&[SearchHit]> {
        if self.queries.is_empty() {
            return Err(FerretError::protocol(
                "search endpoint returned a response without queries",
            ));
        }
        Ok(self.hits())
    }
}

/// Backend that answers keyword searches
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, keyword: &str, max_results: u32) -> Result<SearchResponse>;
}

/// HTTP client for the search endpoint
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    search_url: String,
    token: Option<String>,
}

impl SearchClient {
    /// Create a new client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.search_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            search_url: config.search_url(),
            token: config.api.token.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, keyword: &str, max_results: u32) -> Result<SearchResponse> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| FerretError::config("AI_BUILDER_TOKEN is not configured"))?;

        let response = self
            .client
            .post(&self.search_url)
            .bearer_auth(token)
            .json(&SearchRequest {
                keywords: [keyword],
                max_results,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FerretError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| FerretError::protocol(format!("failed to parse search response: {}", e)))
    }
}

/// The `search` tool offered to the model
pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
    settings: SearchConfig,
}

impl SearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>, settings: SearchConfig) -> Self {
        Self { provider, settings }
    }

    /// Requested result count, clamped to the configured range
    fn max_results(&self, arguments: &Value) -> u32 {
        let cap = self.settings.max_results_cap.max(1);
        arguments
            .get("max_results")
            .and_then(Value::as_i64)
            .map(|n| n.clamp(1, i64::from(cap)) as u32)
            .unwrap_or_else(|| self.settings.default_max_results.clamp(1, cap))
    }
}

fn keyword(arguments: &Value) -> Option<&str> {
    arguments
        .get("keyword")
        .and_then(Value::as_str)
        .filter(|k| !k.trim().is_empty())
}

#[async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            "search",
            "Search the web for up-to-date information and real-time data. You must use this \
             tool when the user asks about recent events, the latest news, current information, \
             live data, or anything that needs a web search to answer. Questions mentioning \
             'recent', 'latest', 'now' or 'current', or about facts you may not know yet, \
             should always trigger a search.",
            json!({
                "type": "object",
                "properties": {
                    "keyword": {
                        "type": "string",
                        "description": "Keywords to search for; should carry the core of the question"
                    },
                    "max_results": {
                        "type": "integer",
                        "description": "Maximum number of results, default 6, at most 20",
                        "default": self.settings.default_max_results,
                        "minimum": 1,
                        "maximum": self.settings.max_results_cap
                    }
                },
                "required": ["keyword"]
            }),
        )
    }

    fn describe(&self, arguments: &Value) -> String {
        format!("Searching: {}", keyword(arguments).unwrap_or(""))
    }

    fn completion_label(&self) -> String {
        "Search complete".to_string()
    }

    async fn call(&self, arguments: Value) -> Result<String> {
        let keyword = keyword(&arguments)
            .ok_or_else(|| FerretError::tool("error: search keyword must not be empty"))?;
        let max_results = self.max_results(&arguments);

        tracing::info!(keyword, max_results, "executing search");

        let response = self
            .provider
            .search(keyword, max_results)
            .await
            .map_err(|e| {
                tracing::warn!(keyword, error = %e, "search failed");
                FerretError::tool(format!("search failed: {}", e))
            })?;

        let hits = response.hits();
        tracing::info!(keyword, results = hits.len(), "search complete");
        if hits.is_empty() {
            tracing::warn!(keyword, "search returned no results");
        }

        Ok(format_results(
            keyword,
            hits,
            self.settings.result_limit,
            self.settings.snippet_chars,
        ))
    }
}

/// Render search hits as the text block handed back to the model
pub fn format_results(keyword: &str, hits: &[SearchHit], limit: usize, snippet_chars: usize) -> String {
    let mut output = format!("Search keyword: {}\n\n", keyword);

    if hits.is_empty() {
        output.push_str("No results found.\n");
        return output;
    }

    output.push_str(&format!("Found {} results:\n\n", hits.len()));
    for (i, hit) in hits.iter().take(limit).enumerate() {
        output.push_str(&format!(
            "{}. {}\n",
            i + 1,
            hit.title.as_deref().unwrap_or("N/A")
        ));
        output.push_str(&format!("   URL: {}\n", hit.url.as_deref().unwrap_or("N/A")));
        if let Some(content) = hit.content.as_deref().filter(|c| !c.is_empty()) {
            output.push_str(&format!(
                "   Content: {}\n",
                truncate_chars(content, snippet_chars)
            ));
        }
        output.push('\n');
    }

    output
}

/// Keep the first `max` characters, marking the cut with an ellipsis
fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
