//! Web search through the Serper API
//!
//! The model supplies only a `query`; the tool posts it to `/search` and
//! renders the organic results as plain text the model can read.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::SearchSettings;
use crate::error::{Error, Result};
use crate::types::ToolDefinition;

use super::{Tool, ToolKind};

/// Function name the model sees
pub const SEARCH_FUNCTION: &str = "web_search";

/// Most organic results one query may request
pub const MAX_SEARCH_RESULTS: u32 = 20;

/// Configuration for the Serper client
#[derive(Debug, Clone)]
pub struct SerperConfig {
    pub base_url: String,
    pub api_key: String,
    pub num_results: u32,
    pub timeout_secs: u64,
}

impl SerperConfig {
    pub fn from_settings(settings: &SearchSettings, api_key: impl Into<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            num_results: settings.num_results,
            timeout_secs: settings.timeout_secs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default, rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Serper-backed web search
pub struct SerperSearchTool {
    config: SerperConfig,
    client: Client,
}

impl SerperSearchTool {
    pub fn new(config: SerperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::tool_failed(SEARCH_FUNCTION, format!("HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn search(&self, query: &str, num: u32) -> Result<SerperResponse> {
        let url = format!("{}/search", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", &self.config.api_key)
            .json(&serde_json::json!({ "q": query, "num": num }))
            .send()
            .await
            .map_err(|e| Error::tool_failed(SEARCH_FUNCTION, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::tool_failed(
                SEARCH_FUNCTION,
                format!("search API returned {}: {}", status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| Error::tool_failed(SEARCH_FUNCTION, format!("bad response: {}", e)))
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Search
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SEARCH_FUNCTION.to_string(),
            description: "Search the internet for up-to-date information. \
                          Returns titles, links and snippets of the top results."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let start = Instant::now();
        let query = parse_query(&args)?;
        let num = self.config.num_results;

        let response = self.search(&query, num).await?;
        debug!(
            query = %query,
            results = response.organic.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(render_results(&query, &response))
    }
}

/// Pull the query string out of the model's arguments
///
/// Some models name the field `search_query`, so both are accepted.
fn parse_query(args: &serde_json::Value) -> Result<String> {
    let query = args
        .get("query")
        .or_else(|| args.get("search_query"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .unwrap_or_default();

    if query.is_empty() {
        return Err(Error::tool_failed(SEARCH_FUNCTION, "missing 'query' argument"));
    }
    Ok(query.to_string())
}

fn render_results(query: &str, response: &SerperResponse) -> String {
    let mut out = format!("Search results for \"{}\":\n", query);

    if let Some(answer) = response
        .answer_box
        .as_ref()
        .and_then(|b| b.answer.as_deref().or(b.snippet.as_deref()))
    {
        out.push_str(&format!("\nAnswer: {}\n", answer));
    }

    if response.organic.is_empty() {
        out.push_str("\nNo results found.\n");
        return out;
    }

    for result in &response.organic {
        out.push_str(&format!(
            "\nTitle: {}\nLink: {}\nSnippet: {}\n---",
            result.title, result.link, result.snippet
        ));
    }
    out
}
