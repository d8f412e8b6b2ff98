use async_trait::async_trait;
use kasa_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::info;

use crate::{Tool, ToolContext, ToolSchema};

/// Web search backed by the Google Custom Search JSON API.
pub struct GoogleSearchTool;

#[async_trait]
impl Tool for GoogleSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "google_search",
            description: "Execute a web search and return the top results as title/url/snippet.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "num": {
                        "type": "integer",
                        "description": "Number of results (1-10, default 5)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        if params.get("query").and_then(|v| v.as_str()).is_none() {
            return Err(Error::Validation("Missing required parameter: query".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let query = params["query"].as_str().unwrap();
        let num = params
            .get("num")
            .and_then(|v| v.as_u64())
            .unwrap_or(ctx.config.tools.search.max_results as u64)
            .clamp(1, 10) as usize;

        let search = &ctx.config.tools.search;
        if search.api_key.is_empty() || search.cx.is_empty() {
            return Err(Error::Tool(
                "Google search is not configured (tools.search.apiKey / cx)".to_string(),
            ));
        }

        info!(query = %query, num, "Executing Google search");

        let client = Client::new();
        let response = client
            .get(&search.endpoint)
            .query(&[
                ("key", search.api_key.as_str()),
                ("cx", search.cx.as_str()),
                ("q", query),
                ("num", &num.to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Tool(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Tool(format!("Search API error {}: {}", status, text)));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::Tool(format!("Failed to parse search response: {}", e)))?;

        let results = parse_results(&data, num);

        Ok(json!({ "query": query, "results": results }))
    }
}

fn parse_results(data: &Value, count: usize) -> Vec<Value> {
    data["items"]
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .take(count)
        .map(|r| {
            json!({
                "title": r["title"],
                "url": r["link"],
                "snippet": r["snippet"]
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kasa_core::Config;

    #[test]
    fn test_schema_name() {
        assert_eq!(GoogleSearchTool.schema().name, "google_search");
    }

    #[test]
    fn test_validate_requires_query() {
        assert!(GoogleSearchTool.validate(&json!({})).is_err());
        assert!(GoogleSearchTool.validate(&json!({"query": "天気"})).is_ok());
    }

    #[test]
    fn test_parse_results() {
        let data = json!({
            "items": [
                {
                    "title": "大阪の天気 - ウェザーニュース",
                    "link": "https://weathernews.jp/onebox/osaka/",
                    "snippet": "今日の大阪は晴れ時々くもり。"
                },
                {
                    "title": "other",
                    "link": "https://example.com",
                    "snippet": "…"
                }
            ]
        });

        let results = parse_results(&data, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["url"], "https://weathernews.jp/onebox/osaka/");
        assert!(results[0]["title"].as_str().unwrap().contains("天気"));
    }

    #[test]
    fn test_parse_results_no_items() {
        let results = parse_results(&json!({}), 5);
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_execute_unconfigured() {
        let ctx = ToolContext::new(Config::default());
        let err = GoogleSearchTool
            .execute(ctx, json!({"query": "天気"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }
}
