use async_trait::async_trait;
use kasa_core::types::ChatMessage;
use kasa_core::{Config, Error, Result};
use kasa_providers::Provider;
use kasa_tools::{GoogleSearchTool, ToolContext, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

/// Narrow text-completion seam consumed by the classifier and executors.
///
/// Implementations may run tools internally; callers only see the final
/// text. Mock this in tests instead of the provider layer.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Single-run LLM agent: one prompt in, one final text out, with an
/// internal tool-call loop. The tool set is fixed at construction.
pub struct LlmAgent {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    tool_ctx: ToolContext,
    max_tool_iterations: u32,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry, config: &Config) -> Self {
        Self {
            provider,
            tools,
            tool_ctx: ToolContext::new(config.clone()),
            max_tool_iterations: config.agent.max_tool_iterations,
        }
    }

    /// Agent with no tools registered (classification, greetings).
    pub fn without_tools(provider: Arc<dyn Provider>, config: &Config) -> Self {
        Self::new(provider, ToolRegistry::new(), config)
    }

    /// Agent with the Google search tool registered (weather retrieval).
    pub fn with_google_search(provider: Arc<dyn Provider>, config: &Config) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(GoogleSearchTool));
        Self::new(provider, tools, config)
    }
}

#[async_trait]
impl Oracle for LlmAgent {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let tool_schemas = self.tools.get_tool_schemas();
        let mut messages = vec![ChatMessage::user(prompt)];

        for iteration in 0..self.max_tool_iterations {
            debug!(iteration, "LLM call iteration");
            let response = self.provider.chat(&messages, &tool_schemas).await?;

            if response.tool_calls.is_empty() {
                // No tool calls, we have the final response
                return Ok(response.content.unwrap_or_default());
            }

            let mut assistant = ChatMessage::assistant(response.content.as_deref().unwrap_or(""));
            assistant.tool_calls = Some(response.tool_calls.clone());
            messages.push(assistant);

            for tool_call in &response.tool_calls {
                debug!(tool = %tool_call.name, "Executing tool call");
                let result = match self
                    .tools
                    .execute(&tool_call.name, self.tool_ctx.clone(), tool_call.arguments.clone())
                    .await
                {
                    Ok(value) => value.to_string(),
                    Err(e) => {
                        // Feed the failure back to the model; it may recover
                        // with a different query or answer without the tool.
                        warn!(tool = %tool_call.name, error = %e, "Tool call failed");
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                };
                messages.push(ChatMessage::tool_result(&tool_call.id, &result));
            }
        }

        warn!(max = self.max_tool_iterations, "Reached max tool iterations");
        Err(Error::Provider(
            "Reached max tool iterations without a final response".to_string(),
        ))
    }
}
