pub mod registry;
pub mod search;

use async_trait::async_trait;
use kasa_core::{Config, Result};
use serde_json::Value;

pub use registry::ToolRegistry;
pub use search::GoogleSearchTool;

/// Everything a tool invocation may need, resolved at startup.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Config,
}

impl ToolContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}
