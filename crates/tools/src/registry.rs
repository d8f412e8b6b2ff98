use std::collections::HashMap;
use std::sync::Arc;

use kasa_core::{Error, Result};
use serde_json::{json, Value};
use tracing::debug;

use crate::{Tool, ToolContext};

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// OpenAI-style function schemas for every registered tool, sorted by
    /// name so the provider sees a stable ordering.
    pub fn get_tool_schemas(&self) -> Vec<Value> {
        let mut entries: Vec<(&str, &Arc<dyn Tool>)> = self
            .tools
            .iter()
            .map(|(name, tool)| (name.as_str(), tool))
            .collect();
        entries.sort_by_key(|(name, _)| *name);

        entries
            .into_iter()
            .map(|(_, tool)| {
                let schema = tool.schema();
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters,
                    }
                })
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;
        tool.validate(&params)?;
        tool.execute(ctx, params).await
    }
}
