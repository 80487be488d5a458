use std::{collections::BTreeMap, sync::Arc};

use {
    async_trait::async_trait,
    meetbridge_common::{Error, ErrorKind, Result},
    serde_json::Value,
    tracing::debug,
};

/// A tool the agent can call by name with a JSON argument object.
#[async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, params: Value) -> Result<Value>;
}

/// Registry of available tools, listed in name order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Box<dyn AgentTool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::from(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn AgentTool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Schemas in the tool-listing shape: `name`, `description`, `inputSchema`.
    pub fn list_schemas(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.parameters_schema(),
                })
            })
            .collect()
    }

    pub async fn call(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::new(ErrorKind::Validation, format!("unknown tool: {name}")))?;
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => params,
            _ => {
                return Err(Error::new(
                    ErrorKind::Validation,
                    "tool arguments must be an object",
                ));
            },
        };
        debug!(tool = name, operation = ?params.get("operation"), "executing tool");
        tool.execute(params).await
    }
}
