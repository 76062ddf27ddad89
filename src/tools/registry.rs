//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering tools and routing tool calls to handlers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Config, Result, ToolCall, ToolDefinition, ToolResult};
use crate::tools::search::{SearchClient, SearchTool};
use crate::tools::Tool;

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    /// Tools indexed by name
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, which is the order schemas are offered in
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the web search tool backed by the search endpoint
    pub fn with_search(config: &Config) -> Result<Self> {
        let client = SearchClient::from_config(config)?;
        let mut registry = Self::new();
        registry.register(Arc::new(SearchTool::new(
            Arc::new(client),
            config.search.clone(),
        )));
        Ok(registry)
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().function.name;
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    /// Names of registered tools
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Progress text for a call, before it runs
    pub fn describe(&self, call: &ToolCall) -> String {
        match (self.tools.get(&call.name), call.parse_arguments()) {
            (Some(tool), Ok(arguments)) => tool.describe(&arguments),
            _ => format!("Running {}", call.name),
        }
    }

    /// Progress text for a finished call of the named tool
    pub fn completion_label(&self, name: &str) -> String {
        match self.tools.get(name) {
            Some(tool) => tool.completion_label(),
            None => format!("Finished {}", name),
        }
    }

    /// Execute a tool call
    ///
    /// Never fails: unknown tools, malformed arguments and tool errors all
    /// come back as result text so the model can react to them.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        tracing::info!(id = %call.id, tool = %call.name, arguments = %call.arguments, "executing tool call");

        let Some(tool) = self.tools.get(&call.name) else {
            tracing::warn!(tool = %call.name, "unknown tool requested");
            return ToolResult::failure(&call.id, format!("unknown tool type: {}", call.name));
        };

        let arguments = match call.parse_arguments() {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::error!(tool = %call.name, error = %e, "failed to parse tool arguments");
                return ToolResult::failure(
                    &call.id,
                    format!("failed to parse {} arguments: {}", call.name, e),
                );
            }
        };

        match tool.call(arguments).await {
            Ok(content) => {
                tracing::info!(id = %call.id, chars = content.len(), "tool call complete");
                ToolResult::success(&call.id, content)
            }
            Err(e) => {
                tracing::warn!(id = %call.id, error = %e, "tool call failed");
                ToolResult::failure(&call.id, e.to_string())
            }
        }
    }
}
