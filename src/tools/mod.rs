//! Tools module - Tool implementations for the agent
//!
//! Contains the web search tool, the tool registry, and the concurrent
//! dispatcher that runs one round of tool calls.

pub mod dispatcher;
pub mod registry;
pub mod search;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{Result, ToolDefinition};

pub use dispatcher::ToolDispatcher;
pub use registry::ToolRegistry;
pub use search::{SearchClient, SearchProvider, SearchTool};

/// A tool the model can call
///
/// Implementations hold no per-call state; the dispatcher runs several calls
/// of the same tool at once.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema offered to the model
    fn definition(&self) -> ToolDefinition;

    /// Progress text shown before the call runs
    fn describe(&self, _arguments: &Value) -> String {
        format!("Running {}", self.definition().function.name)
    }

    /// Progress text shown after a call finishes, before the `(i/n)` counter
    fn completion_label(&self) -> String {
        format!("Finished {}", self.definition().function.name)
    }

    /// Run the tool with parsed arguments
    ///
    /// Errors are rendered into the tool result by the registry.
    async fn call(&self, arguments: Value) -> Result<String>;
}
