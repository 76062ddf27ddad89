//! Concurrent execution of one round of tool calls

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::agent::events::EventSink;
use crate::core::{ToolCall, ToolResult};
use crate::tools::ToolRegistry;

/// Placeholder content for a call whose task never reported back
pub const TOOL_CALL_FAILED: &str = "tool call failed";

/// Runs a batch of tool calls concurrently and answers them in call order
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute all calls concurrently
    ///
    /// Returns exactly one result per call, in the order of `calls`.
    pub async fn dispatch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        self.dispatch_with_progress(calls, &EventSink::disabled())
            .await
    }

    /// Execute all calls concurrently, reporting progress to `sink`
    ///
    /// Outstanding calls are aborted if the sink's consumer goes away;
    /// dropping the returned future aborts them as well.
    pub async fn dispatch_with_progress(
        &self,
        calls: &[ToolCall],
        sink: &EventSink,
    ) -> Vec<ToolResult> {
        let total = calls.len();
        let mut set: JoinSet<ToolResult> = JoinSet::new();

        for call in calls {
            sink.log(self.registry.describe(call)).await;

            let registry = Arc::clone(&self.registry);
            let call = call.clone();
            set.spawn(async move { registry.execute(&call).await });
        }

        let names: HashMap<&str, &str> = calls
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();
        let mut completed: HashMap<String, ToolResult> = HashMap::with_capacity(total);

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => {
                    let name = names
                        .get(result.tool_call_id.as_str())
                        .copied()
                        .unwrap_or("tool");
                    sink.log(format!(
                        "{} ({}/{})",
                        self.registry.completion_label(name),
                        completed.len() + 1,
                        total
                    ))
                    .await;
                    completed.insert(result.tool_call_id.clone(), result);
                }
                Err(e) => {
                    tracing::error!(error = %e, "tool task did not complete");
                }
            }

            if sink.is_closed() {
                tracing::debug!("event consumer gone, aborting remaining tool calls");
                set.abort_all();
                break;
            }
        }

        tracing::info!(total, completed = completed.len(), "tool round finished");

        calls
            .iter()
            .map(|call| {
                completed
                    .remove(&call.id)
                    .unwrap_or_else(|| ToolResult::failure(&call.id, TOOL_CALL_FAILED))
            })
            .collect()
    }
}
