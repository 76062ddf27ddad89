//! Live endpoint tests
//!
//! Talk to the real AI Builder endpoints. Run with
//! `AI_BUILDER_TOKEN=... cargo test -- --ignored`.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;

use ferret::agent::{Agent, AgentEvent, ChatRequest};
use ferret::core::{Config, Message};
use ferret::tools::{SearchClient, SearchProvider};

/// Helper to build a live config, or skip when no token is available
fn live_config() -> Option<Config> {
    let config = Config::load();
    if config.api.token.is_none() {
        eprintln!("Skipping test: AI_BUILDER_TOKEN not set");
        return None;
    }
    Some(config)
}

#[tokio::test]
#[ignore] // Requires AI_BUILDER_TOKEN and network access
async fn test_live_search() {
    let Some(config) = live_config() else { return };
    let client = SearchClient::from_config(&config).unwrap();

    let response = client.search("rust programming language", 3).await.unwrap();
    assert!(response.require_hits().is_ok());
}

#[tokio::test]
#[ignore]
async fn test_live_blocking_answer() {
    let Some(config) = live_config() else { return };
    let agent = Agent::from_config(config).unwrap();

    let result = timeout(
        Duration::from_secs(600),
        agent.run_blocking(ChatRequest::new("What is the latest stable Rust release?")),
    )
    .await;

    let response = result.expect("Task timed out").expect("Task failed");
    assert!(!response.content.is_empty());
    assert!(response.model_calls <= agent.config().agent.max_tool_rounds + 1);
}

#[tokio::test]
#[ignore]
async fn test_live_streaming_answer() {
    let Some(config) = live_config() else { return };
    let agent = Agent::from_config(config).unwrap();
    let model = agent.default_model().to_string();

    let stream = agent
        .run_streaming(vec![Message::user("Any news about tokio this month?")], model)
        .unwrap();
    let events: Vec<AgentEvent> = timeout(Duration::from_secs(600), stream.collect())
        .await
        .expect("Task timed out");

    assert!(matches!(events.last(), Some(AgentEvent::Complete { .. })));
}
