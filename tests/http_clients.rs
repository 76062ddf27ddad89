//! HTTP client integration tests
//!
//! Runs the chat and search clients against a one-shot local responder to
//! check request payloads and status handling.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ferret::core::{Config, FerretError, Message, ToolDefinition};
use ferret::llm::{AiBuilderClient, ChatModel, CompletionRequest, GenerateOptions};
use ferret::tools::{SearchClient, SearchProvider};

/// Request as seen by the responder
struct Captured {
    head: String,
    body: Value,
}

/// Answer exactly one request with `status` and `body`
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let raw = read_request(&mut socket).await;

        let reason = if status < 300 { "OK" } else { "Error" };
        let response = format!(
            "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            reason,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        let (head, body) = raw.split_once("\r\n\r\n").unwrap_or((raw.as_str(), ""));
        Captured {
            head: head.to_lowercase(),
            body: serde_json::from_str(body).unwrap_or(Value::Null),
        }
    });

    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let line = line.to_lowercase();
                    line.strip_prefix("content-length:")
                        .and_then(|v| v.trim().parse::<usize>().ok())
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.token = Some("test-token".to_string());
    config
}

fn search_schema() -> Vec<ToolDefinition> {
    vec![ToolDefinition::function(
        "search",
        "search the web",
        json!({"type": "object", "properties": {"keyword": {"type": "string"}}}),
    )]
}

const TOOL_CALL_RESPONSE: &str = r#"{
    "model": "gpt-5",
    "choices": [{
        "message": {
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "search", "arguments": "{\"keyword\":\"rust\"}"}
            }]
        },
        "finish_reason": "tool_calls"
    }],
    "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
}"#;

#[tokio::test]
async fn test_reasoning_model_payload() {
    let (url, server) = serve_once(200, TOOL_CALL_RESPONSE).await;
    let client = AiBuilderClient::from_config(&config(&url)).unwrap();
    let request = CompletionRequest::with_tools(
        "gpt-5",
        vec![Message::user("rust news")],
        search_schema(),
        GenerateOptions {
            temperature: Some(0.3),
            max_tokens: Some(100),
        },
        0.7,
    );

    let response = client.complete(&request).await.unwrap();
    let captured = server.await.unwrap();

    assert!(captured.head.starts_with("post /chat/completions"));
    assert!(captured.head.contains("authorization: bearer test-token"));
    assert_eq!(captured.body["model"], "gpt-5");
    assert_eq!(captured.body["temperature"], 1.0);
    assert_eq!(captured.body["max_completion_tokens"], 100);
    assert!(captured.body.get("max_tokens").is_none());
    assert_eq!(captured.body["tools"][0]["function"]["name"], "search");
    assert!(captured.body.get("tool_choice").is_none());
    assert_eq!(captured.body["messages"][0]["role"], "user");

    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "call_1");
    assert_eq!(response.tool_calls[0].arguments, r#"{"keyword":"rust"}"#);
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(16));
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
}

#[tokio::test]
async fn test_finalization_payload() {
    let (url, server) = serve_once(
        200,
        r#"{"choices":[{"message":{"content":"done"},"finish_reason":"stop"}]}"#,
    )
    .await;
    let client = AiBuilderClient::from_config(&config(&url)).unwrap();
    let request = CompletionRequest::with_tools(
        "deepseek",
        vec![Message::user("hi")],
        search_schema(),
        GenerateOptions {
            temperature: None,
            max_tokens: Some(64),
        },
        0.7,
    )
    .finalization();

    let response = client.complete(&request).await.unwrap();
    let captured = server.await.unwrap();

    assert_eq!(captured.body["tool_choice"], "none");
    assert!(captured.body.get("tools").is_none());
    assert_eq!(captured.body["max_tokens"], 64);
    assert!(captured.body.get("max_completion_tokens").is_none());
    assert!((captured.body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);

    assert_eq!(response.content.as_deref(), Some("done"));
    assert!(response.usage.is_none());
    assert_eq!(response.model, "deepseek");
}

#[tokio::test]
async fn test_error_status_is_api_error() {
    let (url, server) = serve_once(503, r#"{"detail":"overloaded"}"#).await;
    let client = AiBuilderClient::from_config(&config(&url)).unwrap();
    let request = CompletionRequest::with_tools(
        "deepseek",
        vec![Message::user("hi")],
        vec![],
        GenerateOptions::default(),
        0.7,
    );

    let err = client.complete(&request).await.unwrap_err();
    server.await.unwrap();

    match err {
        FerretError::Api { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_responses_are_protocol_violations() {
    for body in [r#"{"choices": []}"#, "not json at all"] {
        let (url, server) = serve_once(200, body).await;
        let client = AiBuilderClient::from_config(&config(&url)).unwrap();
        let request = CompletionRequest::with_tools(
            "deepseek",
            vec![Message::user("hi")],
            vec![],
            GenerateOptions::default(),
            0.7,
        );

        let err = client.complete(&request).await.unwrap_err();
        server.await.unwrap();
        assert!(
            matches!(err, FerretError::ProtocolViolation(_)),
            "body {:?} gave {:?}",
            body,
            err
        );
    }
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = config(&format!("http://{}", listener.local_addr().unwrap()));
    config.api.token = None;

    let client = AiBuilderClient::from_config(&config).unwrap();
    let request = CompletionRequest::with_tools(
        "gpt-5",
        vec![Message::user("hi")],
        vec![],
        GenerateOptions::default(),
        0.7,
    );
    let err = client.complete(&request).await.unwrap_err();
    assert!(matches!(err, FerretError::Config(_)));

    let search = SearchClient::from_config(&config).unwrap();
    let err = search.search("rust", 6).await.unwrap_err();
    assert!(matches!(err, FerretError::Config(_)));

    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "a connection was made without a token");
}

#[tokio::test]
async fn test_search_payload_and_response() {
    let (url, server) = serve_once(
        200,
        r#"{
            "queries": [{"response": {"results": [
                {"title": "Rust 1.90", "url": "https://blog.rust-lang.org", "content": "released"}
            ]}}],
            "combined_answer": "Rust 1.90 was released."
        }"#,
    )
    .await;
    let client = SearchClient::from_config(&config(&url)).unwrap();

    let response = client.search("rust release", 6).await.unwrap();
    let captured = server.await.unwrap();

    assert!(captured.head.starts_with("post /search/"));
    assert_eq!(captured.body, json!({"keywords": ["rust release"], "max_results": 6}));

    let hits = response.require_hits().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title.as_deref(), Some("Rust 1.90"));
    assert_eq!(
        response.combined_answer.as_deref(),
        Some("Rust 1.90 was released.")
    );
}

#[tokio::test]
async fn test_search_without_queries_is_protocol_violation() {
    let (url, server) = serve_once(200, r#"{"errors": ["quota"]}"#).await;
    let client = SearchClient::from_config(&config(&url)).unwrap();

    let response = client.search("rust", 6).await.unwrap();
    server.await.unwrap();

    assert!(response.hits().is_empty());
    assert!(matches!(
        response.require_hits(),
        Err(FerretError::ProtocolViolation(_))
    ));
}
