//! Progress events emitted by the agent loop in streaming mode

use serde::{Deserialize, Serialize};
use std::pin::Pin;

use futures::Stream;
use tokio::sync::mpsc;

/// One event in a streaming run
///
/// A run emits any number of `Log` events followed by exactly one
/// `Complete` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentEvent {
    /// Human-readable progress text
    Log { content: String },
    /// Final answer
    Complete { content: String },
    /// Fatal failure; nothing follows
    Error { message: String },
}

impl AgentEvent {
    pub fn log(content: impl Into<String>) -> Self {
        Self::Log {
            content: content.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Render as a Server-Sent Events frame
    pub fn to_sse(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"failed to encode event"}"#.to_string()
        });
        format!("data: {}\n\n", json)
    }
}

/// Boxed stream of events handed to the transport layer
pub type AgentEventStream = Pin<Box<dyn Stream<Item = AgentEvent> + Send>>;

/// Producer side of an event stream
///
/// A disabled sink drops everything, which is how blocking mode shares the
/// streaming loop.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<AgentEvent>>,
}

impl EventSink {
    /// Sink that discards events
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Sink backed by a bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    pub async fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver is picked up by `is_closed` at the next checkpoint
            let _ = tx.send(event).await;
        }
    }

    pub async fn log(&self, content: impl Into<String>) {
        if self.tx.is_some() {
            self.emit(AgentEvent::log(content)).await;
        }
    }

    /// True once the consumer has dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(AgentEvent::log("working")).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["content"], "working");

        let json = serde_json::to_value(AgentEvent::Error {
            message: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
    }

    #[test]
    fn test_sse_frame() {
        let frame = AgentEvent::Complete {
            content: "done".to_string(),
        }
        .to_sse();
        assert_eq!(frame, "data: {\"type\":\"complete\",\"content\":\"done\"}\n\n");
    }

    #[tokio::test]
    async fn test_sink_reports_closed_consumer() {
        let (sink, rx) = EventSink::channel(4);
        sink.log("first").await;
        assert!(!sink.is_closed());

        drop(rx);
        assert!(sink.is_closed());
        // Sending after close is silently ignored
        sink.log("second").await;
    }

    #[tokio::test]
    async fn test_disabled_sink_is_never_closed() {
        let sink = EventSink::disabled();
        sink.log("ignored").await;
        assert!(!sink.is_closed());
    }
}
