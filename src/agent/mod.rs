//! Agent module - the agentic loop and its progress events
//!
//! Contains the controller that alternates model calls with tool rounds,
//! the per-request loop state, and history validation.

pub mod conversation;
pub mod events;
pub mod loop_state;
pub mod orchestrator;

pub use conversation::{parse_history, validate_history, Conversation};
pub use events::{AgentEvent, AgentEventStream, EventSink};
pub use loop_state::{AgentResponse, LoopState, Transition};
pub use orchestrator::{Agent, ChatRequest};
