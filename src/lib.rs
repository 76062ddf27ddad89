//! Ferret - agentic web search assistant
//!
//! Answers questions with a chat model that may call a web search tool.
//! The agent alternates model calls with concurrent tool rounds, and after
//! a bounded number of rounds forces a final answer without tools.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Chat model abstraction with the AI Builder implementation
//! - **Tools**: Web search tool, tool registry and concurrent dispatcher
//! - **Agent**: The agentic loop in blocking and streaming mode
//! - **Store**: Persistent conversation history
//! - **CLI**: Command-line interface and REPL
//!
//! # Usage
//!
//! ```rust,no_run
//! use ferret::agent::{Agent, ChatRequest};
//! use ferret::Config;
//!
//! #[tokio::main]
//! async fn main() -> ferret::Result<()> {
//!     let agent = Agent::from_config(Config::load())?;
//!
//!     let response = agent
//!         .run_blocking(ChatRequest::new("What happened in Rust this week?"))
//!         .await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod store;
pub mod tools;

// Re-export commonly used items
pub use agent::{Agent, AgentEvent};
pub use cli::Repl;
pub use core::{Config, FerretError, Result};
