//! Interactive REPL for Ferret
//!
//! Provides the main user interaction loop. Each question runs the agent in
//! streaming mode so progress is printed as it happens, and every finished
//! turn is saved to the conversation store.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use crate::agent::{Agent, AgentEvent, Conversation};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, FerretError, Result};
use crate::store::{ConversationRecord, ConversationStore, FileConversationStore};

/// State of one interactive session: the current chat and model
pub struct Session {
    agent: Agent,
    store: Arc<dyn ConversationStore>,
    model: String,
    conversation: Conversation,
    chat_id: Option<Uuid>,
}

impl Session {
    pub fn new(agent: Agent, store: Arc<dyn ConversationStore>) -> Self {
        let model = agent.default_model().to_string();
        Self {
            agent,
            store,
            model,
            conversation: Conversation::new(),
            chat_id: None,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn store(&self) -> &dyn ConversationStore {
        self.store.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Id of the stored chat, once the first turn has been saved
    pub fn chat_id(&self) -> Option<Uuid> {
        self.chat_id
    }

    /// Start a new, unsaved chat
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.chat_id = None;
    }

    /// Switch to a stored chat
    pub async fn open(&mut self, id: Uuid) -> Result<ConversationRecord> {
        let record = self.store.get(id).await?;
        self.conversation = Conversation::from_messages(record.history.clone());
        self.chat_id = Some(record.id);
        Ok(record)
    }

    /// Ask a question in the current chat
    ///
    /// `on_log` receives each progress line. On failure the question is
    /// dropped from the chat so it can be asked again.
    pub async fn ask<F>(&mut self, input: &str, mut on_log: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        self.conversation.add_user(input);

        let answer = match self.stream_answer(&mut on_log).await {
            Ok(answer) => answer,
            Err(e) => {
                self.conversation.pop_user();
                return Err(e);
            }
        };

        self.conversation.add_assistant(answer.clone());
        if let Err(e) = self.persist(input).await {
            tracing::warn!(error = %e, "failed to save conversation");
        }
        Ok(answer)
    }

    async fn stream_answer<F>(&self, on_log: &mut F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let mut events = self
            .agent
            .run_streaming(self.conversation.messages().to_vec(), self.model.clone())?;

        while let Some(event) = events.next().await {
            match event {
                AgentEvent::Log { content } => on_log(&content),
                AgentEvent::Complete { content } => return Ok(content),
                AgentEvent::Error { message } => return Err(FerretError::Other(message)),
            }
        }
        Err(FerretError::Other(
            "agent stopped without an answer".to_string(),
        ))
    }

    async fn persist(&mut self, first_message: &str) -> Result<()> {
        let id = match self.chat_id {
            Some(id) => id,
            None => {
                let record = self.store.create(None, Some(first_message)).await?;
                self.chat_id = Some(record.id);
                record.id
            }
        };
        self.store
            .save(id, self.conversation.messages().to_vec(), None)
            .await?;
        Ok(())
    }
}

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    session: Session,
}

impl Repl {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Create a REPL backed by the configured endpoints and history directory
    pub async fn with_config(config: Config) -> Result<Self> {
        let store = FileConversationStore::open(config.storage.history_dir.clone()).await?;
        let agent = Agent::from_config(config)?;
        Ok(Self::new(Session::new(agent, Arc::new(store))))
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &mut self.session).await {
                Ok(CommandResult::Exit) => {
                    println!("\nGoodbye!");
                    break;
                }
                Ok(CommandResult::Handled(output)) => {
                    println!("{}\n", output);
                }
                Ok(CommandResult::Continue(question)) => {
                    let answer = self
                        .session
                        .ask(&question, |line| println!("  > {}", line))
                        .await;
                    match answer {
                        Ok(answer) => println!("\nAssistant:\n{}\n", answer),
                        Err(e) => eprintln!("\nError: {}\n", e),
                    }
                }
                Err(e) => {
                    eprintln!("Command error: {}\n", e);
                }
            }
        }

        Ok(())
    }

    fn print_banner(&self) {
        let config = self.session.agent().config();

        println!();
        println!("Ferret - web search assistant");
        println!("─────────────────────────────────────────────");
        println!("Endpoint:   {}", config.api.base_url);
        println!("Model:      {}", self.session.model());
        println!("Tool rounds: up to {}", config.agent.max_tool_rounds);
        if config.require_token().is_err() {
            println!("Warning:    AI_BUILDER_TOKEN is not set; questions will fail");
        }
        if let Some(id) = self.session.chat_id() {
            println!(
                "Chat:       {} ({} messages)",
                id,
                self.session.conversation().len()
            );
        }
        println!();
        println!("Commands: help, new, chats, open, model, status, exit");
        println!("─────────────────────────────────────────────");
    }
}
