//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use uuid::Uuid;

use crate::cli::repl::Session;
use crate::core::{FerretError, Result};
use crate::llm::models::{find_preset, get_model_presets, ModelFamily};

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command; ask it as a question
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
}

/// Parse and handle special commands
pub async fn handle_command(input: &str, session: &mut Session) -> Result<CommandResult> {
    let input = input.trim();
    let (cmd, args) = match input.split_once(' ') {
        Some((cmd, args)) => (cmd, args.trim()),
        None => (input, ""),
    };
    let cmd = cmd.trim_start_matches('/').to_lowercase();

    // "open source crates?" and "new features in rust?" are questions, not commands
    let is_question = match cmd.as_str() {
        "open" | "delete" => !args.is_empty() && !looks_like_id(args),
        "model" => args.contains(char::is_whitespace),
        "exit" | "quit" | "q" | "help" | "?" | "new" | "clear" | "chats" | "models"
        | "status" => !args.is_empty(),
        _ => false,
    };
    if is_question {
        return Ok(CommandResult::Continue(input.to_string()));
    }

    match cmd.as_str() {
        "exit" | "quit" | "q" => Ok(CommandResult::Exit),

        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "new" | "clear" => {
            session.reset();
            Ok(CommandResult::Handled("Started a new chat.".to_string()))
        }

        "chats" => list_chats(session).await,

        "open" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: open <chat id>".to_string()));
            }
            let id = resolve_chat_id(session, args).await?;
            let record = session.open(id).await?;
            Ok(CommandResult::Handled(format!(
                "Opened \"{}\" ({} messages)",
                record.title,
                record.history.len()
            )))
        }

        "rename" => {
            let Some(id) = session.chat_id() else {
                return Ok(CommandResult::Handled(
                    "Nothing to rename yet; ask a question first.".to_string(),
                ));
            };
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: rename <title>".to_string()));
            }
            let record = session.store().update_title(id, args).await?;
            Ok(CommandResult::Handled(format!("Renamed to \"{}\"", record.title)))
        }

        "delete" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: delete <chat id>".to_string()));
            }
            let id = resolve_chat_id(session, args).await?;
            session.store().delete(id).await?;
            if session.chat_id() == Some(id) {
                session.reset();
            }
            Ok(CommandResult::Handled(format!("Deleted chat {}", id)))
        }

        "model" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "Current model: {}",
                    session.model()
                )));
            }
            session.set_model(args);
            let note = match find_preset(args) {
                Some(_) => "",
                None => " (not a known preset; the endpoint may reject it)",
            };
            Ok(CommandResult::Handled(format!("Model set to: {}{}", args, note)))
        }

        "models" => Ok(CommandResult::Handled(list_models(session.model()))),

        "status" => Ok(CommandResult::Handled(status(session))),

        _ => {
            if input.starts_with('/') {
                Ok(CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                )))
            } else {
                Ok(CommandResult::Continue(input.to_string()))
            }
        }
    }
}

fn looks_like_id(arg: &str) -> bool {
    arg.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Resolve a full chat id or a unique prefix of one
async fn resolve_chat_id(session: &Session, arg: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(arg) {
        return Ok(id);
    }

    let matches: Vec<Uuid> = session
        .store()
        .list()
        .await?
        .into_iter()
        .map(|s| s.id)
        .filter(|id| id.to_string().starts_with(arg))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(FerretError::NotFound(arg.to_string())),
        _ => Err(FerretError::validation(format!(
            "chat id prefix '{}' is ambiguous",
            arg
        ))),
    }
}

async fn list_chats(session: &Session) -> Result<CommandResult> {
    let chats = session.store().list().await?;
    if chats.is_empty() {
        return Ok(CommandResult::Handled("No saved chats.".to_string()));
    }

    let mut output = String::from("Saved chats:\n");
    for chat in chats {
        let marker = if session.chat_id() == Some(chat.id) {
            "*"
        } else {
            " "
        };
        output.push_str(&format!(
            "{} {}  {}  {}\n",
            marker,
            &chat.id.to_string()[..8],
            chat.updated_at.format("%Y-%m-%d %H:%M"),
            chat.title
        ));
    }
    Ok(CommandResult::Handled(output.trim_end().to_string()))
}

fn list_models(current: &str) -> String {
    let mut output = String::from("Known models:\n");
    for preset in get_model_presets() {
        let marker = if preset.name == current { "*" } else { " " };
        output.push_str(&format!(
            "{} {} ({})\n    {}\n",
            marker, preset.name, preset.display_name, preset.description
        ));
    }
    output.push_str("\nSwitch with: model <name>");
    output
}

fn status(session: &Session) -> String {
    let config = session.agent().config();
    let family = match ModelFamily::of(session.model()) {
        ModelFamily::Reasoning => "reasoning",
        ModelFamily::General => "general",
    };
    let chat = match session.chat_id() {
        Some(id) => id.to_string(),
        None => "new (unsaved)".to_string(),
    };

    format!(
        "Ferret Status:\n\
         ─────────────────────────────\n\
         Endpoint:     {}\n\
         Token:        {}\n\
         Model:        {} ({})\n\
         Tool rounds:  {}\n\
         Debug:        {}\n\
         Chat:         {}\n\
         History:      {} messages\n\
         Storage:      {}{}",
        config.api.base_url,
        if config.require_token().is_ok() {
            "set"
        } else {
            "missing"
        },
        session.model(),
        family,
        config.agent.max_tool_rounds,
        if config.agent.debug { "on" } else { "off" },
        chat,
        session.conversation().len(),
        config.storage.history_dir.display(),
        if session.store().is_persistent() {
            ""
        } else {
            " (in memory)"
        }
    )
}

/// Generate help text
fn help_text() -> String {
    r#"Ferret Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  exit, quit, q    Exit Ferret
  new              Start a new chat
  chats            List saved chats
  open <id>        Resume a saved chat (id or unique prefix)
  rename <title>   Rename the current chat
  delete <id>      Delete a saved chat
  model [name]     Show or switch the model
  models           List known models
  status           Show current configuration

Anything else is asked as a question. The assistant may search
the web up to a few times before answering.

Keyboard Shortcuts:
  Ctrl+C           Quit
  Ctrl+D           Exit Ferret
─────────────────────────────────────────────"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::core::{Config, Message};
    use crate::llm::{ChatModel, CompletionRequest, CompletionResponse};
    use crate::store::InMemoryConversationStore;
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: request.messages.last().and_then(|m| m.content.clone()),
                model: request.model.clone(),
                ..Default::default()
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn session() -> Session {
        let mut config = Config::default();
        config.models.default = "gpt-5".to_string();
        let agent = Agent::with_parts(config, Arc::new(Echo), Arc::new(ToolRegistry::new()));
        Session::new(agent, Arc::new(InMemoryConversationStore::new()))
    }

    async fn handled(input: &str, session: &mut Session) -> String {
        match handle_command(input, session).await.unwrap() {
            CommandResult::Handled(output) => output,
            other => panic!("expected Handled, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_input_is_a_question() {
        let mut session = session();
        assert_eq!(
            handle_command("what is new in rust?", &mut session).await.unwrap(),
            CommandResult::Continue("what is new in rust?".to_string())
        );
        assert_eq!(
            handle_command("quit", &mut session).await.unwrap(),
            CommandResult::Exit
        );
        assert!(handled("/frobnicate", &mut session)
            .await
            .starts_with("Unknown command: frobnicate"));
    }

    #[tokio::test]
    async fn test_model_switch() {
        let mut session = session();
        assert_eq!(handled("model", &mut session).await, "Current model: gpt-5");

        assert_eq!(
            handled("model deepseek", &mut session).await,
            "Model set to: deepseek"
        );
        assert_eq!(session.model(), "deepseek");
        assert!(handled("model mystery", &mut session)
            .await
            .contains("not a known preset"));
        assert!(handled("models", &mut session).await.contains("gemini-2.5-pro"));
    }

    #[tokio::test]
    async fn test_chat_lifecycle() {
        let mut session = session();
        assert_eq!(handled("chats", &mut session).await, "No saved chats.");
        assert!(handled("rename x", &mut session)
            .await
            .starts_with("Nothing to rename"));

        session.ask("rust 2024 edition", |_| {}).await.unwrap();
        let id = session.chat_id().unwrap();

        let listing = handled("chats", &mut session).await;
        assert!(listing.contains("* "));
        assert!(listing.contains("rust 2024 edition"));

        assert_eq!(
            handled("rename Editions", &mut session).await,
            "Renamed to \"Editions\""
        );

        handled("new", &mut session).await;
        assert!(session.chat_id().is_none());

        let prefix = id.to_string()[..8].to_string();
        let opened = handled(&format!("open {}", prefix), &mut session).await;
        assert_eq!(opened, "Opened \"Editions\" (2 messages)");
        assert_eq!(session.chat_id(), Some(id));

        handled(&format!("delete {}", id), &mut session).await;
        assert!(session.chat_id().is_none());
        assert!(handle_command(&format!("open {}", id), &mut session)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_open_unknown_prefix() {
        let mut session = session();
        session
            .store()
            .save(Uuid::new_v4(), vec![Message::user("hi")], None)
            .await
            .unwrap();

        let err = handle_command("open ffffffff-ffff-ffff", &mut session).await.unwrap_err();
        assert!(matches!(err, FerretError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_command_words_in_questions() {
        let mut session = session();
        session.ask("hello", |_| {}).await.unwrap();
        let chat_id = session.chat_id();

        for question in [
            "open source crates for parsing?",
            "delete vs drop in rust",
            "model context protocol explained",
            "new features in rust 2024?",
            "clear differences between Rc and Arc",
            "help me pick an async runtime",
            "status codes returned by reqwest",
            "exit codes on windows",
        ] {
            assert_eq!(
                handle_command(question, &mut session).await.unwrap(),
                CommandResult::Continue(question.to_string())
            );
        }
        assert_eq!(session.model(), "gpt-5");
        assert_eq!(session.conversation().len(), 2);
        assert_eq!(session.chat_id(), chat_id);
    }

    #[tokio::test]
    async fn test_status() {
        let mut session = session();
        let status = handled("status", &mut session).await;
        assert!(status.contains("gpt-5 (reasoning)"));
        assert!(status.contains("(in memory)"));
        assert!(status.contains("Tool rounds:  3"));
    }
}
