//! # gemchat
//!
//! Command-line front end: manage chats stored in the local database and
//! talk to the Gemini API from the terminal.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gemchat_client::{read_attachments, ChatSession, ClientConfig, CompletionClient, SendOutcome, SessionError};
use gemchat_shared::constants::FAILURE_REPLY;
use gemchat_shared::{ChatId, MessageId, Sender};
use gemchat_store::{
    chat_preview, format_size, Chat, ChatRepository, ChatSettingsUpdate, Database, GlobalSettingsUpdate,
    SettingsManager, Theme,
};

type Store = Rc<Database>;

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(version, about = "Local-first chat client for the Gemini API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chats, newest first
    List,
    /// Start a new chat and make it current
    New,
    /// Print a chat's messages
    Show {
        /// Chat to show (defaults to the current chat)
        #[arg(long)]
        chat: Option<ChatId>,
    },
    /// Make a chat current
    Switch { id: ChatId },
    /// Rename a chat
    Rename { id: ChatId, name: String },
    /// Delete a chat
    Delete { id: ChatId },
    /// Send a message and print the reply
    Send {
        text: String,
        /// File to attach (repeatable)
        #[arg(short, long = "attach")]
        attach: Vec<PathBuf>,
        #[arg(long)]
        chat: Option<ChatId>,
    },
    /// Send an earlier user message again
    Retry {
        message_id: MessageId,
        #[arg(long)]
        chat: Option<ChatId>,
    },
    /// Delete one message
    RemoveMessage {
        message_id: MessageId,
        #[arg(long)]
        chat: Option<ChatId>,
    },
    /// Show or change global settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Change a chat's name, participant names or system instructions
    ChatSettings {
        id: ChatId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        user_name: Option<String>,
        #[arg(long)]
        ai_name: Option<String>,
        #[arg(long)]
        system_instructions: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Update one or more settings
    Set {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// system, light or dark
        #[arg(long)]
        theme: Option<String>,
        /// Clamped to [0, 1]
        #[arg(long, allow_negative_numbers = true)]
        temperature: Option<f64>,
        /// Clamped to [1, 8192]
        #[arg(long, allow_negative_numbers = true)]
        max_output_tokens: Option<f64>,
    },
    /// Restore the defaults
    Reset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("gemchat=info,gemchat_client=debug,gemchat_store=info,warn")
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let store: Store = Rc::new(open_database(&config)?);
    let repo = ChatRepository::initialize(store.clone()).context("failed to load chats")?;
    let settings = SettingsManager::load(store).context("failed to load settings")?;
    let client = CompletionClient::new(&config)?;
    let session = ChatSession::new(repo, settings, client).with_fallback_api_key(config.env_api_key.clone());

    let result = run(&session, cli.command).await;

    let (repo, _settings) = session.into_parts();
    repo.dispose().context("failed to save chats")?;
    result
}

fn open_database(config: &ClientConfig) -> Result<Database> {
    let db = match &config.data_dir {
        Some(dir) => Database::open_in_dir(dir),
        None => Database::new(),
    };
    db.context("failed to open the gemchat database")
}

async fn run(session: &ChatSession<Store>, command: Commands) -> Result<()> {
    match command {
        Commands::List => list_chats(session),
        Commands::New => {
            let mut repo = session.repo_mut();
            let chat = repo.create()?;
            println!("{}", chat.id);
            Ok(())
        }
        Commands::Show { chat } => {
            let repo = session.repo();
            let id = target(&repo, chat);
            let chat = repo.get(&id).with_context(|| format!("no chat with id {id}"))?;
            print_chat(chat);
            Ok(())
        }
        Commands::Switch { id } => {
            if !session.repo_mut().set_current(&id)? {
                bail!("no chat with id {id}");
            }
            Ok(())
        }
        Commands::Rename { id, name } => {
            if session.repo().get(&id).is_none() {
                bail!("no chat with id {id}");
            }
            if !session.repo_mut().rename(&id, &name)? {
                println!("Name unchanged");
            }
            Ok(())
        }
        Commands::Delete { id } => {
            if !session.repo_mut().delete(&id)? {
                bail!("no chat with id {id}");
            }
            Ok(())
        }
        Commands::Send { text, attach, chat } => {
            let id = target(&session.repo(), chat);
            let attachments = read_attachments(&attach).await;
            report(session.send(&id, &text, attachments).await)
        }
        Commands::Retry { message_id, chat } => {
            let id = target(&session.repo(), chat);
            report(session.retry(&id, message_id).await)
        }
        Commands::RemoveMessage { message_id, chat } => {
            let id = target(&session.repo(), chat);
            if !session.repo_mut().remove_message(&id, message_id)? {
                bail!("no message {message_id} in chat {id}");
            }
            Ok(())
        }
        Commands::Settings { action } => settings_command(session, action),
        Commands::ChatSettings {
            id,
            name,
            user_name,
            ai_name,
            system_instructions,
        } => {
            let form = ChatSettingsUpdate {
                name,
                user_name,
                ai_name,
                system_instructions,
            };
            if !session.repo_mut().update_settings(&id, form)? {
                bail!("no chat with id {id}");
            }
            Ok(())
        }
    }
}

/// `chat`, or the current chat when not given.
fn target(repo: &ChatRepository<Store>, chat: Option<ChatId>) -> ChatId {
    chat.unwrap_or_else(|| repo.current_id().clone())
}

fn list_chats(session: &ChatSession<Store>) -> Result<()> {
    let repo = session.repo();
    for chat in repo.list() {
        let marker = if &chat.id == repo.current_id() { "*" } else { " " };
        println!("{marker} {}  {}  {}", chat.id, chat.name, chat_preview(chat));
    }
    Ok(())
}

fn print_chat(chat: &Chat) {
    println!("# {} ({})", chat.name, chat.id);
    if !chat.settings.system_instructions.is_empty() {
        println!("  system: {}", chat.settings.system_instructions);
    }
    for message in &chat.messages {
        let author = match message.sender {
            Sender::User => &chat.settings.user_name,
            Sender::Ai => &chat.settings.ai_name,
        };
        println!("\n[{author}] {}", message.id);
        if !message.text.is_empty() {
            println!("{}", message.text);
        }
        for attachment in message.attachments() {
            let size = attachment
                .size
                .map(|s| format_size(s as f64))
                .filter(|s| !s.is_empty())
                .map(|s| format!(", {s}"))
                .unwrap_or_default();
            println!("  + {} ({}{size})", attachment.name, attachment.mime_type);
        }
    }
}

fn report(result: std::result::Result<Option<SendOutcome>, SessionError>) -> Result<()> {
    match result {
        Ok(Some(outcome)) => {
            println!("{}", outcome.reply);
            Ok(())
        }
        Ok(None) => {
            println!("Nothing to send");
            Ok(())
        }
        Err(e) => {
            if let Some(input) = e.pending_input() {
                println!("{FAILURE_REPLY}");
                eprintln!(
                    "Your message was kept ({} attachment(s)): {}",
                    input.attachments.len(),
                    input.text
                );
            }
            Err(e.into())
        }
    }
}

fn settings_command(session: &ChatSession<Store>, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => {}
        SettingsAction::Set {
            api_key,
            model,
            theme,
            temperature,
            max_output_tokens,
        } => {
            let theme = theme.map(|t| t.parse::<Theme>()).transpose()?;
            session.settings_mut().update(GlobalSettingsUpdate {
                api_key,
                theme,
                model,
                temperature,
                max_output_tokens,
            })?;
        }
        SettingsAction::Reset => {
            session.settings_mut().reset()?;
        }
    }

    let settings = session.settings();
    let current = settings.current();
    let key = if current.has_api_key() {
        "<set>"
    } else if session.effective_settings().has_api_key() {
        "<from GEMINI_API_KEY>"
    } else {
        "<not set>"
    };
    println!("apiKey:          {key}");
    println!("theme:           {}", current.theme.as_str());
    println!("model:           {}", current.model);
    println!("temperature:     {}", current.temperature);
    println!("maxOutputTokens: {}", current.max_output_tokens);
    Ok(())
}
