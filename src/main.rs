use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{Document, User};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use jdbot::bot::documents::{self, DocumentError};
use jdbot::bot::resume::ExtractError;
use jdbot::bot::{BackendClient, ConversationEngine, TelegramClient};
use jdbot::config::Config;

struct BotState {
    engine: ConversationEngine,
    backend: Arc<BackendClient>,
    telegram: TelegramClient,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "cancel the current operation")]
    Cancel,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "jdbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("jdbot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting jdbot...");
    info!("Loaded config from {config_path}");
    info!("Backend API: {}", config.backend_base_url);

    let backend = match BackendClient::new(
        &config.backend_base_url,
        Duration::from_secs(config.request_timeout_secs),
    ) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!("Failed to build backend HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let state = Arc::new(BotState {
        engine: ConversationEngine::new(backend.clone()),
        backend,
        telegram: TelegramClient::new(bot.clone()),
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };

    match cmd {
        Command::Cancel => {
            info!("🚫 /cancel from {} ({})", display_name(user), user.id);
            let reply = state.engine.handle_cancel(user.id.0 as i64).await;
            send_reply(&state, &msg, &reply).await;
        }
    }

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(members) = msg.new_chat_members() {
        handle_new_members(&msg, members, &state).await;
        return Ok(());
    }

    if let Some(document) = msg.document() {
        handle_document(&msg, document, &state).await;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };
    // /cancel is routed by the command branch; other commands stay out of
    // the dialogue.
    if text.starts_with('/') {
        return Ok(());
    }

    let Some(ref user) = msg.from else {
        return Ok(());
    };

    let text_preview: String = text.chars().take(100).collect();
    info!("📨 Message from {} ({}): \"{text_preview}\"", display_name(user), user.id);

    let reply = state.engine.handle_text(user.id.0 as i64, text).await;
    send_reply(&state, &msg, &reply).await;

    Ok(())
}

async fn handle_new_members(msg: &Message, members: &[User], state: &BotState) {
    for member in members {
        info!("👋 Member joined: {} ({})", member.full_name(), member.id);
        let greeting = format!("Welcome to JobDeal, {}!", member.full_name());
        if let Err(e) = state.telegram.send_message(msg.chat.id.0, &greeting, None).await {
            warn!("Failed to send welcome: {e}");
        }
    }
}

async fn handle_document(msg: &Message, document: &Document, state: &BotState) {
    let name = document.file_name.as_deref().unwrap_or("unnamed");
    info!("📄 Document received: {name}");

    let reply = match documents::process(
        &state.telegram,
        state.backend.as_ref(),
        document.file.id.clone(),
    )
    .await
    {
        Ok(analysis) => analysis,
        Err(DocumentError::Extract(ExtractError::NoText)) => {
            info!("Document '{name}' contained no extractable text");
            documents::NO_TEXT_REPLY.to_string()
        }
        Err(err) => {
            error!("Error handling document '{name}': {err}");
            documents::failure_reply(&err).to_string()
        }
    };

    send_reply(state, msg, &reply).await;
}

fn display_name(user: &User) -> &str {
    user.username.as_deref().unwrap_or(&user.first_name)
}

async fn send_reply(state: &BotState, msg: &Message, text: &str) {
    if let Err(e) = state
        .telegram
        .send_message(msg.chat.id.0, text, Some(msg.id.0 as i64))
        .await
    {
        warn!("Failed to reply: {e}");
    }
}
