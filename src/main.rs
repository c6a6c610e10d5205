//! milo-chat: talk to Milo from a terminal
//!
//! Each stdin line is sent as one turn. `/quit` or EOF ends the session.

use futures::StreamExt;
use milo_companion::db::Database;
use milo_companion::llm::{LoggingAiClient, OpenAiCompanionClient};
use milo_companion::models::MessageRole;
use milo_companion::runtime::{DatabaseRepository, StateStream};
use milo_companion::{CompanionConfig, ProductionController, SendOutcome, UiState};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "milo_companion=info,milo_chat=info".into());

    // Logs go to stderr so they do not interleave with the transcript
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Print new messages and typing changes as snapshots arrive
async fn render(mut states: StateStream) {
    let mut printed = 0usize;
    let mut session: Option<String> = None;
    let mut typing = false;
    let mut shown_error = None;

    while let Some(state) = states.next().await {
        if state.session_id != session || state.messages.len() < printed {
            session.clone_from(&state.session_id);
            printed = 0;
        }
        print_new_messages(&state, printed);
        printed = state.messages.len();

        if state.is_ai_typing && !typing {
            println!("  (Milo is typing...)");
        }
        typing = state.is_ai_typing;

        if state.error != shown_error {
            if let Some(error) = &state.error {
                println!("  ! {}", error.message);
            }
            shown_error = state.error;
        }
    }
}

fn print_new_messages(state: &UiState, already_printed: usize) {
    for message in state.messages.iter().skip(already_printed) {
        match message.role {
            MessageRole::Ai => {
                let mood = message.mood.unwrap_or(state.mood);
                println!("Milo {} [{}]: {}", mood.face(), mood, message.content);
            }
            MessageRole::User => println!("You: {}", message.content),
            MessageRole::System => println!("  * {}", message.content),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CompanionConfig::from_env();
    init_tracing(config.log_json);

    let Some(settings) = config.openai_settings() else {
        return Err("No AI API key configured. Set MILO_AI_API_KEY or OPENAI_API_KEY.".into());
    };

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let openai = OpenAiCompanionClient::new(settings)?;
    tracing::info!(model = %openai.model(), "AI client initialized");
    let label = openai.model().to_string();
    let ai_client = LoggingAiClient::new(Arc::new(openai), label);

    let controller = ProductionController::new(DatabaseRepository::new(db), ai_client);
    let renderer = tokio::spawn(render(controller.observe_state()));

    let session_id = controller.start_session(&config.user_id).await?;
    tracing::info!(session_id = %session_id, user_id = %config.user_id, "Chat started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        if let SendOutcome::Aborted(e) = controller.send_message(&line, &config.user_id).await {
            tracing::error!(error = %e, "Turn aborted");
        }
    }

    controller.end_session().await;
    renderer.abort();
    Ok(())
}
