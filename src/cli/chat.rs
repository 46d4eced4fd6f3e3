//! `new`, `send` and `open`: commands that drive a chat session.

use std::error::Error;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiClient, BackendApi};
use crate::cli::render::{follow_chat, print_messages, ChatRenderer};
use crate::core::config::Config;
use crate::core::events::SessionNotice;
use crate::core::history::create_chat;
use crate::core::session::{OpenOutcome, SessionController, SessionError};
use crate::core::store::{ChatState, SessionStores, StoreHandle};
use crate::core::transport::WebSocketTransport;
use crate::utils::logging::TranscriptLog;

pub async fn run_new(
    config: &Config,
    transcript: &TranscriptLog,
    prompt: &str,
) -> Result<(), Box<dyn Error>> {
    let api: Arc<dyn BackendApi> = Arc::new(ApiClient::from_config(config));
    let stores = SessionStores::new();

    let Some(chat) = create_chat(api.as_ref(), &stores, prompt).await? else {
        eprintln!("Usage: anim new <prompt>");
        std::process::exit(1);
    };
    eprintln!("💬 {} ({})", chat.title, chat.id);

    run_session(config, transcript, api, stores, &chat.id).await
}

pub async fn run_send(
    config: &Config,
    transcript: &TranscriptLog,
    chat_id: &str,
    prompt: &str,
) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        eprintln!("Usage: anim send <chat-id> <prompt>");
        std::process::exit(1);
    }
    let api: Arc<dyn BackendApi> = Arc::new(ApiClient::from_config(config));
    let stores = SessionStores::new();
    stores.chat.update(|chat| chat.queue_prompt(prompt));

    run_session(config, transcript, api, stores, chat_id).await
}

pub async fn run_open(
    config: &Config,
    transcript: &TranscriptLog,
    chat_id: &str,
) -> Result<(), Box<dyn Error>> {
    let api: Arc<dyn BackendApi> = Arc::new(ApiClient::from_config(config));
    run_session(config, transcript, api, SessionStores::new(), chat_id).await
}

async fn run_session(
    config: &Config,
    transcript: &TranscriptLog,
    api: Arc<dyn BackendApi>,
    stores: SessionStores,
    chat_id: &str,
) -> Result<(), Box<dyn Error>> {
    let transport = WebSocketTransport::new(&config.resolved_socket_url(), config.api_token.clone());
    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let mut controller = SessionController::new(
        chat_id,
        stores.clone(),
        api,
        Box::new(transport),
        config.poll_settings(),
        notice_tx,
    );

    let before_open = stores.chat.read(ChatRenderer::starting_at);
    let outcome = controller.open().await;
    let seeded = seed_renderer(&outcome, before_open, &stores.chat);

    let cancel = CancellationToken::new();
    let renderer = tokio::spawn(follow_chat(stores.chat.clone(), seeded, cancel.clone()));

    let interrupted = match &outcome {
        Ok(_) => {
            tokio::select! {
                _ = controller.run_until_idle() => false,
                _ = tokio::signal::ctrl_c() => true,
            }
        }
        Err(_) => false,
    };
    if interrupted {
        controller.teardown().await;
    }

    cancel.cancel();
    match renderer.await {
        Ok(Err(err)) => warn!("terminal output failed: {err}"),
        Err(err) => warn!("renderer task failed: {err}"),
        Ok(Ok(())) => {}
    }

    let mut failure = None;
    while let Ok(notice) = notices.try_recv() {
        match notice {
            SessionNotice::VideoReceived => eprintln!("✅ Video ready"),
            SessionNotice::GenerationError(message)
            | SessionNotice::MessageSendFailed(message) => {
                eprintln!("❌ {message}");
                failure = Some(message);
            }
            SessionNotice::ScrollToTail => debug!("new turn appended"),
        }
    }

    if matches!(outcome, Ok(OpenOutcome::Generating)) {
        if let Some(turn) = stores.chat.read(|chat| chat.last_message().cloned()) {
            if let Err(err) = transcript.log_turn(&turn) {
                warn!("failed to write transcript: {err}");
            }
        }
    }

    if interrupted {
        eprintln!("Interrupted; the video keeps rendering on the server. Run `anim open {chat_id}` to check on it.");
        return Ok(());
    }
    match outcome {
        Err(err) if failure.is_none() => Err(err.into()),
        _ => match failure {
            Some(message) => Err(message.into()),
            None => Ok(()),
        },
    }
}

/// Pick the renderer that streams what happens after `open`. Loaded history
/// is printed in full here, so the renderer starts past it.
fn seed_renderer(
    outcome: &Result<OpenOutcome, SessionError>,
    before_open: ChatRenderer,
    chat: &StoreHandle<ChatState>,
) -> ChatRenderer {
    match outcome {
        Ok(OpenOutcome::Loaded { .. }) => {
            print_messages(&chat.read(|chat| chat.messages.clone()));
            chat.read(ChatRenderer::after_history)
        }
        _ => before_open,
    }
}
