//! Chat list operations that run outside an open session.

use tracing::{debug, info};

use crate::api::{ApiError, BackendApi};
use crate::core::message::HistoryItem;
use crate::core::store::SessionStores;

/// Create a chat for `prompt` and stage the prompt so the next
/// [`SessionController::open`](crate::core::session::SessionController::open)
/// submits it.
///
/// Returns `Ok(None)` for a blank prompt; nothing is sent to the backend.
pub async fn create_chat(
    api: &dyn BackendApi,
    stores: &SessionStores,
    prompt: &str,
) -> Result<Option<HistoryItem>, ApiError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        debug!("not creating a chat for an empty prompt");
        return Ok(None);
    }

    let item = api.create_chat(prompt).await?;
    info!(chat_id = %item.id, "created chat");

    stores.history.update(|history| history.prepend(item.clone()));
    stores.chat.update(|chat| {
        chat.clear_chat();
        chat.title = Some(item.title.clone());
        chat.queue_prompt(prompt);
    });
    Ok(Some(item))
}

/// Replace the history store with the server's chat list.
pub async fn refresh_history(
    api: &dyn BackendApi,
    stores: &SessionStores,
) -> Result<usize, ApiError> {
    let items = api.history().await?;
    let count = items.len();
    stores.history.update(|history| history.replace(items));
    Ok(count)
}
