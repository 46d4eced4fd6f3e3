//! URL helpers for the REST and socket halves of the backend.
//!
//! Base URLs come from user config and frequently carry trailing slashes; the
//! helpers here normalize them so endpoint paths never double up.

use reqwest::Url;

/// Strip trailing slashes from a configured base URL.
///
/// # Examples
///
/// ```
/// use anim::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/"), "https://api.example.com");
/// assert_eq!(normalize_base_url("wss://rt.example.com///"), "wss://rt.example.com");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a REST endpoint onto the configured API base URL.
///
/// # Examples
///
/// ```
/// use anim::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/", "/chat/history"),
///     "https://api.example.com/chat/history"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Build the streaming socket URL for one chat session
/// (`{socket_url}/chat/ws?chat_id={id}`).
///
/// The chat id is query-encoded. Fails when the base is not an absolute URL.
///
/// # Examples
///
/// ```
/// use anim::utils::url::construct_socket_url;
///
/// assert_eq!(
///     construct_socket_url("ws://localhost:8000/", "abc 1").unwrap(),
///     "ws://localhost:8000/chat/ws?chat_id=abc+1"
/// );
/// ```
pub fn construct_socket_url(socket_base_url: &str, chat_id: &str) -> Result<String, String> {
    let raw = construct_api_url(socket_base_url, "chat/ws");
    let mut url = Url::parse(&raw).map_err(|err| format!("invalid socket URL {raw}: {err}"))?;
    url.query_pairs_mut().append_pair("chat_id", chat_id);
    Ok(url.to_string())
}
