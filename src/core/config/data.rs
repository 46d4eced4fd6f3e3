use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::poller::{PollSettings, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SOCKET_URL: &str = "ws://localhost:8000";

pub const API_URL_ENV: &str = "ANIM_API_URL";
pub const SOCKET_URL_ENV: &str = "ANIM_SOCKET_URL";
pub const API_TOKEN_ENV: &str = "ANIM_API_TOKEN";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// REST base URL, e.g. "https://anim.example.com"
    pub api_url: Option<String>,
    /// WebSocket base URL; the chat socket lives at `{socket_url}/chat/ws`
    pub socket_url: Option<String>,
    /// Bearer token sent with every request and the socket handshake
    pub api_token: Option<String>,
    /// Seconds between status checks while a video renders
    pub poll_interval_secs: Option<u64>,
    /// Give up after this many status checks; unset polls until the job ends
    pub max_poll_attempts: Option<u32>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn resolved_api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn resolved_socket_url(&self) -> String {
        self.socket_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SOCKET_URL.to_string())
    }

    pub fn poll_settings(&self) -> PollSettings {
        let interval = match self.poll_interval_secs {
            Some(0) | None => DEFAULT_POLL_INTERVAL,
            Some(secs) => Duration::from_secs(secs),
        };
        PollSettings {
            interval,
            max_attempts: self.max_poll_attempts.filter(|attempts| *attempts > 0),
        }
    }

    /// Environment values win over the file. Empty variables are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = read(API_URL_ENV) {
            self.api_url = Some(url);
        }
        if let Some(url) = read(SOCKET_URL_ENV) {
            self.socket_url = Some(url);
        }
        if let Some(token) = read(API_TOKEN_ENV) {
            self.api_token = Some(token);
        }
    }
}
