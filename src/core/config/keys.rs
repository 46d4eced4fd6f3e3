//! `anim set` / `anim unset` key handling.

use std::fmt;

use crate::core::config::data::Config;
use crate::utils::url::normalize_base_url;

pub const CONFIG_KEYS: &[&str] = &[
    "api-url",
    "socket-url",
    "api-token",
    "poll-interval",
    "max-poll-attempts",
];

#[derive(Debug, PartialEq, Eq)]
pub enum SettingError {
    UnknownKey(String),
    InvalidNumber { key: &'static str, input: String },
    InvalidUrl { key: &'static str, input: String },
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of {})",
                CONFIG_KEYS.join(", ")
            ),
            SettingError::InvalidNumber { key, input } => {
                write!(f, "{key} expects a positive whole number, got '{input}'")
            }
            SettingError::InvalidUrl { key, input } => {
                write!(f, "{key} expects an absolute URL, got '{input}'")
            }
        }
    }
}

impl std::error::Error for SettingError {}

fn parse_positive<T: std::str::FromStr + PartialOrd + Default>(
    key: &'static str,
    value: &str,
) -> Result<T, SettingError> {
    match value.trim().parse::<T>() {
        Ok(number) if number > T::default() => Ok(number),
        _ => Err(SettingError::InvalidNumber {
            key,
            input: value.to_string(),
        }),
    }
}

fn parse_url(key: &'static str, value: &str, schemes: &[&str]) -> Result<String, SettingError> {
    let normalized = normalize_base_url(value.trim());
    match reqwest::Url::parse(&normalized) {
        Ok(url) if schemes.contains(&url.scheme()) => Ok(normalized),
        _ => Err(SettingError::InvalidUrl {
            key,
            input: value.to_string(),
        }),
    }
}

impl Config {
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        match key {
            "api-url" => self.api_url = Some(parse_url("api-url", value, &["http", "https"])?),
            "socket-url" => {
                self.socket_url = Some(parse_url("socket-url", value, &["ws", "wss"])?)
            }
            "api-token" => self.api_token = Some(value.trim().to_string()),
            "poll-interval" => self.poll_interval_secs = Some(parse_positive("poll-interval", value)?),
            "max-poll-attempts" => {
                self.max_poll_attempts = Some(parse_positive("max-poll-attempts", value)?)
            }
            other => return Err(SettingError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn unset_key(&mut self, key: &str) -> Result<(), SettingError> {
        match key {
            "api-url" => self.api_url = None,
            "socket-url" => self.socket_url = None,
            "api-token" => self.api_token = None,
            "poll-interval" => self.poll_interval_secs = None,
            "max-poll-attempts" => self.max_poll_attempts = None,
            other => return Err(SettingError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}
