use crate::core::config::data::{Config, DEFAULT_API_URL, DEFAULT_SOCKET_URL};
use crate::core::poller::DEFAULT_POLL_INTERVAL;

/// Show a token without leaking it into terminal scrollback.
fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let visible: String = token.chars().skip(count - 4).collect();
    format!("****{visible}")
}

impl Config {
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec!["Current configuration:".to_string()];
        match &self.api_url {
            Some(url) => lines.push(format!("  api-url: {url}")),
            None => lines.push(format!("  api-url: (unset, using {DEFAULT_API_URL})")),
        }
        match &self.socket_url {
            Some(url) => lines.push(format!("  socket-url: {url}")),
            None => lines.push(format!("  socket-url: (unset, using {DEFAULT_SOCKET_URL})")),
        }
        match &self.api_token {
            Some(token) => lines.push(format!("  api-token: {}", mask_token(token))),
            None => lines.push("  api-token: (unset)".to_string()),
        }
        match self.poll_interval_secs {
            Some(secs) => lines.push(format!("  poll-interval: {secs}s")),
            None => lines.push(format!(
                "  poll-interval: (unset, using {}s)",
                DEFAULT_POLL_INTERVAL.as_secs()
            )),
        }
        match self.max_poll_attempts {
            Some(attempts) => lines.push(format!("  max-poll-attempts: {attempts}")),
            None => lines.push("  max-poll-attempts: (unbounded)".to_string()),
        }
        lines
    }

    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }
}
