use serde::{Deserialize, Serialize};

/// Placeholder id given to a turn appended before the backend has assigned one.
pub const PENDING_MESSAGE_ID: &str = "pending";

/// One user turn: the prompt plus whatever the backend produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl ChatMessage {
    /// Optimistic turn for a prompt that was just submitted.
    pub fn pending(prompt: impl Into<String>) -> Self {
        Self {
            id: PENDING_MESSAGE_ID.to_string(),
            prompt: prompt.into(),
            response: Some(String::new()),
            video_url: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id == PENDING_MESSAGE_ID
    }

    pub fn response_text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }

    pub fn append_response(&mut self, text: &str) {
        self.response.get_or_insert_with(String::new).push_str(text);
    }
}

/// Sidebar summary of a past chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_turn_starts_with_empty_response() {
        let message = ChatMessage::pending("Explain limits");
        assert!(message.is_pending());
        assert_eq!(message.prompt, "Explain limits");
        assert_eq!(message.response.as_deref(), Some(""));
        assert_eq!(message.video_url, None);
    }

    #[test]
    fn append_response_initializes_missing_text() {
        let mut message = ChatMessage {
            id: "m1".into(),
            prompt: "p".into(),
            response: None,
            video_url: None,
        };
        message.append_response("Hello");
        message.append_response(", world");
        assert_eq!(message.response_text(), "Hello, world");
        assert!(!message.is_pending());
    }
}
