//! Plain-terminal rendering of the chat store.
//!
//! Response text streams to stdout as it is assembled; phase changes and the
//! finished video link go to stderr/stdout on their own lines.

use std::collections::HashSet;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;

use crate::core::message::ChatMessage;
use crate::core::phase::ResponsePhase;
use crate::core::store::{ChatState, StoreHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutput {
    Text(String),
    Status(&'static str),
    Video(String),
}

#[derive(Debug, Default)]
pub struct ChatRenderer {
    turn_index: Option<usize>,
    printed: usize,
    phase: Option<ResponsePhase>,
    videos_shown: HashSet<String>,
}

impl ChatRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that treats everything already in `chat` as shown.
    pub fn starting_at(chat: &ChatState) -> Self {
        let mut renderer = Self::new();
        renderer.turn_index = chat.messages.len().checked_sub(1);
        renderer.printed = chat
            .last_message()
            .map(|message| message.response_text().len())
            .unwrap_or(0);
        renderer.phase = chat.phase;
        renderer.videos_shown = chat
            .messages
            .iter()
            .filter_map(|message| message.video_url.clone())
            .collect();
        renderer
    }

    /// A renderer for a chat whose history was just printed in full: existing
    /// text and videos count as shown, but a phase still in progress (a resumed
    /// job) is announced on the first render.
    pub fn after_history(chat: &ChatState) -> Self {
        let mut renderer = Self::starting_at(chat);
        renderer.phase = None;
        renderer
    }

    pub fn render(&mut self, chat: &ChatState) -> Vec<RenderOutput> {
        let mut outputs = Vec::new();

        if chat.phase != self.phase {
            self.phase = chat.phase;
            if let Some(indicator) = chat.phase.and_then(ResponsePhase::indicator) {
                outputs.push(RenderOutput::Status(indicator));
            }
        }

        let last_index = chat.messages.len().checked_sub(1);
        if last_index != self.turn_index {
            self.turn_index = last_index;
            self.printed = 0;
        }
        if let Some(message) = chat.last_message() {
            if let Some(delta) = self.take_delta(message) {
                outputs.push(RenderOutput::Text(delta));
            }
            if let Some(url) = &message.video_url {
                if self.videos_shown.insert(url.clone()) {
                    outputs.push(RenderOutput::Video(url.clone()));
                }
            }
        }

        outputs
    }

    fn take_delta(&mut self, message: &ChatMessage) -> Option<String> {
        let text = message.response_text();
        if text.len() <= self.printed || !text.is_char_boundary(self.printed) {
            // The list was replaced by the server copy; nothing new to stream.
            self.printed = self.printed.max(text.len());
            return None;
        }
        let delta = text[self.printed..].to_string();
        self.printed = text.len();
        Some(delta)
    }
}

struct TerminalSink {
    mid_line: bool,
}

impl TerminalSink {
    fn emit(&mut self, outputs: Vec<RenderOutput>) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for output in outputs {
            match output {
                RenderOutput::Text(text) => {
                    write!(stdout, "{text}")?;
                    self.mid_line = !text.ends_with('\n');
                }
                RenderOutput::Status(indicator) => {
                    self.break_line(&mut stdout)?;
                    eprintln!("⏳ {indicator}...");
                }
                RenderOutput::Video(url) => {
                    self.break_line(&mut stdout)?;
                    writeln!(stdout, "🎬 {url}")?;
                }
            }
        }
        stdout.flush()
    }

    fn break_line(&mut self, stdout: &mut impl Write) -> io::Result<()> {
        if self.mid_line {
            writeln!(stdout)?;
            stdout.flush()?;
            self.mid_line = false;
        }
        Ok(())
    }
}

/// Render the current state, then every store revision until `cancel` fires,
/// then once more so the final state is never missed.
pub async fn follow_chat(
    store: StoreHandle<ChatState>,
    mut renderer: ChatRenderer,
    cancel: CancellationToken,
) -> io::Result<()> {
    let mut revisions = store.subscribe();
    let mut sink = TerminalSink { mid_line: false };
    sink.emit(store.read(|chat| renderer.render(chat)))?;
    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                sink.emit(store.read(|chat| renderer.render(chat)))?;
            }
            _ = cancel.cancelled() => break,
        }
    }
    sink.emit(store.read(|chat| renderer.render(chat)))?;
    let mut stdout = io::stdout().lock();
    sink.break_line(&mut stdout)
}

pub fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        println!("You: {}", message.prompt);
        let response = message.response_text();
        if !response.is_empty() {
            println!();
            println!("{response}");
        }
        if let Some(url) = &message.video_url {
            println!("🎬 {url}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::create_test_message;

    #[test]
    fn streams_deltas_and_phase_changes() {
        let mut renderer = ChatRenderer::new();
        let mut chat = ChatState::default();
        chat.push_pending_turn("Explain limits");
        chat.phase = Some(ResponsePhase::Waiting);

        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Status("Thinking")]
        );

        chat.phase = Some(ResponsePhase::Writing);
        chat.messages[0].append_response("Sure, ");
        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Text("Sure, ".into())]
        );

        chat.messages[0].append_response("limits.");
        chat.phase = Some(ResponsePhase::Coding);
        assert_eq!(
            renderer.render(&chat),
            vec![
                RenderOutput::Status("Writing video script"),
                RenderOutput::Text("limits.".into()),
            ]
        );
        assert!(renderer.render(&chat).is_empty());
    }

    #[test]
    fn replaced_list_only_announces_video() {
        let mut renderer = ChatRenderer::new();
        let mut chat = ChatState::default();
        chat.push_pending_turn("Explain limits");
        chat.messages[0].append_response("Sure");
        renderer.render(&chat);

        let mut fetched = create_test_message("m1", "Explain limits", "Sure");
        fetched.video_url = Some("https://cdn.test/m1.mp4".into());
        chat.set_messages(vec![fetched]);

        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Video("https://cdn.test/m1.mp4".into())]
        );
        assert!(renderer.render(&chat).is_empty());
    }

    #[test]
    fn starting_at_skips_existing_history() {
        let mut chat = ChatState::default();
        let mut old = create_test_message("m1", "p", "done");
        old.video_url = Some("https://cdn.test/m1.mp4".into());
        chat.set_messages(vec![old]);

        let mut renderer = ChatRenderer::starting_at(&chat);
        assert!(renderer.render(&chat).is_empty());

        chat.push_pending_turn("next");
        chat.messages[1].append_response("new text");
        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Text("new text".into())]
        );
    }

    #[test]
    fn loaded_history_is_not_rendered_again() {
        let mut chat = ChatState::default();
        let mut old = create_test_message("m1", "Explain limits", "Sure, limits.");
        old.video_url = Some("https://cdn.test/m1.mp4".into());
        chat.set_messages(vec![old.clone()]);

        let mut renderer = ChatRenderer::after_history(&chat);
        assert!(renderer.render(&chat).is_empty());

        chat.set_messages(vec![old]);
        assert!(renderer.render(&chat).is_empty());
    }

    #[test]
    fn resumed_job_announces_its_phase_once() {
        let mut chat = ChatState::default();
        chat.set_messages(vec![create_test_message("m1", "Explain limits", "Sure")]);
        chat.phase = Some(ResponsePhase::Generating);

        let mut renderer = ChatRenderer::after_history(&chat);
        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Status("Generating video")]
        );

        let mut finished = create_test_message("m1", "Explain limits", "Sure");
        finished.video_url = Some("https://cdn.test/m1.mp4".into());
        chat.set_messages(vec![finished]);
        chat.phase = None;
        assert_eq!(
            renderer.render(&chat),
            vec![RenderOutput::Video("https://cdn.test/m1.mp4".into())]
        );
    }
}
