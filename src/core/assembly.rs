//! Folds streamed fragments into the current turn's response text.
//!
//! The backend follows its prose explanation with a fenced generation script.
//! Only the prose is shown, so everything from the opening fence to the closing
//! fence is dropped.

use crate::core::message::ChatMessage;
use crate::core::phase::{contains_fence, CODE_FENCE};

#[derive(Debug, Default)]
pub struct MessageAssembler {
    in_code_block: bool,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_code_block(&self) -> bool {
        self.in_code_block
    }

    pub fn reset(&mut self) {
        self.in_code_block = false;
    }

    /// Returns the part of `fragment` that belongs in the response, updating
    /// the code-block flag. `None` means the fragment is swallowed entirely.
    pub fn filter<'a>(&mut self, fragment: &'a str) -> Option<&'a str> {
        if self.in_code_block {
            if contains_fence(fragment) {
                self.in_code_block = false;
            }
            return None;
        }

        match fragment.split_once(CODE_FENCE) {
            Some((before, _)) => {
                self.in_code_block = true;
                Some(before)
            }
            None => Some(fragment),
        }
    }

    /// Appends the visible part of `fragment` to the last message.
    /// Returns whether the list was touched.
    pub fn append_to(&mut self, messages: &mut [ChatMessage], fragment: &str) -> bool {
        let Some(text) = self.filter(fragment) else {
            return false;
        };
        match messages.last_mut() {
            Some(last) => {
                last.append_response(text);
                true
            }
            None => false,
        }
    }
}
