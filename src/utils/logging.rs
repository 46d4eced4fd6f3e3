use crate::core::message::ChatMessage;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Appends finished turns to a plain-text transcript.
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
}

impl TranscriptLog {
    pub fn new(log_file: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(path) = &log_file {
            // Fail early rather than after a generation has run.
            OpenOptions::new().create(true).append(true).open(path)?;
        }
        Ok(TranscriptLog {
            file_path: log_file,
        })
    }

    pub fn log_turn(&self, message: &ChatMessage) -> Result<(), Box<dyn std::error::Error>> {
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::new(file);

        for line in format!("You: {}", message.prompt).lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;

        let response = message.response_text();
        if !response.is_empty() {
            for line in response.lines() {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer)?;
        }

        if let Some(url) = &message.video_url {
            writeln!(writer, "## Video: {url}")?;
            writeln!(writer)?;
        }

        writer.flush()?;
        Ok(())
    }
}
