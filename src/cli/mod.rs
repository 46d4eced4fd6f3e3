//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod info;
pub mod render;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::utils::diagnostics::init_tracing;
use crate::utils::logging::TranscriptLog;

#[derive(Parser, Debug)]
#[command(name = "anim")]
#[command(version, about = "Turn prompts into explainer videos from the terminal")]
#[command(
    long_about = "anim sends a prompt to the animation backend, streams the explanation as it \
is written, and waits for the rendered video.\n\n\
Environment Variables:\n\
  ANIM_API_URL      REST base URL (overrides config)\n\
  ANIM_SOCKET_URL   WebSocket base URL (overrides config)\n\
  ANIM_API_TOKEN    Bearer token (overrides config)\n\
  ANIM_CONFIG_DIR   Directory holding config.toml\n\
  ANIM_LOG          Diagnostic log filter (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Append finished turns to a transcript file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Write diagnostic logs to a file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub debug_log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new chat and generate a video for the prompt
    New {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Send a follow-up prompt to an existing chat
    Send {
        chat_id: String,
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Show a chat's messages, waiting for a video still being rendered
    Open { chat_id: String },
    /// List previous chats
    History,
    /// Show the video job currently running, if any
    Status,
    /// Show remaining credits
    Credits,
    /// Print the video URL for a message
    Video { message_id: String },
    /// Print the current configuration
    Config,
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        value: String,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.debug_log.as_deref())?;

    match args.command {
        Commands::Config => {
            let (config, path) = Config::load_stored()?;
            config.print_all();
            println!("  (file: {})", path_display(path));
            Ok(())
        }
        Commands::Set { key, value } => {
            let (mut config, path) = Config::load_stored()?;
            config.set_key(&key, &value)?;
            config.save_to_path(&path)?;
            println!("✅ Set {key}");
            Ok(())
        }
        Commands::Unset { key } => {
            let (mut config, path) = Config::load_stored()?;
            config.unset_key(&key)?;
            config.save_to_path(&path)?;
            println!("✅ Unset {key}");
            Ok(())
        }
        Commands::New { prompt } => {
            let config = Config::load()?;
            let transcript = TranscriptLog::new(args.log)?;
            chat::run_new(&config, &transcript, &prompt.join(" ")).await
        }
        Commands::Send { chat_id, prompt } => {
            let config = Config::load()?;
            let transcript = TranscriptLog::new(args.log)?;
            chat::run_send(&config, &transcript, &chat_id, &prompt.join(" ")).await
        }
        Commands::Open { chat_id } => {
            let config = Config::load()?;
            let transcript = TranscriptLog::new(args.log)?;
            chat::run_open(&config, &transcript, &chat_id).await
        }
        Commands::History => info::print_history(&Config::load()?).await,
        Commands::Status => info::print_status(&Config::load()?).await,
        Commands::Credits => info::print_credits(&Config::load()?).await,
        Commands::Video { message_id } => info::print_video(&Config::load()?, &message_id).await,
    }
}

#[cfg(test)]
mod tests;
