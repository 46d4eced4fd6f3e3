//! One-shot lookups: history, status, credits, video.

use std::error::Error;

use chrono::Local;

use crate::api::{ApiClient, BackendApi, Credits, StatusResponse};
use crate::core::config::Config;
use crate::core::history::refresh_history;
use crate::core::store::SessionStores;

pub async fn print_history(config: &Config) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::from_config(config);
    let stores = SessionStores::new();
    if refresh_history(&api, &stores).await? == 0 {
        println!("No chats yet. Start one with `anim new <prompt>`.");
        return Ok(());
    }
    stores.history.read(|history| {
        for item in &history.items {
            println!("{}  {}", item.id, item.title);
        }
    });
    Ok(())
}

pub fn describe_status(status: Option<&StatusResponse>) -> String {
    let Some(status) = status else {
        return "No video job is running.".to_string();
    };
    let mut line = format!(
        "Job {} for chat {} (message {}): {}",
        status.task_id,
        status.chat_id,
        status.message_id,
        status.status.as_str()
    );
    if let Some(error) = &status.error {
        line.push_str(&format!(" ({error})"));
    }
    line
}

pub async fn print_status(config: &Config) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::from_config(config);
    let status = api.status().await?;
    println!("{}", describe_status(status.as_ref()));
    Ok(())
}

pub fn describe_credits(credits: &Credits) -> String {
    match credits.refreshed_at_utc() {
        Some(refreshed) => format!(
            "Credits: {} (refreshed {})",
            credits.credits,
            refreshed.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => format!("Credits: {}", credits.credits),
    }
}

pub async fn print_credits(config: &Config) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::from_config(config);
    println!("{}", describe_credits(&api.credits().await?));
    Ok(())
}

pub async fn print_video(config: &Config, message_id: &str) -> Result<(), Box<dyn Error>> {
    let api = ApiClient::from_config(config);
    match api.video_url(message_id).await? {
        Some(url) => println!("{url}"),
        None => {
            eprintln!("No video for message {message_id} yet.");
            std::process::exit(1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use crate::utils::test_utils::status_record;

    #[test]
    fn status_lines() {
        assert_eq!(describe_status(None), "No video job is running.");
        let mut failed = status_record("chat-1", JobStatus::Failed);
        failed.error = Some("render crashed".into());
        assert_eq!(
            describe_status(Some(&failed)),
            "Job task-1 for chat chat-1 (message message-1): failed (render crashed)"
        );
    }

    #[test]
    fn credits_without_timestamp() {
        let credits = Credits {
            credits: 12,
            refreshed_at: None,
        };
        assert_eq!(describe_credits(&credits), "Credits: 12");
    }
}
