//! Polling HTTP client that renders the chat log to the terminal.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::message::Message;
use crate::sanitize::{self, Node};

/// POST a message to a running server and print the stored record's id.
pub async fn send(base_url: &str, name: &str, text: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let resp = client
        .post(messages_url(base_url))
        .json(&serde_json::json!({ "name": name, "text": text }))
        .send()
        .await
        .context("sending message")?;
    let status = resp.status();
    let body: Value = resp.json().await.context("decoding response")?;
    if !status.is_success() {
        bail!(
            "server rejected message: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }
    println!("sent {}", body["msg"]["id"].as_str().unwrap_or("?"));
    Ok(())
}

/// Poll the full message list on a fixed cadence and print each message the
/// first time it appears. The fetch is always the complete list; there is no
/// change detection or backoff, and a failed poll just waits for the next
/// cycle.
pub async fn watch(base_url: &str, interval: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        match fetch(&client, base_url).await {
            Ok(messages) => {
                for msg in &messages {
                    if seen.insert(msg.id.clone()) {
                        print!("{}", format_message(msg));
                    }
                }
            }
            Err(err) => warn!(error = %err, "poll failed"),
        }
        tokio::time::sleep(interval).await;
    }
}

/// Fetch the ordered message list from the server.
async fn fetch(client: &reqwest::Client, base_url: &str) -> Result<Vec<Message>> {
    let resp = client
        .get(messages_url(base_url))
        .send()
        .await
        .context("fetching messages")?;
    resp.json().await.context("decoding messages")
}

fn messages_url(base_url: &str) -> String {
    format!("{}/messages", base_url.trim_end_matches('/'))
}

/// Render one message for terminal display.
///
/// The stored escaped text runs through the sanitizer's render transform:
/// plain text prints as-is, links as `-> url`, video embeds as `[video] src`.
pub fn format_message(msg: &Message) -> String {
    let when = chrono::DateTime::from_timestamp(msg.ts as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| msg.ts.to_string());
    let mut out = format!("[{}] {}:\n", when, sanitize::decode(&msg.name));
    for node in sanitize::render(&msg.text) {
        match node {
            Node::Text(t) => {
                if !t.is_empty() {
                    out.push_str(&format!("  {}\n", t));
                }
            }
            Node::Link(url) => out.push_str(&format!("  -> {}\n", url)),
            Node::Embed { src } => out.push_str(&format!("  [video] {}\n", src)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(name: &str, text: &str) -> Message {
        Message {
            id: "id1".into(),
            name: name.into(),
            text: text.into(),
            ts: 1700000000,
        }
    }

    #[test]
    fn formats_plain_message() {
        let out = format_message(&msg("alice", "hello"));
        assert!(out.contains("alice:"));
        assert!(out.contains("  hello\n"));
        assert!(out.contains("2023-11-14"));
    }

    #[test]
    fn decodes_stored_name_and_text() {
        let out = format_message(&msg("a&amp;b", "x &lt;y&gt;"));
        assert!(out.contains("a&b:"));
        assert!(out.contains("  x <y>\n"));
    }

    #[test]
    fn formats_links_and_videos() {
        let out = format_message(&msg("alice", "see https://example.com/page and more"));
        assert!(out.contains("  -> https://example.com/page\n"));

        let out = format_message(&msg("alice", "check this https://youtu.be/dQw4w9WgXcQ"));
        assert!(out.contains("  check this\n"));
        assert!(out.contains("  [video] https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ\n"));
    }

    #[test]
    fn messages_url_normalizes_trailing_slash() {
        assert_eq!(
            messages_url("http://127.0.0.1:7878/"),
            "http://127.0.0.1:7878/messages"
        );
        assert_eq!(
            messages_url("http://127.0.0.1:7878"),
            "http://127.0.0.1:7878/messages"
        );
    }
}
