use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://slack.com/api";

/// Channel identity as configured. `id` addresses the Slack API; `name`
/// only appears in logs and digest text.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
}

// --- Wire types (provider-owned, never mutated) ---

#[derive(Debug, Clone, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    /// Fractional-second timestamp; doubles as the message identifier.
    /// Absent in some provider payloads, normalized to "".
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub reactions: Option<Vec<Reaction>>,
    #[serde(default)]
    pub files: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    error: Option<String>,
    messages: Option<Vec<RawMessage>>,
}

#[derive(Debug, Deserialize)]
struct PermalinkResponse {
    ok: bool,
    error: Option<String>,
    permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

// --- ChatService trait ---

/// The three chat-service capabilities the digest pipeline consumes.
/// `fetch_history` bounds are inclusive Unix seconds, both formatted as
/// decimal strings the way the API expects them.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn fetch_history(
        &self,
        channel_id: &str,
        oldest: &str,
        latest: &str,
    ) -> Result<Vec<RawMessage>>;

    /// May resolve to an empty string; callers treat that as a miss.
    async fn resolve_permalink(&self, channel_id: &str, message_ts: &str) -> Result<String>;

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()>;
}

// --- Slack Web API client ---

pub struct SlackClient {
    client: Client,
    base_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn fetch_history(
        &self,
        channel_id: &str,
        oldest: &str,
        latest: &str,
    ) -> Result<Vec<RawMessage>> {
        let url = format!("{}/conversations.history", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("channel", channel_id),
                ("oldest", oldest),
                ("latest", latest),
            ])
            .send()
            .await
            .context("Failed to call conversations.history")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("conversations.history returned HTTP {}", status);
        }

        let body: HistoryResponse = response
            .json()
            .await
            .context("Failed to parse conversations.history response")?;

        if !body.ok {
            anyhow::bail!(
                "Failed to fetch chat history: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(body.messages.unwrap_or_default())
    }

    async fn resolve_permalink(&self, channel_id: &str, message_ts: &str) -> Result<String> {
        let url = format!("{}/chat.getPermalink", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("channel", channel_id), ("message_ts", message_ts)])
            .send()
            .await
            .context("Failed to call chat.getPermalink")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("chat.getPermalink returned HTTP {}", status);
        }

        let body: PermalinkResponse = response
            .json()
            .await
            .context("Failed to parse chat.getPermalink response")?;

        if !body.ok {
            anyhow::bail!(
                "Failed to get permalink: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(body.permalink.unwrap_or_default())
    }

    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "channel": channel_id, "text": text }))
            .send()
            .await
            .context("Failed to call chat.postMessage")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("chat.postMessage returned HTTP {}", status);
        }

        let body: PostMessageResponse = response
            .json()
            .await
            .context("Failed to parse chat.postMessage response")?;

        if !body.ok {
            anyhow::bail!(
                "Failed to post message: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(())
    }
}
