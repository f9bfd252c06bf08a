//! Discord channel transport (REST API, bot token)

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode, header};
use serde_json::{Value, json};
use std::time::Duration;

use super::render::AlertMessage;
use super::{AlertTransport, TransportFuture};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord rejects message content over this many characters
const MAX_CONTENT_CHARS: usize = 2000;

/// Discord rejects embed field values over this many characters
const MAX_FIELD_CHARS: usize = 1024;

#[derive(Debug, Clone)]
pub struct DiscordTransport {
    client: Client,
    token: String,
    channel_id: String,
    api_base: String,
}

impl DiscordTransport {
    pub fn new(
        token: impl Into<String>,
        channel_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Discord HTTP client")?;
        Ok(Self {
            client,
            token: token.into(),
            channel_id: channel_id.into(),
            api_base: DISCORD_API_BASE.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn channel_url(&self) -> String {
        format!("{}/channels/{}", self.api_base, self.channel_id)
    }

    /// Confirm the bot can see the alert channel; returns the channel name.
    pub async fn check_channel(&self) -> Result<String> {
        let response = self
            .client
            .get(self.channel_url())
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .send()
            .await
            .context("Failed to reach Discord")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Discord channel lookup failed with {}", status));
        }

        let payload: Value = response
            .json()
            .await
            .context("Failed to parse Discord channel response")?;
        Ok(payload
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed channel")
            .to_string())
    }

    async fn post(&self, body: Value) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/messages", self.channel_url()))
            .header(header::AUTHORIZATION, format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await
            .context("Failed to reach Discord")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let payload: Value = response.json().await.unwrap_or(Value::Null);
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = payload
                .get("retry_after")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            return Err(anyhow!("Discord rate limited; retry after {:.1}s", retry_after));
        }

        let reason = payload
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no error message");
        Err(anyhow!("Discord rejected message with {}: {}", status, reason))
    }
}

impl AlertTransport for DiscordTransport {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn send_text<'a>(&'a self, text: &'a str) -> TransportFuture<'a> {
        Box::pin(async move {
            self.post(json!({ "content": truncate(text, MAX_CONTENT_CHARS) }))
                .await
        })
    }

    fn send_message<'a>(&'a self, message: &'a AlertMessage) -> TransportFuture<'a> {
        Box::pin(async move { self.post(json!({ "embeds": [embed_json(message)] })).await })
    }
}

fn embed_json(message: &AlertMessage) -> Value {
    let fields: Vec<Value> = message
        .fields
        .iter()
        .map(|field| {
            json!({
                "name": field.name,
                "value": truncate(&field.value, MAX_FIELD_CHARS),
                "inline": field.inline,
            })
        })
        .collect();

    let mut embed = json!({
        "title": message.title,
        "color": message.color,
        "fields": fields,
    });
    if !message.description.is_empty() {
        embed["description"] = Value::String(message.description.clone());
    }
    embed
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
