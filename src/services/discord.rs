// src/services/discord.rs

//! Discord REST client.
//!
//! Only the handful of endpoints the bot needs: channel lookup, message
//! creation and guild role membership. The gateway is never opened.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::DiscordConfig;

/// Channel types that accept messages: guild text, DM, voice text chat,
/// announcement and the three thread kinds.
const MESSAGEABLE_CHANNEL_TYPES: [u8; 7] = [0, 1, 2, 5, 10, 11, 12];

/// A resolved, message-capable channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u64,
    pub name: Option<String>,
}

/// Outbound chat capability consumed by the cycles.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Look a channel up; `None` when it does not exist, is not visible to
    /// the bot, or cannot receive messages.
    async fn resolve_channel(&self, id: u64) -> Result<Option<Channel>>;

    /// Post a plain-text message.
    async fn send_message(&self, channel: &Channel, text: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

/// [`ChatClient`] talking to the Discord REST API with a bot token.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
    max_retries: u8,
}

impl DiscordClient {
    /// Build a client from the Discord section of the configuration.
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        let token = config.require_token()?.to_string();
        let client = Client::builder()
            .user_agent(concat!(
                "DiscordBot (https://github.com/newsbell, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token,
            max_retries: config.max_retries,
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub(crate) fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bot {}", self.token))
    }

    /// Send a request, waiting out `429` responses up to `max_retries` times.
    pub(crate) async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u8 = 0;
        loop {
            let response = self.authorized(build()).send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= self.max_retries {
                return Ok(response);
            }

            attempt += 1;
            let wait = response
                .json::<RateLimited>()
                .await
                .map(|r| Duration::from_secs_f64(r.retry_after.clamp(0.0, 60.0)))
                .unwrap_or(Duration::from_secs(1));
            log::debug!("Discord rate limited, retrying in {:?} (attempt {attempt})", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Turn a non-success response into an error carrying Discord's message.
    pub(crate) async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::discord(status.as_u16(), body.trim()))
    }
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn resolve_channel(&self, id: u64) -> Result<Option<Channel>> {
        let url = self.endpoint(&format!("/channels/{id}"));
        let response = self.execute(|| self.client.get(&url)).await?;

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN
        ) {
            log::debug!("Channel {id} is not accessible ({})", response.status());
            return Ok(None);
        }

        let payload: ChannelPayload = Self::check(response).await?.json().await?;
        if !MESSAGEABLE_CHANNEL_TYPES.contains(&payload.kind) {
            log::debug!("Channel {id} has type {} and cannot receive messages", payload.kind);
            return Ok(None);
        }

        Ok(Some(Channel {
            id,
            name: payload.name,
        }))
    }

    async fn send_message(&self, channel: &Channel, text: &str) -> Result<()> {
        let url = self.endpoint(&format!("/channels/{}/messages", channel.id));
        let body = json!({
            "content": text,
            "allowed_mentions": { "parse": ["roles"] },
        });
        let response = self.execute(|| self.client.post(&url).json(&body)).await?;
        Self::check(response).await?;
        Ok(())
    }
}
