use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};

use crate::config::{ChannelKind, NotifierConfig};
use crate::error::DeliveryError;

/// Delivers a plain-text message to one channel.
pub trait Notifier {
    fn send(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Where a webhook message goes, with the credential it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Slack { webhook_url: String },
    Discord { webhook_url: String },
    Telegram { token: String, chat_id: String },
}

impl Channel {
    pub fn from_config(config: &NotifierConfig) -> Result<Self, DeliveryError> {
        match config.kind {
            ChannelKind::Slack => config
                .resolved_webhook_url()
                .map(|webhook_url| Channel::Slack { webhook_url })
                .ok_or_else(|| DeliveryError::NotConfigured("SLACK_WEBHOOK_URL is not set".into())),
            ChannelKind::Discord => config
                .resolved_webhook_url()
                .map(|webhook_url| Channel::Discord { webhook_url })
                .ok_or_else(|| DeliveryError::NotConfigured("DISCORD_WEBHOOK_URL is not set".into())),
            ChannelKind::Telegram => config
                .resolved_telegram()
                .map(|(token, chat_id)| Channel::Telegram { token, chat_id })
                .ok_or_else(|| {
                    DeliveryError::NotConfigured(
                        "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must both be set".into(),
                    )
                }),
        }
    }
}

/// Webhook notifier. The credential is fixed at construction.
pub struct WebhookNotifier {
    client: Client,
    channel: Channel,
    username: String,
}

impl WebhookNotifier {
    pub fn new(channel: Channel, username: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(transport_err)?;
        Ok(Self { client, channel, username: username.into() })
    }

    pub fn from_config(config: &NotifierConfig) -> Result<Self, DeliveryError> {
        Self::new(Channel::from_config(config)?, config.username.clone())
    }

    fn request(&self, text: &str) -> RequestBuilder {
        match &self.channel {
            Channel::Slack { webhook_url } => self
                .client
                .post(webhook_url)
                .json(&slack_payload(text, &self.username)),
            Channel::Discord { webhook_url } => self
                .client
                .post(webhook_url)
                .json(&discord_payload(text, &self.username)),
            Channel::Telegram { token, chat_id } => self
                .client
                .post(format!("https://api.telegram.org/bot{}/sendMessage", token))
                .form(&[("chat_id", chat_id.as_str()), ("text", text)]),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, message: &str) -> Result<(), DeliveryError> {
        if message.trim().is_empty() {
            return Err(DeliveryError::EmptyMessage);
        }

        let resp = self.request(message).send().map_err(transport_err)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(DeliveryError::Rejected { status: status.as_u16(), body });
        }

        log::info!("Notification delivered ({} bytes)", message.len());
        Ok(())
    }
}

/// Drops the request URL from the error so webhook secrets and bot tokens
/// never reach the logs.
fn transport_err(e: reqwest::Error) -> DeliveryError {
    DeliveryError::Transport(e.without_url())
}

fn slack_payload(text: &str, username: &str) -> Value {
    json!({ "text": text, "username": username })
}

fn discord_payload(text: &str, username: &str) -> Value {
    json!({ "content": text, "username": username })
}
