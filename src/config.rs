//! Runtime configuration.
//!
//! Loaded from `<root>/config.yml`; any field left out falls back to the
//! defaults below. Webhook credentials are read from the environment unless
//! the file sets them explicitly.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Tracked state, relative to the root directory.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Where to keep a copy of the last sent message, if anywhere.
    #[serde(default)]
    pub message_file: Option<PathBuf>,

    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub fetcher: FetcherConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Visited once when a session opens, before any series page.
    #[serde(default = "default_home_url")]
    pub home_url: Option<String>,

    /// Series listing page; `{}` is replaced with the series id.
    #[serde(default = "default_series_url_template")]
    pub series_url_template: String,

    /// Text every chapter link contains.
    #[serde(default = "default_chapter_marker")]
    pub chapter_marker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetcherKind {
    Http,
    Browser,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    #[serde(default = "default_fetcher_kind")]
    pub kind: FetcherKind,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Slack,
    Discord,
    Telegram,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    #[serde(default = "default_channel_kind")]
    pub kind: ChannelKind,

    #[serde(default = "default_username")]
    pub username: String,

    /// Slack or Discord webhook. Falls back to `SLACK_WEBHOOK_URL` /
    /// `DISCORD_WEBHOOK_URL`.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Falls back to `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub telegram_token: Option<String>,

    /// Falls back to `TELEGRAM_CHAT_ID`.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

fn default_state_file() -> PathBuf { PathBuf::from("data/comic.json") }
fn default_home_url() -> Option<String> { Some("https://www.cartoonmad.com/".to_string()) }
fn default_series_url_template() -> String { "https://www.cartoonmad.com/comic/{}.html".to_string() }
fn default_chapter_marker() -> String { "第".to_string() }
fn default_fetcher_kind() -> FetcherKind { FetcherKind::Http }
fn default_webdriver_url() -> String { "http://localhost:9515".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String { "Mozilla/5.0 (compatible; ComicNotifier/1.0)".to_string() }
fn default_channel_kind() -> ChannelKind { ChannelKind::Slack }
fn default_username() -> String { "Comic_Elf".to_string() }

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            series_url_template: default_series_url_template(),
            chapter_marker: default_chapter_marker(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            kind: default_fetcher_kind(),
            webdriver_url: default_webdriver_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            kind: default_channel_kind(),
            username: default_username(),
            webhook_url: None,
            telegram_token: None,
            telegram_chat_id: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            message_file: None,
            site: SiteConfig::default(),
            fetcher: FetcherConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.yml` under `root`, or the defaults when it doesn't exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_yaml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config YAML {:?}", path))?
        } else {
            log::debug!("No config at {:?}, using defaults", path);
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.site.series_url_template.contains("{}") {
            bail!(
                "series_url_template {:?} has no {{}} placeholder for the series id",
                self.site.series_url_template
            );
        }
        if self.site.chapter_marker.trim().is_empty() {
            bail!("chapter_marker must not be empty");
        }
        Ok(())
    }

    /// State file path resolved against `root`.
    pub fn state_path(&self, root: &Path) -> PathBuf {
        root.join(&self.state_file)
    }

    pub fn message_path(&self, root: &Path) -> Option<PathBuf> {
        self.message_file.as_ref().map(|p| root.join(p))
    }
}

impl SiteConfig {
    pub fn series_url(&self, series_id: &str) -> String {
        self.series_url_template.replace("{}", series_id)
    }
}

impl NotifierConfig {
    pub fn resolved_webhook_url(&self) -> Option<String> {
        let var = match self.kind {
            ChannelKind::Slack => "SLACK_WEBHOOK_URL",
            ChannelKind::Discord => "DISCORD_WEBHOOK_URL",
            ChannelKind::Telegram => return None,
        };
        self.webhook_url.clone().or_else(|| env::var(var).ok())
    }

    pub fn resolved_telegram(&self) -> Option<(String, String)> {
        let token = self.telegram_token.clone().or_else(|| env::var("TELEGRAM_BOT_TOKEN").ok())?;
        let chat_id = self.telegram_chat_id.clone().or_else(|| env::var("TELEGRAM_CHAT_ID").ok())?;
        Some((token, chat_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cartoonmad() {
        let config = Config::default();
        assert_eq!(config.site.series_url("123"), "https://www.cartoonmad.com/comic/123.html");
        assert_eq!(config.site.chapter_marker, "第");
        assert_eq!(config.notifier.username, "Comic_Elf");
        assert_eq!(config.fetcher.kind, FetcherKind::Http);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "fetcher:\n  kind: browser\nnotifier:\n  kind: discord\n  webhook_url: https://example.com/hook\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.fetcher.kind, FetcherKind::Browser);
        assert_eq!(config.fetcher.webdriver_url, "http://localhost:9515");
        assert_eq!(config.notifier.kind, ChannelKind::Discord);
        assert_eq!(
            config.notifier.resolved_webhook_url().as_deref(),
            Some("https://example.com/hook")
        );
        assert_eq!(config.state_file, PathBuf::from("data/comic.json"));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let mut config = Config::default();
        config.site.series_url_template = "https://example.com/comic.html".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.state_path(dir.path()), dir.path().join("data/comic.json"));
        assert!(config.message_path(dir.path()).is_none());
    }
}
