//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use chrono::NaiveTime;
use serde::Deserialize;

use super::types::Res;

/// Default title used in the header of every notification.
fn default_event_title() -> String {
    "Rally".to_string()
}

/// Default time of day for a new event.
fn default_event_time() -> String {
    "17:45".to_string()
}

/// Default token that creates an event.
fn default_create_token() -> String {
    "_?_".to_string()
}

/// Default token that asks for the event status.
fn default_status_token() -> String {
    "?".to_string()
}

/// Default prefix that adds the sender to the list.
fn default_add_token() -> String {
    "+1".to_string()
}

/// Default prefix that removes the sender from the list.
fn default_remove_token() -> String {
    "-1".to_string()
}

/// Configuration for the rally-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Configuration values, as loaded from the environment and config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ConfigInner {
    /// Slack app token (`RALLY_BOT_SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`RALLY_BOT_SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// The only channel the bot listens to (`RALLY_BOT_ALLOWED_CHANNEL_ID`).
    pub allowed_channel_id: String,
    /// Title shown in the header of every notification (`RALLY_BOT_EVENT_TITLE`).
    #[serde(default = "default_event_title")]
    pub event_title: String,
    /// Time of day for new events, as `HH:MM` (`RALLY_BOT_DEFAULT_EVENT_TIME`).
    #[serde(default = "default_event_time")]
    pub default_event_time: String,
    /// Message text that creates an event (`RALLY_BOT_CREATE_TOKEN`).
    #[serde(default = "default_create_token")]
    pub create_token: String,
    /// Reply text that asks for the current status (`RALLY_BOT_STATUS_TOKEN`).
    #[serde(default = "default_status_token")]
    pub status_token: String,
    /// Reply prefix that adds the sender (`RALLY_BOT_ADD_TOKEN`).
    #[serde(default = "default_add_token")]
    pub add_token: String,
    /// Reply prefix that removes the sender (`RALLY_BOT_REMOVE_TOKEN`).
    #[serde(default = "default_remove_token")]
    pub remove_token: String,
}

impl Default for ConfigInner {
    fn default() -> Self {
        Self {
            slack_app_token: String::new(),
            slack_bot_token: String::new(),
            allowed_channel_id: String::new(),
            event_title: default_event_title(),
            default_event_time: default_event_time(),
            create_token: default_create_token(),
            status_token: default_status_token(),
            add_token: default_add_token(),
            remove_token: default_remove_token(),
        }
    }
}

impl ConfigInner {
    /// The configured default event time, parsed.
    pub fn default_time(&self) -> Res<NaiveTime> {
        NaiveTime::parse_from_str(self.default_event_time.trim(), "%H:%M")
            .map_err(|e| anyhow::anyhow!("Default event time `{}` is not a valid `HH:MM` time: {}", self.default_event_time, e))
    }
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// Environment variables are prefixed with `RALLY_BOT_`; the file is either `explicit_path`
    /// or `.hidden/config.toml` when present.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("RALLY_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        Self::from_inner(cfg.build()?.try_deserialize()?)
    }

    /// Wraps and validates an already-deserialized configuration.
    pub fn from_inner(inner: ConfigInner) -> Res<Self> {
        let result = Config { inner: Arc::new(inner) };

        if result.allowed_channel_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Allowed channel ID must be set."));
        }

        let tokens = [&result.create_token, &result.status_token, &result.add_token, &result.remove_token].map(|t| t.trim());

        if tokens.iter().any(|t| t.is_empty()) {
            return Err(anyhow::anyhow!("Command tokens must not be empty."));
        }

        for (i, a) in tokens.iter().enumerate() {
            if tokens[i + 1..].contains(a) {
                return Err(anyhow::anyhow!("Command token `{}` is used for more than one command.", a));
            }
        }

        result.default_time()?;

        Ok(result)
    }
}
