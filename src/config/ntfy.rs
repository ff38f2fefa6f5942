//! ntfy notification configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;
use crate::adapters::notify::{NtfyConfig, DEFAULT_SERVER};
use crate::application::handlers::cycle::{NotificationSettings, DEFAULT_MESSAGE};
use crate::domain::user::sanitize_topic_segment;

/// ntfy notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NtfySection {
    /// Server base URL
    #[serde(default = "default_server")]
    pub server: String,

    /// Prefix of every per-user topic; topics are `<base_topic>-<name>`
    pub base_topic: String,

    /// Bearer token for protected servers
    #[serde(default)]
    pub access_token: Option<Secret<String>>,

    /// Notification body
    #[serde(default = "default_message")]
    pub message: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Log and record notifications instead of publishing them
    #[serde(default)]
    pub dry_run: bool,
}

impl NtfySection {
    /// Transport settings for `NtfyNotifier`.
    pub fn to_transport(&self) -> NtfyConfig {
        let config = NtfyConfig::default()
            .with_server_url(&self.server)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.access_token {
            Some(token) => config.with_access_token(token.clone()),
            None => config,
        }
    }

    /// Topic and message settings for the dispatcher.
    pub fn to_notification_settings(&self) -> NotificationSettings {
        NotificationSettings::new(self.base_topic.trim()).with_message(self.message.clone())
    }

    /// Validate notification configuration
    ///
    /// In production, requires HTTPS for the server URL.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let base = self.base_topic.trim();
        if base.is_empty() {
            return Err(ValidationError::MissingRequired("NTFY__BASE_TOPIC"));
        }
        if sanitize_topic_segment(base) != base {
            return Err(ValidationError::InvalidTopic(self.base_topic.clone()));
        }
        if !self.server.starts_with("https://") && !self.server.starts_with("http://") {
            return Err(ValidationError::InvalidServerUrl);
        }
        if *environment == Environment::Production && !self.server.starts_with("https://") {
            return Err(ValidationError::ServerMustBeHttps);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for NtfySection {
    fn default() -> Self {
        Self {
            server: default_server(),
            base_topic: String::new(),
            access_token: None,
            message: default_message(),
            timeout_secs: default_timeout(),
            dry_run: false,
        }
    }
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

fn default_timeout() -> u64 {
    10
}
