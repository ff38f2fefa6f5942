//! MQTT broker configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::bus::MqttSettings;

/// MQTT broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address
    pub host: String,

    /// Broker port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Client identifier presented to the broker
    pub client_id: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<Secret<String>>,

    /// Topic filter the hub publishes machine events on, e.g. `home/laundry/+`
    pub topic: String,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// How long to wait for CONNACK at startup
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Bound of the queue between the bridge and the listener
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl MqttConfig {
    /// Connection settings for the bridge.
    pub fn to_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.host.clone(),
            port: self.port,
            client_id: self.client_id.clone(),
            username: self.username.clone().filter(|u| !u.is_empty()),
            password: self.password.clone(),
            topic: self.topic.clone(),
            keep_alive: Duration::from_secs(self.keep_alive_secs.max(1)),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
        }
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingRequired("MQTT__HOST"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("MQTT__CLIENT_ID"));
        }
        if self.topic.trim().is_empty() {
            return Err(ValidationError::MissingRequired("MQTT__TOPIC"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if !is_valid_filter(&self.topic) {
            return Err(ValidationError::InvalidTopic(self.topic.clone()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.queue_capacity == 0 {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        Ok(())
    }
}

/// `#` must be the last level and wildcards must fill a whole level.
fn is_valid_filter(filter: &str) -> bool {
    let levels: Vec<&str> = filter.split('/').collect();
    levels.iter().enumerate().all(|(i, level)| match *level {
        "#" => i == levels.len() - 1,
        "+" => true,
        other => !other.contains('#') && !other.contains('+'),
    })
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            client_id: String::new(),
            username: None,
            password: None,
            topic: String::new(),
            keep_alive_secs: default_keep_alive(),
            connect_timeout_secs: default_connect_timeout(),
            queue_capacity: default_queue_capacity(),
            reconnect_delay_secs: default_reconnect_delay(),
        }
    }
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    256
}

fn default_reconnect_delay() -> u64 {
    5
}
