//! MQTT bridge - subscribes to the hub's topics and feeds the signal queue.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::queue::BusMessage;

/// Outstanding requests buffered between the client handle and the event loop.
const CLIENT_CAPACITY: usize = 10;

/// Broker connection failures.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to connect to MQTT broker {address}: {reason}")]
    Connect { address: String, reason: String },

    #[error("MQTT broker refused connection: {0}")]
    Refused(String),

    #[error("no CONNACK from MQTT broker within {0:?}")]
    Timeout(Duration),

    #[error("failed to subscribe to '{topic}': {reason}")]
    Subscribe { topic: String, reason: String },
}

/// Connection parameters for the broker.
#[derive(Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    /// Topic filter, e.g. `home/laundry/+`.
    pub topic: String,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl MqttSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some(username) = &self.username {
            let password = self
                .password
                .as_ref()
                .map(|p| p.expose_secret().clone())
                .unwrap_or_default();
            options.set_credentials(username, password);
        }
        options
    }
}

impl std::fmt::Debug for MqttSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("topic", &self.topic)
            .finish()
    }
}

/// Live broker session forwarding publishes into the signal queue.
pub struct MqttBridge {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    reconnect_delay: Duration,
    sender: mpsc::Sender<BusMessage>,
}

impl MqttBridge {
    /// Connects, waits for CONNACK and subscribes at QoS 0.
    ///
    /// # Errors
    ///
    /// Any failure here is a boot failure: broker unreachable, connection
    /// refused, no CONNACK in time, or subscribe rejected.
    pub async fn connect(
        settings: &MqttSettings,
        sender: mpsc::Sender<BusMessage>,
    ) -> Result<Self, BusError> {
        let (client, mut eventloop) = AsyncClient::new(settings.options(), CLIENT_CAPACITY);

        tokio::time::timeout(settings.connect_timeout, wait_for_connack(&mut eventloop))
            .await
            .map_err(|_| BusError::Timeout(settings.connect_timeout))?
            .map_err(|err| match err {
                ConnectionError::ConnectionRefused(code) => {
                    BusError::Refused(format!("{:?}", code))
                }
                other => BusError::Connect {
                    address: settings.address(),
                    reason: other.to_string(),
                },
            })?;

        client
            .subscribe(&settings.topic, QoS::AtMostOnce)
            .await
            .map_err(|e| BusError::Subscribe {
                topic: settings.topic.clone(),
                reason: e.to_string(),
            })?;

        info!(
            address = %settings.address(),
            client_id = %settings.client_id,
            topic = %settings.topic,
            "Connected to MQTT broker"
        );

        Ok(Self {
            client,
            eventloop,
            topic: settings.topic.clone(),
            reconnect_delay: settings.reconnect_delay,
            sender,
        })
    }

    /// Polls the broker until shutdown or until the queue is closed.
    ///
    /// Connection errors are logged and polling resumes after the
    /// reconnect delay; the client reconnects on the next poll.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }

                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let message = BusMessage::from_bytes(publish.topic, &publish.payload);
                        debug!(topic = %message.topic, "Received bus message");
                        if self.sender.send(message).await.is_err() {
                            warn!("Signal queue closed, stopping MQTT bridge");
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!(topic = %self.topic, "Reconnected to MQTT broker, resubscribing");
                        if let Err(err) = self.client.subscribe(&self.topic, QoS::AtMostOnce).await {
                            warn!(topic = %self.topic, error = %err, "Resubscribe failed");
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "MQTT connection error");
                        tokio::time::sleep(self.reconnect_delay).await;
                    }
                },
            }
        }

        if let Err(err) = self.client.try_disconnect() {
            debug!(error = %err, "MQTT disconnect request not delivered");
        }
        info!("MQTT bridge stopped");
    }
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        if let Event::Incoming(Packet::ConnAck(ack)) = eventloop.poll().await? {
            if ack.code == ConnectReturnCode::Success {
                return Ok(());
            }
            return Err(ConnectionError::ConnectionRefused(ack.code));
        }
    }
}
