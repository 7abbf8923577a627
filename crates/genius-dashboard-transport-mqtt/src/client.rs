//! MQTT client for the robot bridge.

use crate::events::parse_event;
use async_trait::async_trait;
use genius_dashboard_core::{DataValue, Publisher, TopicPath, TransportEvent, TransportFailure};
use genius_dashboard_proto::{CborFrame, FrameKind, PublishFrame, TopicScheme};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

/// Configuration for the bridge transport.
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>)
    pub mqtt_broker: String,
    /// Client ID for MQTT connection
    pub client_id: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Delay before polling again after a connection error
    pub reconnect_delay: Duration,
    /// Topic scheme of the bridge
    pub scheme: TopicScheme,
}

impl Default for MqttTransportConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "tcp://localhost:1883".to_string(),
            client_id: "genius-dashboard".to_string(),
            keep_alive: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            scheme: TopicScheme::default(),
        }
    }
}

/// MQTT transport delivering bridge frames as [`TransportEvent`]s.
pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    connected: Arc<AtomicBool>,
    config: MqttTransportConfig,
}

impl MqttTransport {
    /// Create a new transport. No connection is made until [`MqttTransport::start`].
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn new(config: MqttTransportConfig) -> Result<Self, TransportError> {
        let (host, port) = parse_mqtt_url(&config.mqtt_broker)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok(Self {
            client,
            eventloop,
            connected: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Subscribe to value and announcement frames of the configured team.
    ///
    /// # Errors
    ///
    /// Returns error if subscription fails.
    pub async fn subscribe(&self) -> Result<(), TransportError> {
        for kind in [FrameKind::Announce, FrameKind::Value] {
            let topic = self.config.scheme.wildcard(kind);

            tracing::info!(topic, "Subscribing to bridge topics");

            self.client
                .subscribe(&topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| TransportError::Subscribe(e.to_string()))?;
        }

        Ok(())
    }

    /// Write surface of this transport.
    #[must_use]
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher {
            client: self.client.clone(),
            scheme: self.config.scheme.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    /// Start receiving events.
    ///
    /// Returns a channel receiver for transport events. Frames that fail to
    /// parse are logged and dropped.
    pub fn start(mut self) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            let mut lost_connection = false;
            loop {
                let event = match self.eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let topic = publish.topic.clone();
                        let payload_len = publish.payload.len();

                        tracing::trace!(topic, payload_len, "Received MQTT message");

                        match parse_event(&self.config.scheme, &topic, &publish.payload) {
                            Ok(event) => Some(event),
                            Err(err) => {
                                tracing::warn!(
                                    error = %err,
                                    topic = %topic,
                                    payload_len,
                                    "Failed to parse bridge frame"
                                );
                                None
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!(broker = %self.config.mqtt_broker, "Connected to MQTT broker");
                        if lost_connection {
                            self.resubscribe();
                            lost_connection = false;
                        }
                        self.connected.store(true, Ordering::SeqCst);
                        Some(TransportEvent::Connectivity(true))
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::info!("Subscription acknowledged");
                        None
                    }
                    Ok(_) => None,
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        lost_connection = true;
                        let was_connected = self.connected.swap(false, Ordering::SeqCst);
                        if was_connected && tx.send(TransportEvent::Connectivity(false)).await.is_err() {
                            break;
                        }
                        // Try to reconnect after a delay
                        tokio::time::sleep(self.config.reconnect_delay).await;
                        None
                    }
                };

                if let Some(event) = event {
                    if tx.send(event).await.is_err() {
                        tracing::warn!("Event receiver dropped, stopping transport");
                        break;
                    }
                }
            }
        });

        rx
    }

    // Subscriptions do not survive a clean-session reconnect.
    fn resubscribe(&self) {
        for kind in [FrameKind::Announce, FrameKind::Value] {
            let topic = self.config.scheme.wildcard(kind);
            if let Err(e) = self.client.try_subscribe(&topic, QoS::AtLeastOnce) {
                tracing::warn!(topic, error = %e, "Failed to resubscribe");
            }
        }
    }
}

/// Publishes dashboard writes to the bridge.
///
/// A write succeeds once the client has queued the packet while connected.
/// The broker's acknowledgement is not awaited, so a confirmed optimistic
/// write can still be lost if the connection drops before delivery.
#[derive(Debug, Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
    scheme: TopicScheme,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish_value(&self, path: &TopicPath, value: &DataValue) -> Result<(), TransportFailure> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportFailure::new("not connected to MQTT broker"));
        }

        let topic = self.scheme.publish(path);
        let payload = PublishFrame::new(value.clone())
            .to_cbor()
            .map_err(|e| TransportFailure::new(e.to_string()))?;

        tracing::debug!(topic, payload_len = payload.len(), "Publishing value");

        self.client
            .publish(&topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| TransportFailure::new(e.to_string()))
    }
}

/// Parse MQTT URL into host and port.
fn parse_mqtt_url(input: &str) -> Result<(String, u16), TransportError> {
    if input.contains("://") {
        let url =
            Url::parse(input).map_err(|e| TransportError::InvalidUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(TransportError::InvalidUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TransportError::InvalidUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port
            .parse()
            .map_err(|_| TransportError::InvalidUrl(format!("{input}: invalid port '{port}'")))?,
    };
    if parts.next().is_some() {
        return Err(TransportError::InvalidUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors that can occur with the transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Invalid MQTT URL
    #[error("invalid MQTT URL: {0}")]
    InvalidUrl(String),
    /// Subscription failed
    #[error("subscription error: {0}")]
    Subscribe(String),
}
