//! Concrete datagram transports
//!
//! Both transports wait at most one poll interval per `receive` so they notice
//! the shutdown signal promptly; an expired wait is reported as `TimedOut` and
//! the ingestion loop simply calls again.

use crate::config::{MqttConfig, TransportConfig, UdpConfig};
use anyhow::{bail, Context, Result};
use race_telemetry::{ShutdownSignal, Transport, TransportError};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS, RecvTimeoutError};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::thread;
use std::time::Duration;

/// Largest payload a UDP datagram over IPv4 can carry
const DATAGRAM_BUFFER_SIZE: usize = 65507;

/// Open the transport described by the configuration
pub fn open(config: &TransportConfig, shutdown: ShutdownSignal) -> Result<Box<dyn Transport>> {
    match config {
        TransportConfig::Udp(udp) => Ok(Box::new(UdpTransport::bind(udp, shutdown)?)),
        TransportConfig::Mqtt(mqtt) => Ok(Box::new(MqttTransport::connect(mqtt, shutdown)?)),
    }
}

fn poll_interval(ms: u64) -> Duration {
    // A zero read timeout is rejected by the socket API.
    Duration::from_millis(ms.max(1))
}

/// Listens for lane datagrams on a UDP socket
pub struct UdpTransport {
    socket: UdpSocket,
    buffer: Vec<u8>,
    shutdown: ShutdownSignal,
}

impl UdpTransport {
    pub fn bind(config: &UdpConfig, shutdown: ShutdownSignal) -> Result<Self> {
        let socket = UdpSocket::bind(&config.bind)
            .with_context(|| format!("Failed to bind UDP socket on {}", config.bind))?;
        socket
            .set_read_timeout(Some(poll_interval(config.poll_interval_ms)))
            .context("Failed to set UDP read timeout")?;

        log::info!("Listening for telemetry on udp://{}", socket.local_addr()?);

        Ok(Self {
            socket,
            buffer: vec![0u8; DATAGRAM_BUFFER_SIZE],
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl Transport for UdpTransport {
    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        if self.shutdown.is_closed() {
            return Err(TransportError::Closed);
        }

        match self.socket.recv_from(&mut self.buffer) {
            Ok((len, peer)) => {
                log::trace!("Received {} bytes from {}", len, peer);
                if len == self.buffer.len() {
                    log::warn!("Datagram from {} may have been truncated at {} bytes", peer, len);
                }
                Ok(self.buffer[..len].to_vec())
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Err(TransportError::TimedOut)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        log::debug!("Closing UDP transport");
    }
}

/// Subscribes to the track topic on an MQTT broker
///
/// Every publish on the topic is one datagram in the same wire format as UDP.
/// The subscription is (re)issued on every connection acknowledgement that does
/// not resume a broker-side session, so it survives reconnects.
pub struct MqttTransport {
    client: Client,
    connection: Connection,
    topic: String,
    poll_interval: Duration,
    shutdown: ShutdownSignal,
}

impl MqttTransport {
    pub fn connect(config: &MqttConfig, shutdown: ShutdownSignal) -> Result<Self> {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(true);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            options.set_credentials(user.clone(), pass.clone());
        }

        if config.topic.is_empty() {
            bail!("MQTT topic must not be empty");
        }

        let (client, connection) = Client::new(options, 10);

        log::info!(
            "Connecting to mqtt://{}:{}/{}",
            config.broker_host,
            config.broker_port,
            config.topic
        );

        Ok(Self {
            client,
            connection,
            topic: config.topic.clone(),
            poll_interval: poll_interval(config.poll_interval_ms),
            shutdown,
        })
    }

    fn subscribe(&mut self) {
        match self.client.try_subscribe(self.topic.clone(), QoS::AtMostOnce) {
            Ok(()) => log::info!("Subscribed to {}", self.topic),
            Err(e) => log::warn!("Failed to subscribe to {}: {}", self.topic, e),
        }
    }
}

/// A fresh session has no subscriptions, so every such ConnAck needs one
fn needs_subscribe(event: &Event) -> bool {
    matches!(event, Event::Incoming(Packet::ConnAck(ack)) if !ack.session_present)
}

impl Transport for MqttTransport {
    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            if self.shutdown.is_closed() {
                return Err(TransportError::Closed);
            }

            match self.connection.recv_timeout(self.poll_interval) {
                Ok(Ok(Event::Incoming(Packet::Publish(publish)))) => {
                    log::trace!("Received {} bytes on {}", publish.payload.len(), publish.topic);
                    return Ok(publish.payload.to_vec());
                }
                Ok(Ok(event)) if needs_subscribe(&event) => {
                    log::info!("Connected to broker");
                    self.subscribe();
                }
                Ok(Ok(Event::Incoming(Packet::ConnAck(_)))) => {
                    log::info!("Resumed broker session");
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    // The event loop reconnects on the next poll; pace the retries.
                    thread::sleep(self.poll_interval);
                    return Err(TransportError::Broker(e.to_string()));
                }
                Err(RecvTimeoutError::Timeout) => return Err(TransportError::TimedOut),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }

    fn close(&mut self) {
        log::debug!("Disconnecting from broker");
        if let Err(e) = self.client.disconnect() {
            log::debug!("Broker disconnect failed: {}", e);
        }
    }
}
