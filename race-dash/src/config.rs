//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use race_telemetry::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Where datagrams come from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    Udp(UdpConfig),
    Mqtt(MqttConfig),
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Udp(UdpConfig::default())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UdpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    #[serde(default = "default_broker_host")]
    pub broker_host: String,
    #[serde(default = "default_broker_port")]
    pub broker_port: u16,
    #[serde(default = "default_topic")]
    pub topic: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: default_broker_host(),
            broker_port: default_broker_port(),
            topic: default_topic(),
            client_id: default_client_id(),
            username: None,
            password: None,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    #[serde(default = "default_tick")]
    pub tick_ms: u64,
    #[serde(default = "default_true")]
    pub redraw_on_update: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick(),
            redraw_on_update: true,
        }
    }
}

impl DashboardConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_poll_interval() -> u64 {
    200
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "track".to_string()
}

fn default_client_id() -> String {
    "race-dash".to_string()
}

fn default_tick() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config.validate()?;
    Ok(config)
}

impl AppConfig {
    /// Reject settings the loops cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.tick_ms == 0 {
            bail!("dashboard.tick_ms must be greater than zero");
        }
        self.decoder
            .validate()
            .context("Invalid [decoder] section")?;
        if let TransportConfig::Mqtt(mqtt) = &self.transport {
            if mqtt.topic.is_empty() {
                bail!("transport.topic must not be empty");
            }
        }
        Ok(())
    }

    /// Switch to a UDP listener on `bind`
    pub fn use_udp(&mut self, bind: &str) {
        let poll_interval_ms = self.poll_interval_ms();
        self.transport = TransportConfig::Udp(UdpConfig {
            bind: bind.to_string(),
            poll_interval_ms,
        });
    }

    /// Switch to an MQTT subscription on `broker` (`host` or `host:port`)
    pub fn use_mqtt(&mut self, broker: &str) -> Result<()> {
        let mut mqtt = match &self.transport {
            TransportConfig::Mqtt(existing) => existing.clone(),
            TransportConfig::Udp(udp) => MqttConfig {
                poll_interval_ms: udp.poll_interval_ms,
                ..MqttConfig::default()
            },
        };

        match broker.rsplit_once(':') {
            Some((host, port)) => {
                mqtt.broker_host = host.to_string();
                mqtt.broker_port = port
                    .parse()
                    .with_context(|| format!("Invalid broker port in {:?}", broker))?;
            }
            None => mqtt.broker_host = broker.to_string(),
        }

        self.transport = TransportConfig::Mqtt(mqtt);
        Ok(())
    }

    /// Override the MQTT topic; fails for UDP
    pub fn set_topic(&mut self, topic: &str) -> Result<()> {
        match &mut self.transport {
            TransportConfig::Mqtt(mqtt) => {
                mqtt.topic = topic.to_string();
                Ok(())
            }
            TransportConfig::Udp(_) => bail!("--topic requires an MQTT transport"),
        }
    }

    fn poll_interval_ms(&self) -> u64 {
        match &self.transport {
            TransportConfig::Udp(udp) => udp.poll_interval_ms,
            TransportConfig::Mqtt(mqtt) => mqtt.poll_interval_ms,
        }
    }
}
