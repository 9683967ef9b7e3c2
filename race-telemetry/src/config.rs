//! Decoder configuration types
//!
//! The wire protocol has two tunable knobs: the divisor that maps sensor
//! position units onto a gauge percentage, and the set of housekeeping tokens
//! that senders emit instead of telemetry.

use crate::types::{Result, TelemetryError};
use serde::{Deserialize, Serialize};

/// Configuration for the datagram decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Raw position is divided by this to get the gauge percentage
    #[serde(default = "default_position_divisor")]
    pub position_divisor: i64,

    /// Payloads equal to one of these (after trimming) carry no telemetry
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,
}

fn default_position_divisor() -> i64 {
    9
}

fn default_sentinels() -> Vec<String> {
    vec!["none".to_string(), "boot".to_string(), "AT+C".to_string()]
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            position_divisor: default_position_divisor(),
            sentinels: default_sentinels(),
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the position divisor
    pub fn with_position_divisor(mut self, divisor: i64) -> Self {
        self.position_divisor = divisor;
        self
    }

    /// Builder method: add a sentinel token
    pub fn add_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinels.push(sentinel.into());
        self
    }

    /// Reject settings the decoder cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.position_divisor <= 0 {
            return Err(TelemetryError::InvalidConfig(format!(
                "position_divisor must be positive, got {}",
                self.position_divisor
            )));
        }
        Ok(())
    }

    /// Divisor actually applied; non-positive values mean 1
    pub fn effective_divisor(&self) -> i64 {
        if self.position_divisor <= 0 {
            1
        } else {
            self.position_divisor
        }
    }

    /// Check if a trimmed payload is a housekeeping sentinel
    pub fn is_sentinel(&self, payload: &str) -> bool {
        self.sentinels.iter().any(|s| s == payload)
    }
}
