//! Core types for the race telemetry library
//!
//! This module defines the values the decoder emits for each received datagram
//! and the error types shared by the ingestion and render loops. Decoding itself
//! never fails - malformed input is reported through `DecodeOutcome` instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Number of lanes on the track
pub const LANE_COUNT: usize = 4;

/// Fixed lane identity, addressed by its index in a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Lane {
    /// All lanes in index order
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Red, Lane::Green, Lane::Yellow, Lane::Blue];

    /// Map a segment index to its lane, `None` if no such lane exists
    pub fn from_index(index: usize) -> Option<Lane> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Lane::Red => 0,
            Lane::Green => 1,
            Lane::Yellow => 2,
            Lane::Blue => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Lane::Red => "Red",
            Lane::Green => "Green",
            Lane::Yellow => "Yellow",
            Lane::Blue => "Blue",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded fields for one lane from one datagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSample {
    /// Speed, floored at 0
    pub speed: i64,
    /// Track position in sensor units, as received
    pub raw_position: i64,
    /// Position scaled down to a gauge percentage (not clamped)
    pub position: i64,
    /// Free-form label (lap counter or status), unmodified
    pub label: String,
}

/// A decoded sample tagged with the segment index it came from
///
/// The index may be out of range for the track; the merge step discards those.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneRecord {
    pub lane_index: usize,
    pub sample: LaneSample,
}

impl LaneRecord {
    /// The lane this record addresses, if it exists
    pub fn lane(&self) -> Option<Lane> {
        Lane::from_index(self.lane_index)
    }
}

/// Result of decoding one datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Device housekeeping message, carries no telemetry
    Ignored {
        /// The sentinel token that matched
        sentinel: String,
    },

    /// Telemetry line, possibly with malformed segments dropped
    Telemetry {
        /// The trimmed payload text
        payload: String,
        /// Decoded records in segment order
        records: Vec<LaneRecord>,
        /// Indices of segments dropped for having too few fields
        skipped_segments: Vec<usize>,
    },
}

impl DecodeOutcome {
    pub fn is_ignored(&self) -> bool {
        matches!(self, DecodeOutcome::Ignored { .. })
    }

    /// Decoded records (empty for ignored datagrams)
    pub fn records(&self) -> &[LaneRecord] {
        match self {
            DecodeOutcome::Ignored { .. } => &[],
            DecodeOutcome::Telemetry { records, .. } => records,
        }
    }
}

/// Errors surfaced by the render side and collaborators
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
