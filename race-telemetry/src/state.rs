//! Dashboard state and merge
//!
//! `DashboardState` is the single model of what the screen should show. The
//! ingestion loop is its only writer and the render loop its only reader; both
//! go through `SharedDashboard`, which applies each datagram and takes each
//! snapshot inside one critical section.

use crate::types::{DecodeOutcome, LaneSample, LANE_COUNT};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Last accepted values for one lane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneState {
    pub speed: i64,
    pub raw_position: i64,
    pub position: i64,
    pub label: String,
}

impl Default for LaneState {
    fn default() -> Self {
        Self {
            speed: 0,
            raw_position: 0,
            position: 0,
            label: "0".to_string(),
        }
    }
}

impl LaneState {
    fn update(&mut self, sample: &LaneSample) {
        self.speed = sample.speed;
        self.raw_position = sample.raw_position;
        self.position = sample.position;
        self.label.clone_from(&sample.label);
    }
}

/// Ingestion counters shown in the dashboard footer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Datagrams decoded, sentinels included
    pub datagrams: u64,
    pub sentinels: u64,
    /// Segments dropped for having too few fields
    pub skipped_segments: u64,
    /// Records addressing a lane that does not exist
    pub discarded_records: u64,
    pub transport_errors: u64,
}

/// The authoritative live view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub lanes: [LaneState; LANE_COUNT],
    pub diagnostic: String,
    pub stats: IngestStats,
    pub last_update: Option<DateTime<Utc>>,
}

/// Owned copy of the state handed to renderers
pub type DashboardSnapshot = DashboardState;

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            lanes: Default::default(),
            diagnostic: String::new(),
            stats: IngestStats::default(),
            last_update: None,
        }
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded datagram
    ///
    /// Sentinels only touch the diagnostic line. Telemetry overwrites the lanes
    /// it addresses; lanes it does not mention keep their previous values, and
    /// records past the last lane are counted and dropped.
    pub fn apply(&mut self, outcome: &DecodeOutcome) {
        self.stats.datagrams += 1;

        match outcome {
            DecodeOutcome::Ignored { sentinel } => {
                self.stats.sentinels += 1;
                self.diagnostic = format!("ignored: {}", sentinel);
            }
            DecodeOutcome::Telemetry {
                payload,
                records,
                skipped_segments,
            } => {
                self.diagnostic.clone_from(payload);
                self.stats.skipped_segments += skipped_segments.len() as u64;

                for record in records {
                    match self.lanes.get_mut(record.lane_index) {
                        Some(lane) => lane.update(&record.sample),
                        None => {
                            log::trace!("Discarding record for lane {}", record.lane_index);
                            self.stats.discarded_records += 1;
                        }
                    }
                }

                self.last_update = Some(Utc::now());
            }
        }
    }

    pub fn record_transport_error(&mut self) {
        self.stats.transport_errors += 1;
    }
}

/// Thread-safe handle to the dashboard state
///
/// Cloning the handle shares the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedDashboard {
    inner: Arc<Mutex<DashboardState>>,
}

impl SharedDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one datagram as a single critical section
    pub fn merge(&self, outcome: &DecodeOutcome) {
        self.lock().apply(outcome);
    }

    pub fn record_transport_error(&self) {
        self.lock().record_transport_error();
    }

    /// Consistent copy of the current state
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.lock().clone()
    }

    // Every mutation leaves the state structurally valid, so a panic on the
    // other side of the lock does not make it unusable.
    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
