//! LED Race Telemetry Library
//!
//! Ingestion and state synchronization for a four-lane race track dashboard.
//!
//! # Architecture
//!
//! - `Decoder` turns one datagram into per-lane samples (pure, no I/O)
//! - `SharedDashboard` holds the live state; each datagram is merged and each
//!   snapshot is taken inside a single critical section
//! - `IngestLoop` pulls datagrams from a `Transport` on its own thread
//! - `RenderLoop` hands snapshots to a `Renderer` on the main thread until an
//!   `InputSource` reports quit
//!
//! The library does NOT open sockets, talk to brokers or paint terminals.
//! Those collaborators live in the application layer (race-dash).
//!
//! # Example Usage
//!
//! ```no_run
//! use race_telemetry::{
//!     redraw_channel, Decoder, IngestLoop, RenderLoop, SharedDashboard, ShutdownSignal,
//! };
//! # use race_telemetry::{InputSource, Renderer, Transport};
//! # fn wire<T: Transport + 'static>(transport: T, renderer: &mut dyn Renderer, input: &mut dyn InputSource) -> race_telemetry::Result<()> {
//!
//! let dashboard = SharedDashboard::new();
//! let shutdown = ShutdownSignal::new();
//! let (notifier, receiver) = redraw_channel();
//!
//! let ingest = IngestLoop::new(transport, Decoder::new(), dashboard.clone())
//!     .with_redraw(notifier)
//!     .spawn()?;
//!
//! RenderLoop::new(dashboard, shutdown)
//!     .with_redraw(receiver)
//!     .run(renderer, input)?;
//!
//! let _ = ingest.join();
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod ingest;
pub mod render;
pub mod state;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use ingest::{IngestLoop, IngestReport};
pub use render::{
    redraw_channel, InputEvent, InputSource, RedrawNotifier, RedrawReceiver, RenderLoop,
    RenderReport, Renderer,
};
pub use state::{DashboardSnapshot, DashboardState, IngestStats, LaneState, SharedDashboard};
pub use transport::{ShutdownSignal, Transport, TransportError};
pub use types::{
    DecodeOutcome, Lane, LaneRecord, LaneSample, Result, TelemetryError, LANE_COUNT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a fresh dashboard shows four idle lanes
        let snapshot = SharedDashboard::new().snapshot();
        assert_eq!(snapshot.lanes.len(), LANE_COUNT);
        assert_eq!(snapshot.stats, IngestStats::default());
    }
}
