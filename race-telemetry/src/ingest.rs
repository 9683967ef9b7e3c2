//! Ingestion loop
//!
//! Waits on the transport, decodes each datagram, merges it into the shared
//! dashboard and asks for a redraw. Receive is the only blocking point; decode
//! and merge are bounded and never retry. Transport errors other than `Closed`
//! are counted and logged, then the loop goes back to waiting.

use crate::decoder::Decoder;
use crate::render::RedrawNotifier;
use crate::state::SharedDashboard;
use crate::transport::{Transport, TransportError};
use std::io;
use std::thread::{self, JoinHandle};

/// Totals reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub datagrams: u64,
    pub transport_errors: u64,
}

pub struct IngestLoop<T: Transport> {
    transport: T,
    decoder: Decoder,
    dashboard: SharedDashboard,
    redraw: Option<RedrawNotifier>,
}

impl<T: Transport> IngestLoop<T> {
    pub fn new(transport: T, decoder: Decoder, dashboard: SharedDashboard) -> Self {
        Self {
            transport,
            decoder,
            dashboard,
            redraw: None,
        }
    }

    /// Builder method: request a redraw after every merged datagram
    pub fn with_redraw(mut self, redraw: RedrawNotifier) -> Self {
        self.redraw = Some(redraw);
        self
    }

    /// Run until the transport reports `Closed`
    pub fn run(mut self) -> IngestReport {
        let mut report = IngestReport::default();
        log::info!("Ingestion loop started");

        loop {
            match self.transport.receive() {
                Ok(payload) => {
                    let outcome = self.decoder.decode(&payload);
                    self.dashboard.merge(&outcome);
                    report.datagrams += 1;

                    if let Some(redraw) = &self.redraw {
                        redraw.notify();
                    }
                }
                Err(TransportError::TimedOut) => continue,
                Err(TransportError::Closed) => break,
                Err(e) => {
                    log::warn!("Receive failed, waiting for next datagram: {}", e);
                    self.dashboard.record_transport_error();
                    report.transport_errors += 1;
                }
            }
        }

        self.transport.close();
        log::info!(
            "Ingestion loop stopped after {} datagrams ({} transport errors)",
            report.datagrams,
            report.transport_errors
        );
        report
    }
}

impl<T: Transport + 'static> IngestLoop<T> {
    /// Run the loop on a dedicated thread
    pub fn spawn(self) -> io::Result<JoinHandle<IngestReport>> {
        thread::Builder::new()
            .name("ingest".to_string())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::redraw_channel;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct ScriptedTransport {
        script: VecDeque<Result<Vec<u8>, TransportError>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<Vec<u8>, TransportError>>) -> (Self, Arc<AtomicBool>) {
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                script: script.into(),
                closed: closed.clone(),
            };
            (transport, closed)
        }
    }

    impl Transport for ScriptedTransport {
        fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
            self.script.pop_front().unwrap_or(Err(TransportError::Closed))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let (transport, closed) = ScriptedTransport::new(vec![
            Ok(b"1,9,A".to_vec()),
            Err(TransportError::Io(io::Error::new(io::ErrorKind::Other, "boom"))),
            Err(TransportError::TimedOut),
            Err(TransportError::Broker("reconnecting".to_string())),
            Ok(b"2,18,B|3,27,C".to_vec()),
        ]);
        let dashboard = SharedDashboard::new();

        let report = IngestLoop::new(transport, Decoder::new(), dashboard.clone()).run();

        assert_eq!(report.datagrams, 2);
        assert_eq!(report.transport_errors, 2);
        assert!(closed.load(Ordering::SeqCst));

        let snapshot = dashboard.snapshot();
        assert_eq!(snapshot.lanes[0].speed, 2);
        assert_eq!(snapshot.lanes[1].label, "C");
        assert_eq!(snapshot.stats.transport_errors, 2);
        assert_eq!(snapshot.diagnostic, "2,18,B|3,27,C");
    }

    #[test]
    fn test_merge_requests_redraw() {
        let (transport, _) = ScriptedTransport::new(vec![Ok(b"boot".to_vec())]);
        let (notifier, receiver) = redraw_channel();

        IngestLoop::new(transport, Decoder::new(), SharedDashboard::new())
            .with_redraw(notifier)
            .run();

        assert!(receiver.take_pending());
        assert!(!receiver.take_pending());
    }
}
