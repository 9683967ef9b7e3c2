//! Headless output: one JSON document per frame

use race_telemetry::{DashboardSnapshot, InputEvent, InputSource, Renderer, TelemetryError};
use std::io::Write;
use std::thread;
use std::time::Duration;

/// Writes each snapshot as a JSON line
pub struct JsonRenderer<W: Write> {
    out: W,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn draw(&mut self, snapshot: &DashboardSnapshot) -> race_telemetry::Result<()> {
        serde_json::to_writer(&mut self.out, snapshot)
            .map_err(|e| TelemetryError::Render(e.to_string()))?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Input source for headless runs; never reports quit
pub struct NoInput;

impl InputSource for NoInput {
    fn poll(&mut self, timeout: Duration) -> race_telemetry::Result<Option<InputEvent>> {
        thread::sleep(timeout);
        Ok(None)
    }
}
