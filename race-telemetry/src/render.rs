//! Render loop coordination
//!
//! The render loop runs on the main thread. It draws a fresh snapshot on every
//! tick, and also right after a merge when redraw-on-update is enabled, so the
//! screen is never more than one tick stale. A quit event ends the loop and
//! raises the shutdown signal, which in turn stops the ingestion thread.

use crate::state::{DashboardSnapshot, SharedDashboard};
use crate::transport::ShutdownSignal;
use crate::types::Result;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::time::{Duration, Instant};

/// Paints a dashboard snapshot
pub trait Renderer {
    fn draw(&mut self, snapshot: &DashboardSnapshot) -> Result<()>;
}

/// Operator input relevant to the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Other,
}

/// Source of operator input events
pub trait InputSource {
    /// Wait up to `timeout` for the next event
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;
}

/// Create the single-slot redraw channel
pub fn redraw_channel() -> (RedrawNotifier, RedrawReceiver) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (RedrawNotifier { sender }, RedrawReceiver { receiver })
}

/// Ingestion side of the redraw channel
#[derive(Debug, Clone)]
pub struct RedrawNotifier {
    sender: SyncSender<()>,
}

impl RedrawNotifier {
    /// Ask for a redraw; coalesces with one already pending
    pub fn notify(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                log::trace!("Redraw requested after render loop exited");
            }
        }
    }
}

/// Render side of the redraw channel
#[derive(Debug)]
pub struct RedrawReceiver {
    receiver: Receiver<()>,
}

impl RedrawReceiver {
    /// True if a redraw was requested since the last call
    pub fn take_pending(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }
}

/// Totals reported when the render loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub frames: u64,
}

pub struct RenderLoop {
    dashboard: SharedDashboard,
    shutdown: ShutdownSignal,
    tick: Duration,
    input_poll: Duration,
    redraw: Option<RedrawReceiver>,
    max_frames: Option<u64>,
}

impl RenderLoop {
    pub fn new(dashboard: SharedDashboard, shutdown: ShutdownSignal) -> Self {
        Self {
            dashboard,
            shutdown,
            tick: Duration::from_secs(1),
            input_poll: Duration::from_millis(50),
            redraw: None,
            max_frames: None,
        }
    }

    /// Builder method: set the periodic redraw interval
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Builder method: set how long one input poll may block
    pub fn with_input_poll(mut self, input_poll: Duration) -> Self {
        self.input_poll = input_poll;
        self
    }

    /// Builder method: also redraw as soon as ingestion merges a datagram
    pub fn with_redraw(mut self, redraw: RedrawReceiver) -> Self {
        self.redraw = Some(redraw);
        self
    }

    /// Builder method: stop after this many frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Draw until quit, then raise the shutdown signal
    ///
    /// The shutdown signal is raised on every exit path, including errors from
    /// the renderer or the input source.
    pub fn run<R, I>(&mut self, renderer: &mut R, input: &mut I) -> Result<RenderReport>
    where
        R: Renderer + ?Sized,
        I: InputSource + ?Sized,
    {
        let result = self.draw_until_quit(renderer, input);
        self.shutdown.close();
        result
    }

    fn draw_until_quit<R, I>(&mut self, renderer: &mut R, input: &mut I) -> Result<RenderReport>
    where
        R: Renderer + ?Sized,
        I: InputSource + ?Sized,
    {
        let mut report = RenderReport::default();

        // First frame goes out immediately so the operator sees the layout.
        renderer.draw(&self.dashboard.snapshot())?;
        report.frames += 1;
        let mut last_draw = Instant::now();

        loop {
            if self.max_frames.is_some_and(|max| report.frames >= max) {
                log::debug!("Frame limit reached");
                break;
            }

            let until_tick = self.tick.saturating_sub(last_draw.elapsed());
            if let Some(InputEvent::Quit) = input.poll(until_tick.min(self.input_poll))? {
                log::info!("Quit requested");
                break;
            }

            let update_pending = self.redraw.as_ref().is_some_and(|r| r.take_pending());
            if update_pending || last_draw.elapsed() >= self.tick {
                renderer.draw(&self.dashboard.snapshot())?;
                report.frames += 1;
                last_draw = Instant::now();
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::types::TelemetryError;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingRenderer {
        frames: Vec<DashboardSnapshot>,
    }

    impl Renderer for RecordingRenderer {
        fn draw(&mut self, snapshot: &DashboardSnapshot) -> Result<()> {
            self.frames.push(snapshot.clone());
            Ok(())
        }
    }

    struct ScriptedInput {
        events: VecDeque<Option<InputEvent>>,
    }

    impl ScriptedInput {
        fn new(events: Vec<Option<InputEvent>>) -> Self {
            Self { events: events.into() }
        }
    }

    impl InputSource for ScriptedInput {
        fn poll(&mut self, _timeout: Duration) -> Result<Option<InputEvent>> {
            Ok(self.events.pop_front().unwrap_or(Some(InputEvent::Quit)))
        }
    }

    #[test]
    fn test_quit_raises_shutdown() {
        let shutdown = ShutdownSignal::new();
        let mut render = RenderLoop::new(SharedDashboard::new(), shutdown.clone())
            .with_tick(Duration::from_secs(3600));
        let mut renderer = RecordingRenderer::default();
        let mut input = ScriptedInput::new(vec![None, Some(InputEvent::Other), Some(InputEvent::Quit)]);

        let report = render.run(&mut renderer, &mut input).unwrap();

        assert_eq!(report.frames, 1);
        assert_eq!(renderer.frames.len(), 1);
        assert!(shutdown.is_closed());
    }

    #[test]
    fn test_redraw_signal_triggers_draw() {
        let dashboard = SharedDashboard::new();
        let (notifier, receiver) = redraw_channel();
        let mut render = RenderLoop::new(dashboard.clone(), ShutdownSignal::new())
            .with_tick(Duration::from_secs(3600))
            .with_redraw(receiver);
        let mut renderer = RecordingRenderer::default();
        let mut input = ScriptedInput::new(vec![None, None]);

        dashboard.merge(&Decoder::new().decode(b"42,90,L7"));
        notifier.notify();
        notifier.notify();

        let report = render.run(&mut renderer, &mut input).unwrap();

        // Initial frame plus one coalesced redraw.
        assert_eq!(report.frames, 2);
        assert_eq!(renderer.frames[1].lanes[0].speed, 42);
        assert_eq!(renderer.frames[1].lanes[0].position, 10);
    }

    #[test]
    fn test_tick_triggers_draw() {
        let mut render = RenderLoop::new(SharedDashboard::new(), ShutdownSignal::new())
            .with_tick(Duration::ZERO)
            .with_max_frames(3);
        let mut renderer = RecordingRenderer::default();
        let mut input = ScriptedInput::new(vec![None; 10]);

        let report = render.run(&mut renderer, &mut input).unwrap();
        assert_eq!(report.frames, 3);
    }

    #[test]
    fn test_renderer_error_still_shuts_down() {
        struct FailingRenderer;

        impl Renderer for FailingRenderer {
            fn draw(&mut self, _snapshot: &DashboardSnapshot) -> Result<()> {
                Err(TelemetryError::Render("terminal gone".to_string()))
            }
        }

        let shutdown = ShutdownSignal::new();
        let mut render = RenderLoop::new(SharedDashboard::new(), shutdown.clone());
        let mut input = ScriptedInput::new(vec![]);

        assert!(render.run(&mut FailingRenderer, &mut input).is_err());
        assert!(shutdown.is_closed());
    }
}
