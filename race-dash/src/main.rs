//! LED Race Dashboard
//!
//! Ground-station application for the four-lane track. It uses the
//! race-telemetry library and adds:
//! - UDP and MQTT transports
//! - A terminal dashboard (bar chart, lane table, gauges)
//! - A headless JSON-lines mode
//! - TOML configuration and logging setup

use anyhow::{Context, Result};
use clap::Parser;
use race_telemetry::{
    redraw_channel, Decoder, IngestLoop, InputSource, RenderLoop, Renderer, SharedDashboard,
    ShutdownSignal,
};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod json;
mod transport;
mod tui;

use config::AppConfig;

/// LED Race Dashboard - live lane telemetry in the terminal
#[derive(Parser, Debug)]
#[command(name = "race-dash")]
#[command(about = "Live telemetry dashboard for a four-lane LED race track", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen for UDP datagrams on this address (overrides config)
    #[arg(long, value_name = "ADDR", conflicts_with = "mqtt")]
    udp: Option<String>,

    /// Subscribe to an MQTT broker at HOST[:PORT] (overrides config)
    #[arg(long, value_name = "BROKER")]
    mqtt: Option<String>,

    /// MQTT topic carrying the track telemetry
    #[arg(long, value_name = "TOPIC")]
    topic: Option<String>,

    /// Redraw interval in milliseconds
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Print one JSON snapshot per frame instead of drawing the dashboard
    #[arg(long)]
    json: bool,

    /// Stop after drawing this many frames
    #[arg(long, value_name = "COUNT")]
    frames: Option<u64>,

    /// Write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    log::info!("LED Race Dashboard v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using telemetry library v{}", race_telemetry::VERSION);

    let config = resolve_config(&args)?;
    log::debug!("Effective configuration: {:?}", config);

    if args.json {
        let mut renderer = json::JsonRenderer::new(io::stdout());
        run_dashboard(&config, &args, &mut renderer, &mut json::NoInput)
    } else {
        let mut renderer =
            tui::TerminalRenderer::new().context("Failed to set up the terminal")?;
        run_dashboard(&config, &args, &mut renderer, &mut tui::KeyboardInput)
    }
}

/// Load the config file (if any) and apply command line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(bind) = &args.udp {
        config.use_udp(bind);
    }
    if let Some(broker) = &args.mqtt {
        config.use_mqtt(broker)?;
    }
    if let Some(topic) = &args.topic {
        config.set_topic(topic)?;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.dashboard.tick_ms = tick_ms;
    }

    config.validate()?;
    Ok(config)
}

/// Wire transport, ingestion thread and render loop, then run until quit
fn run_dashboard<R, I>(config: &AppConfig, args: &Args, renderer: &mut R, input: &mut I) -> Result<()>
where
    R: Renderer,
    I: InputSource,
{
    let dashboard = SharedDashboard::new();
    let shutdown = ShutdownSignal::new();
    let (notifier, receiver) = redraw_channel();

    let transport = transport::open(&config.transport, shutdown.clone())?;

    let mut ingest = IngestLoop::new(
        transport,
        Decoder::with_config(config.decoder.clone()),
        dashboard.clone(),
    );
    if config.dashboard.redraw_on_update {
        ingest = ingest.with_redraw(notifier);
    }
    let ingest_handle = ingest.spawn().context("Failed to start ingestion thread")?;

    let mut render = RenderLoop::new(dashboard, shutdown)
        .with_tick(config.dashboard.tick())
        .with_input_poll(Duration::from_millis(50));
    if config.dashboard.redraw_on_update {
        render = render.with_redraw(receiver);
    }
    if let Some(frames) = args.frames {
        render = render.with_max_frames(frames);
    }

    let rendered = render.run(renderer, input);

    // The render loop has raised the shutdown signal; the transport notices
    // it within one poll interval.
    match ingest_handle.join() {
        Ok(report) => log::info!(
            "Received {} datagrams ({} transport errors)",
            report.datagrams,
            report.transport_errors
        ),
        Err(_) => log::error!("Ingestion thread panicked"),
    }

    let report = rendered.context("Dashboard rendering failed")?;
    log::info!("Drew {} frames", report.frames);
    Ok(())
}

/// Initialize logging based on verbosity level and output mode
///
/// The terminal dashboard owns the screen, so in that mode logs only go to
/// `--log-file`; without one they are switched off.
fn init_logging(args: &Args) -> Result<()> {
    use env_logger::{Builder, Target};
    use log::LevelFilter;
    use std::io::Write;

    let mut level = if args.quiet {
        LevelFilter::Error
    } else {
        match args.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = Builder::new();

    match &args.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            builder.target(Target::Pipe(Box::new(file)));
        }
        None if !args.json => level = LevelFilter::Off,
        None => {
            builder.target(Target::Stderr);
        }
    }

    builder
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    Ok(())
}
