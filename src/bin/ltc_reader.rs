//! LTC Reader Application
//!
//! Captures LTC from an input device and prints the synchronized output
//! timecode.
//!
//! Usage: `ltc-reader [--list] [--json] [--config PATH] [DEVICE_ID]`

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ltc_sync::{
    audio::{buffer::create_shared_buffer, capture::AudioCapture, device},
    config::AppConfig,
    sync::{MonotonicClock, SyncEventKind, SystemClock},
    TimecodeReader,
};

/// Status print period
const STATUS_INTERVAL: Duration = Duration::from_millis(250);

/// Audio drain period
const AUDIO_POLL_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Default)]
struct Args {
    list: bool,
    json: bool,
    config: Option<PathBuf>,
    device_id: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--list" => args.list = true,
            "--json" => args.json = true,
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                args.config = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("Unknown option {}", flag),
            _ => args.device_id = Some(arg),
        }
    }

    Ok(args)
}

fn print_devices() {
    println!("\n=== Available Input Devices ===");
    for device in device::list_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}:", device.name, default_marker);
        println!("    ID: {}", device.id);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;
    if args.list {
        print_devices();
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default()?,
    };
    if args.device_id.is_some() {
        config.audio.device_id = args.device_id.clone();
    }
    config.validate()?;

    tracing::info!(
        "Starting LTC reader ({} fps, timeout {:.2}s)",
        config.decoder.frame_rate,
        config.sync.decode_timeout
    );

    let clock: Arc<dyn MonotonicClock> = Arc::new(SystemClock::new());
    let ring = create_shared_buffer(config.audio.ring_buffer_capacity);

    let input = device::open_input(config.audio.device_id.as_deref())?;
    let mut capture = AudioCapture::new(
        &input,
        Some(config.audio.sample_rate),
        config.audio.channel,
        clock.clone(),
        ring.clone(),
    )?;

    let reader = TimecodeReader::new(capture.sample_rate(), &config.decoder, config.sync.clone())
        .into_shared();
    let events = reader.lock().subscribe();

    capture.start(input)?;

    // Audio task: drain captured segments into the decoder
    let audio_reader = reader.clone();
    let audio_ring = ring.clone();
    let audio_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(AUDIO_POLL_INTERVAL);
        loop {
            interval.tick().await;
            for segment in audio_ring.drain() {
                audio_reader.lock().process_audio(&segment.samples, segment.timestamp);
            }
        }
    });

    // Clock task: advance the output clock
    let clock_reader = reader.clone();
    let tick_clock = clock.clone();
    let tick_period = Duration::from_millis(config.sync.tick_interval_ms.max(1));
    let clock_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_period);
        loop {
            interval.tick().await;
            clock_reader.lock().tick(tick_clock.now());
        }
    });

    // Signal transitions arrive on a blocking channel
    std::thread::spawn(move || {
        for event in events.transitions.iter() {
            match event.kind {
                SyncEventKind::Started => tracing::info!("LTC started at {}", event.timecode),
                SyncEventKind::Stopped => tracing::info!("LTC stopped at {}", event.timecode),
                SyncEventKind::Receiving | SyncEventKind::NoSignal => {}
            }
        }
    });

    let mut status_interval = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            _ = status_interval.tick() => {
                let status = reader.lock().status(clock.now());
                if args.json {
                    println!("{}", serde_json::to_string(&status)?);
                } else {
                    println!(
                        "{}  {:<9}  level {:.2}",
                        status.timecode,
                        status.state.to_string(),
                        status.signal_level
                    );
                }

                if let Some(err) = capture.check_errors() {
                    tracing::error!("Capture error: {}", err);
                }
            }
        }
    }

    audio_task.abort();
    clock_task.abort();
    capture.stop();

    let decoder_stats = reader.lock().decoder_stats();
    let engine_stats = reader.lock().engine_stats();
    tracing::info!(
        "Decoded {} frames ({} rejected), {} resyncs, {} drift corrections, {} overflows",
        decoder_stats.frames_decoded,
        decoder_stats.frames_rejected,
        engine_stats.hard_resyncs,
        engine_stats.drift_corrections,
        ring.overflow_count()
    );

    Ok(())
}
