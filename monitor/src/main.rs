// flexsync monitor -- connect to a FlexRadio, mirror its object model, and
// print lifecycle events and stream statistics until interrupted.
//
// Usage:
//   flexsync-monitor --host 192.168.1.100
//   flexsync-monitor --host 192.168.1.100 --firmware 1.4.0.0 --spectrum
//   flexsync-monitor --host 192.168.1.100 --dax-rx 1 --stats-interval 2
//   RUST_LOG=flexsync=debug flexsync-monitor --host 192.168.1.100 --no-udp

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{broadcast, mpsc};

use flexsync::codec;
use flexsync::{
    FirmwareVersion, ObjectId, ObjectKind, PayloadLayout, RadioEvent, Session, SessionBuilder,
    StreamFrame, StreamKind,
};

/// Mirror a FlexRadio's object model and watch its streams.
#[derive(Parser)]
#[command(name = "flexsync-monitor", version, about)]
struct Cli {
    /// Radio IP address or hostname.
    #[arg(long)]
    host: String,

    /// SmartSDR TCP command port.
    #[arg(long, default_value_t = flexsync::builder::DEFAULT_TCP_PORT)]
    tcp_port: u16,

    /// Local VITA-49 UDP port. 0 picks any free port.
    #[arg(long, default_value_t = flexsync::builder::DEFAULT_UDP_PORT)]
    udp_port: u16,

    /// Do not receive UDP streams; only mirror status.
    #[arg(long)]
    no_udp: bool,

    /// Radio firmware version (e.g. 3.3.32.8203), used to pick the
    /// spectrum payload layout. Defaults to the current layout.
    #[arg(long)]
    firmware: Option<String>,

    /// Client program name registered with the radio.
    #[arg(long, default_value = "flexsync-monitor")]
    client_name: String,

    /// Attach a lane to every panadapter and waterfall the radio reports.
    #[arg(long)]
    spectrum: bool,

    /// Create a DAX RX audio stream on this channel.
    #[arg(long)]
    dax_rx: Option<u8>,

    /// Seconds between stream statistics reports.
    #[arg(long, default_value_t = 5)]
    stats_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = SessionBuilder::new()
        .host(&cli.host)
        .tcp_port(cli.tcp_port)
        .client_name(&cli.client_name);
    builder = if cli.no_udp {
        builder.without_udp()
    } else {
        builder.udp_port(cli.udp_port)
    };
    if let Some(text) = &cli.firmware {
        let firmware = FirmwareVersion::parse(text)
            .with_context(|| format!("invalid firmware version: {text}"))?;
        builder = builder.firmware(&firmware);
    }
    let layout = builder.options().layout;

    let session = Arc::new(
        builder
            .build()
            .await
            .with_context(|| format!("failed to connect to {}:{}", cli.host, cli.tcp_port))?,
    );
    println!(
        "Connected: protocol {}, handle 0x{:08X}, {} payload layout",
        session.version(),
        session.handle(),
        match layout {
            PayloadLayout::Current => "current",
            PayloadLayout::Legacy => "legacy",
        }
    );

    let mut events = session.subscribe();
    let mut lanes: HashSet<u32> = HashSet::new();

    if let Some(channel) = cli.dax_rx {
        let (stream_id, frames) = session
            .create_stream(&codec::cmd_stream_create_dax_rx(channel))
            .await
            .with_context(|| format!("failed to create DAX RX stream on channel {channel}"))?;
        println!("DAX RX channel {channel}: stream 0x{stream_id:08X}");
        lanes.insert(stream_id);
        tokio::spawn(drain_frames(stream_id, frames));
    }

    let mut stats_timer = tokio::time::interval(Duration::from_secs(cli.stats_interval.max(1)));
    stats_timer.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted, disconnecting");
                break;
            }
            _ = stats_timer.tick() => print_stats(&session, &lanes),
            event = events.recv() => match event {
                Ok(RadioEvent::Disconnected) => {
                    println!("Radio disconnected");
                    return Ok(());
                }
                Ok(event) => {
                    if cli.spectrum {
                        attach_spectrum(&session, &event, &mut lanes);
                    }
                    if let RadioEvent::ObjectRemoved(object) = &event {
                        if let ObjectId::Handle(handle) = object.id {
                            lanes.remove(&handle);
                        }
                    }
                    print_event(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event consumer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    session.disconnect().await.context("disconnect failed")?;
    Ok(())
}

fn print_event(event: &RadioEvent) {
    match event {
        RadioEvent::ObjectAdded(object) => println!("+ {object}"),
        RadioEvent::ObjectWillBeRemoved(_) => {}
        RadioEvent::ObjectRemoved(object) => println!("- {object}"),
        RadioEvent::PropertyChanged { object, token } => println!("  {object} {token}"),
        RadioEvent::MeterUpdated { .. } => {}
        RadioEvent::StreamLoss { stream_id, lost } => {
            println!("! stream 0x{stream_id:08X} lost {lost}");
        }
        RadioEvent::Message { severity, text } => println!("[{severity}] {text}"),
        RadioEvent::Connected => println!("Connected"),
        RadioEvent::Disconnected => println!("Disconnected"),
    }
}

/// Open a lane for a newly added panadapter or waterfall.
fn attach_spectrum(session: &Session, event: &RadioEvent, lanes: &mut HashSet<u32>) {
    let RadioEvent::ObjectAdded(object) = event else {
        return;
    };
    let kind = match object.kind {
        ObjectKind::Panadapter => StreamKind::Panadapter,
        ObjectKind::Waterfall => StreamKind::Waterfall,
        _ => return,
    };
    let ObjectId::Handle(stream_id) = object.id else {
        return;
    };
    if lanes.insert(stream_id) {
        let frames = session.attach_stream(stream_id, kind);
        tokio::spawn(drain_frames(stream_id, frames));
    }
}

fn print_stats(session: &Session, lanes: &HashSet<u32>) {
    let mut ids: Vec<u32> = lanes.iter().copied().collect();
    ids.sort_unstable();
    for id in ids {
        let Some(stats) = session.stream_stats(id) else {
            continue;
        };
        println!(
            "stream 0x{id:08X}: delivered={} lost={} dropped={} stale={} malformed={}",
            stats.frames_delivered,
            stats.frames_lost,
            stats.frames_dropped,
            stats.stale_packets,
            stats.malformed_packets,
        );
    }
}

/// Consume frames so the lane never backs up; log a summary of each.
async fn drain_frames(stream_id: u32, mut frames: mpsc::Receiver<StreamFrame>) {
    let stream_id = format!("0x{stream_id:08X}");
    while let Some(frame) = frames.recv().await {
        match frame {
            StreamFrame::Panadapter(frame) => {
                tracing::trace!(
                    stream_id = %stream_id,
                    frame = frame.frame,
                    bins = frame.bins.len(),
                    "Panadapter frame"
                );
            }
            StreamFrame::Waterfall(line) => {
                tracing::trace!(
                    stream_id = %stream_id,
                    timecode = line.timecode,
                    bins = line.bins.len(),
                    "Waterfall line"
                );
            }
            StreamFrame::Audio(samples) => {
                tracing::trace!(stream_id = %stream_id, samples = samples.len(), "Audio block");
            }
            StreamFrame::Iq { rate, samples } => {
                tracing::trace!(stream_id = %stream_id, rate, samples = samples.len(), "IQ block");
            }
            StreamFrame::Opus(packet) => {
                tracing::trace!(stream_id = %stream_id, bytes = packet.len(), "Opus packet");
            }
            StreamFrame::Lost => {
                tracing::trace!(stream_id = %stream_id, "Opus packet lost");
            }
        }
    }
    tracing::debug!(stream_id = %stream_id, "Stream lane closed");
}
