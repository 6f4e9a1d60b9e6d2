//! Stream reassembly.
//!
//! Each open VITA-49 stream id gets a [`Reassembler`] matched to its
//! [`StreamKind`]. Reassemblers are plain state machines: they take one
//! packet at a time and report completed frames, lost frames, and stale
//! packets. The [`StreamDemuxer`] owns one per lane and turns those reports
//! into statistics, [`RadioEvent::StreamLoss`](flexsync_core::RadioEvent)
//! events, and frames on the consumer's channel.

pub mod accumulator;
pub mod audio;
pub mod demux;
pub mod iq;
pub mod opus;
pub mod panadapter;
pub mod waterfall;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use flexsync_core::Result;

use crate::vita49::{AudioSample, IqSample, PayloadLayout, StreamType, VitaPacket};

pub use accumulator::{FrameAccumulator, Progress};
pub use demux::StreamDemuxer;

/// The kind of data a stream lane carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Panadapter,
    Waterfall,
    /// DAX audio, float32 stereo.
    DaxAudio,
    /// Reduced-bandwidth DAX audio, int16 mono.
    DaxAudioReduced,
    DaxIq,
    /// Opus-compressed remote audio.
    Opus,
}

impl StreamKind {
    /// The lane kind for a packet class. Meter, discovery and unknown
    /// classes have no lane.
    pub fn from_stream_type(stream_type: StreamType) -> Option<Self> {
        match stream_type {
            StreamType::Panadapter => Some(StreamKind::Panadapter),
            StreamType::Waterfall => Some(StreamKind::Waterfall),
            StreamType::DaxAudio => Some(StreamKind::DaxAudio),
            StreamType::DaxAudioReduced => Some(StreamKind::DaxAudioReduced),
            StreamType::DaxIq(_) => Some(StreamKind::DaxIq),
            StreamType::OpusAudio => Some(StreamKind::Opus),
            StreamType::MeterData | StreamType::Discovery | StreamType::Unknown(_) => None,
        }
    }

    /// A fresh reassembler for this kind.
    pub fn reassembler(&self, layout: PayloadLayout) -> Box<dyn Reassembler> {
        match self {
            StreamKind::Panadapter => Box::new(panadapter::PanadapterReassembler::new(layout)),
            StreamKind::Waterfall => Box::new(waterfall::WaterfallReassembler::new(layout)),
            StreamKind::DaxAudio => {
                Box::new(audio::AudioReassembler::new(audio::AudioFormat::Float32Stereo))
            }
            StreamKind::DaxAudioReduced => {
                Box::new(audio::AudioReassembler::new(audio::AudioFormat::Int16Mono))
            }
            StreamKind::DaxIq => Box::new(iq::IqReassembler::new()),
            StreamKind::Opus => Box::new(opus::OpusReassembler::new()),
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamKind::Panadapter => "panadapter",
            StreamKind::Waterfall => "waterfall",
            StreamKind::DaxAudio => "dax_audio",
            StreamKind::DaxAudioReduced => "dax_audio_reduced",
            StreamKind::DaxIq => "dax_iq",
            StreamKind::Opus => "opus",
        };
        f.write_str(name)
    }
}

/// One complete spectrum line.
#[derive(Debug, Clone, PartialEq)]
pub struct PanadapterFrame {
    pub frame: u32,
    pub bins: Vec<u16>,
}

/// One complete waterfall line.
#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallFrame {
    pub timecode: u32,
    pub first_bin_hz: f64,
    pub bin_bandwidth_hz: f64,
    pub line_duration_ms: u32,
    pub height: u16,
    pub auto_black: u32,
    pub bins: Vec<u16>,
}

/// A unit of reassembled stream data handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Panadapter(PanadapterFrame),
    Waterfall(WaterfallFrame),
    /// Audio samples. Zero-filled blocks stand in for lost packets.
    Audio(Vec<AudioSample>),
    Iq { rate: u32, samples: Vec<IqSample> },
    /// One Opus packet, still compressed.
    Opus(Bytes),
    /// An Opus packet went missing; decoders should conceal it.
    Lost,
}

/// What one packet produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accepted {
    pub frames: Vec<StreamFrame>,
    /// Frames or packets skipped before this one.
    pub lost: u32,
    /// The packet was older than expected and dropped.
    pub stale: bool,
}

impl Accepted {
    fn stale() -> Self {
        Accepted {
            stale: true,
            ..Accepted::default()
        }
    }
}

/// Per-stream packet-to-frame state machine.
///
/// A malformed packet returns an error and must leave the state untouched.
pub trait Reassembler: Send {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted>;
}

/// Snapshot of one lane's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_delivered: u64,
    pub frames_lost: u64,
    /// Frames dropped because the consumer's channel was full.
    pub frames_dropped: u64,
    pub stale_packets: u64,
    pub malformed_packets: u64,
}

/// Live counters shared between a lane task and the session.
#[derive(Debug, Default)]
pub(crate) struct LaneStats {
    frames_delivered: AtomicU64,
    frames_lost: AtomicU64,
    frames_dropped: AtomicU64,
    stale_packets: AtomicU64,
    malformed_packets: AtomicU64,
}

impl LaneStats {
    pub(crate) fn delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn lost(&self, n: u32) {
        self.frames_lost.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stale(&self) {
        self.stale_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn malformed(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StreamStats {
        StreamStats {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_lost: self.frames_lost.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            stale_packets: self.stale_packets.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_from_class() {
        assert_eq!(
            StreamKind::from_stream_type(StreamType::DaxIq(48_000)),
            Some(StreamKind::DaxIq)
        );
        assert_eq!(
            StreamKind::from_stream_type(StreamType::OpusAudio),
            Some(StreamKind::Opus)
        );
        assert_eq!(StreamKind::from_stream_type(StreamType::MeterData), None);
        assert_eq!(StreamKind::from_stream_type(StreamType::Unknown(0x1234)), None);
    }

    #[test]
    fn stats_snapshot() {
        let stats = LaneStats::default();
        stats.delivered();
        stats.delivered();
        stats.lost(3);
        stats.stale();
        assert_eq!(
            stats.snapshot(),
            StreamStats {
                frames_delivered: 2,
                frames_lost: 3,
                stale_packets: 1,
                ..StreamStats::default()
            }
        );
    }
}
