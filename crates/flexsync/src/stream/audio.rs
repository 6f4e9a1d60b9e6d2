//! DAX audio reassembly.
//!
//! Every packet is one block of samples, ordered by the 4-bit VITA packet
//! count. Lost packets are replaced by silent blocks of the same length so
//! playback keeps its timing, up to [`MAX_FILL_BLOCKS`] per gap.

use flexsync_core::Result;

use super::{Accepted, Reassembler, StreamFrame};
use crate::sequence::{Modulus, SequenceCheck, SequenceTracker};
use crate::vita49::{self, AudioSample, VitaPacket};

/// Most silent blocks inserted for a single gap.
pub const MAX_FILL_BLOCKS: u32 = 4;

/// Sample encoding of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Interleaved big-endian float32 left/right.
    Float32Stereo,
    /// Big-endian int16 mono.
    Int16Mono,
}

pub struct AudioReassembler {
    format: AudioFormat,
    tracker: SequenceTracker,
}

impl AudioReassembler {
    pub fn new(format: AudioFormat) -> Self {
        AudioReassembler {
            format,
            tracker: SequenceTracker::new(Modulus::Mod16),
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<Vec<AudioSample>> {
        match self.format {
            AudioFormat::Float32Stereo => vita49::parse_dax_audio_payload(payload),
            AudioFormat::Int16Mono => vita49::parse_reduced_audio_payload(payload),
        }
    }
}

impl Reassembler for AudioReassembler {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted> {
        let samples = self.decode(&packet.payload)?;
        let count = packet.sequence() as u32;

        let lost = match self.tracker.check(count) {
            SequenceCheck::Stale => return Ok(Accepted::stale()),
            SequenceCheck::First | SequenceCheck::InOrder => 0,
            SequenceCheck::Gap { lost } => lost,
        };
        self.tracker.advance(count);

        let silence = AudioSample {
            left: 0.0,
            right: 0.0,
        };
        let mut frames: Vec<StreamFrame> = (0..lost.min(MAX_FILL_BLOCKS))
            .map(|_| StreamFrame::Audio(vec![silence; samples.len()]))
            .collect();
        frames.push(StreamFrame::Audio(samples));

        Ok(Accepted {
            frames,
            lost,
            stale: false,
        })
    }
}
