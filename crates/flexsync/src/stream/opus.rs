//! Opus remote-audio passthrough.
//!
//! Packets stay compressed. A gap produces a single [`StreamFrame::Lost`]
//! ahead of the next packet so the decoder can run its loss concealment.

use flexsync_core::Result;

use super::{Accepted, Reassembler, StreamFrame};
use crate::sequence::{Modulus, SequenceCheck, SequenceTracker};
use crate::vita49::VitaPacket;

pub struct OpusReassembler {
    tracker: SequenceTracker,
}

impl Default for OpusReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl OpusReassembler {
    pub fn new() -> Self {
        OpusReassembler {
            tracker: SequenceTracker::new(Modulus::Mod16),
        }
    }
}

impl Reassembler for OpusReassembler {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted> {
        let count = packet.sequence() as u32;
        let lost = match self.tracker.check(count) {
            SequenceCheck::Stale => return Ok(Accepted::stale()),
            SequenceCheck::First | SequenceCheck::InOrder => 0,
            SequenceCheck::Gap { lost } => lost,
        };
        self.tracker.advance(count);

        let mut frames = Vec::with_capacity(2);
        if lost > 0 {
            frames.push(StreamFrame::Lost);
        }
        frames.push(StreamFrame::Opus(packet.payload.clone()));
        Ok(Accepted {
            frames,
            lost,
            stale: false,
        })
    }
}
