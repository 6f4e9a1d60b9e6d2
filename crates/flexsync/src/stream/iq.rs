//! DAX IQ reassembly.
//!
//! Packets are delivered as they arrive; gaps in the packet count are only
//! counted, since there is no meaningful fill for IQ data.

use flexsync_core::Result;

use super::{Accepted, Reassembler, StreamFrame};
use crate::sequence::{Modulus, SequenceCheck, SequenceTracker};
use crate::vita49::{self, StreamType, VitaPacket};

pub struct IqReassembler {
    tracker: SequenceTracker,
}

impl Default for IqReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl IqReassembler {
    pub fn new() -> Self {
        IqReassembler {
            tracker: SequenceTracker::new(Modulus::Mod16),
        }
    }
}

impl Reassembler for IqReassembler {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted> {
        let samples = vita49::parse_iq_payload(&packet.payload)?;
        let rate = match packet.header.stream_type {
            StreamType::DaxIq(rate) => rate,
            _ => 0,
        };
        let count = packet.sequence() as u32;

        let lost = match self.tracker.check(count) {
            SequenceCheck::Stale => return Ok(Accepted::stale()),
            SequenceCheck::First | SequenceCheck::InOrder => 0,
            SequenceCheck::Gap { lost } => lost,
        };
        self.tracker.advance(count);

        Ok(Accepted {
            frames: vec![StreamFrame::Iq { rate, samples }],
            lost,
            stale: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use flexsync_test_harness::vita;

    use crate::vita49::IqSample;

    fn iq(count: u8, samples: &[f32]) -> VitaPacket {
        let payload = vita::f32_payload(samples);
        let pkt = vita::packet(vita::CLASS_DAX_IQ_48K, 0x2000_0001, count, &payload);
        vita49::parse_packet(Bytes::from(pkt)).unwrap()
    }

    #[test]
    fn delivers_with_rate() {
        let mut r = IqReassembler::new();
        let a = r.accept(&iq(0, &[0.25, -0.75])).unwrap();
        assert_eq!(
            a.frames,
            vec![StreamFrame::Iq {
                rate: 48_000,
                samples: vec![IqSample { i: 0.25, q: -0.75 }],
            }]
        );
    }

    #[test]
    fn gap_counted_without_fill() {
        let mut r = IqReassembler::new();
        r.accept(&iq(15, &[0.0, 0.0])).unwrap();
        let a = r.accept(&iq(2, &[1.0, 1.0])).unwrap();
        assert_eq!(a.lost, 2);
        assert_eq!(a.frames.len(), 1);
    }

    #[test]
    fn odd_payload_rejected() {
        let mut r = IqReassembler::new();
        let pkt = vita::packet(vita::CLASS_DAX_IQ_24K, 0x2000_0001, 0, &[0u8; 12]);
        let packet = vita49::parse_packet(Bytes::from(pkt)).unwrap();
        assert!(r.accept(&packet).is_err());
    }
}
