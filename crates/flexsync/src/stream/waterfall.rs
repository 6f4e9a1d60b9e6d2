//! Waterfall line reassembly.
//!
//! The line timecode is the frame index. Line metadata is taken from the
//! packet that completes the line.

use flexsync_core::Result;

use super::{Accepted, FrameAccumulator, Progress, Reassembler, StreamFrame, WaterfallFrame};
use crate::vita49::{self, PayloadLayout, VitaPacket};

pub struct WaterfallReassembler {
    layout: PayloadLayout,
    accumulator: FrameAccumulator,
}

impl WaterfallReassembler {
    pub fn new(layout: PayloadLayout) -> Self {
        WaterfallReassembler {
            layout,
            accumulator: FrameAccumulator::new(),
        }
    }
}

impl Reassembler for WaterfallReassembler {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted> {
        let (header, offset) = vita49::parse_waterfall_header(&packet.payload, self.layout)?;
        let bins = vita49::read_bins(&packet.payload[offset..], header.segment.count as usize);

        Ok(match self.accumulator.push(header.segment, &bins) {
            Progress::Stale => Accepted::stale(),
            Progress::Partial { lost } => Accepted {
                lost,
                ..Accepted::default()
            },
            Progress::Complete { frame, bins, lost } => Accepted {
                frames: vec![StreamFrame::Waterfall(WaterfallFrame {
                    timecode: frame,
                    first_bin_hz: header.first_bin_hz,
                    bin_bandwidth_hz: header.bin_bandwidth_hz,
                    line_duration_ms: header.line_duration_ms,
                    height: header.height,
                    auto_black: header.auto_black,
                    bins,
                })],
                lost,
                stale: false,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use flexsync_test_harness::vita::{self, WaterfallLine};

    fn packet(payload: Vec<u8>) -> VitaPacket {
        vita49::parse_packet(Bytes::from(vita::packet(
            vita::CLASS_WATERFALL,
            0x4200_0000,
            0,
            &payload,
        )))
        .unwrap()
    }

    fn line(timecode: u32) -> WaterfallLine {
        WaterfallLine {
            timecode,
            ..WaterfallLine::default()
        }
    }

    #[test]
    fn line_spanning_two_packets() {
        let mut r = WaterfallReassembler::new(PayloadLayout::Current);
        let a = r
            .accept(&packet(vita::waterfall_payload(&line(100), 0, &[1, 2, 3], 5)))
            .unwrap();
        assert!(a.frames.is_empty());

        let a = r
            .accept(&packet(vita::waterfall_payload(&line(100), 3, &[4, 5], 5)))
            .unwrap();
        match &a.frames[..] {
            [StreamFrame::Waterfall(w)] => {
                assert_eq!(w.timecode, 100);
                assert_eq!(w.bins, vec![1, 2, 3, 4, 5]);
                assert_eq!(w.first_bin_hz, 14_000_000.0);
                assert_eq!(w.bin_bandwidth_hz, 100.0);
                assert_eq!(w.line_duration_ms, 100);
            }
            other => panic!("unexpected frames {other:?}"),
        }
    }

    #[test]
    fn skipped_timecodes_counted() {
        let mut r = WaterfallReassembler::new(PayloadLayout::Legacy);
        r.accept(&packet(vita::waterfall_payload_legacy(&line(7), &[1]))).unwrap();
        let a = r
            .accept(&packet(vita::waterfall_payload_legacy(&line(10), &[2])))
            .unwrap();
        assert_eq!(a.lost, 2);
        assert_eq!(a.frames.len(), 1);

        let a = r
            .accept(&packet(vita::waterfall_payload_legacy(&line(9), &[3])))
            .unwrap();
        assert!(a.stale);
    }

    #[test]
    fn short_header_rejected() {
        let mut r = WaterfallReassembler::new(PayloadLayout::Current);
        let mut payload = vita::waterfall_payload(&line(1), 0, &[1], 1);
        payload.truncate(32);
        assert!(r.accept(&packet(payload)).is_err());
    }
}
