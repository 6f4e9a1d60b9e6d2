//! Panadapter spectrum reassembly.

use flexsync_core::Result;

use super::{Accepted, FrameAccumulator, PanadapterFrame, Progress, Reassembler, StreamFrame};
use crate::vita49::{self, PayloadLayout, VitaPacket};

pub struct PanadapterReassembler {
    layout: PayloadLayout,
    accumulator: FrameAccumulator,
}

impl PanadapterReassembler {
    pub fn new(layout: PayloadLayout) -> Self {
        PanadapterReassembler {
            layout,
            accumulator: FrameAccumulator::new(),
        }
    }

    pub fn accumulator(&self) -> &FrameAccumulator {
        &self.accumulator
    }
}

impl Reassembler for PanadapterReassembler {
    fn accept(&mut self, packet: &VitaPacket) -> Result<Accepted> {
        let (header, offset) = vita49::parse_panadapter_header(&packet.payload, self.layout)?;
        let segment = header.segment;
        let bins = vita49::read_bins(&packet.payload[offset..], segment.count as usize);

        Ok(match self.accumulator.push(segment, &bins) {
            Progress::Stale => Accepted::stale(),
            Progress::Partial { lost } => Accepted {
                lost,
                ..Accepted::default()
            },
            Progress::Complete { frame, bins, lost } => Accepted {
                frames: vec![StreamFrame::Panadapter(PanadapterFrame { frame, bins })],
                lost,
                stale: false,
            },
        })
    }
}
