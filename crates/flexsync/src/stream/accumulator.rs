//! Multi-packet frame assembly for spectrum and waterfall streams.

use crate::sequence::{Modulus, SequenceCheck, SequenceTracker};
use crate::vita49::Segment;

/// Outcome of pushing one packet's bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// Older than the frame in progress; nothing changed.
    Stale,
    /// Bins stored, frame not yet complete. `lost` frames were skipped to
    /// get here.
    Partial { lost: u32 },
    /// The frame is complete.
    Complete { frame: u32, bins: Vec<u16>, lost: u32 },
}

/// Collects the bins of one frame at a time, keyed by frame index.
///
/// Packets older than the expected frame are dropped without touching any
/// state. A packet for a later frame abandons the partial frame, counts
/// the skipped frames as lost, and starts over at the new index. A frame
/// is returned only when every one of its bins has arrived; a repeated
/// segment overwrites its bins without counting them twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAccumulator {
    tracker: SequenceTracker,
    bins: Vec<u16>,
    filled: Vec<bool>,
    received: u32,
    total: u32,
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAccumulator {
    pub fn new() -> Self {
        FrameAccumulator {
            tracker: SequenceTracker::new(Modulus::Unbounded),
            bins: Vec::new(),
            filled: Vec::new(),
            received: 0,
            total: 0,
        }
    }

    /// The frame index currently being assembled (or next expected).
    pub fn expected_frame(&self) -> Option<u32> {
        self.tracker.expected()
    }

    /// Distinct bins received so far for the frame in progress.
    pub fn received(&self) -> u32 {
        self.received
    }

    /// Store `bins` at `segment.start` of frame `segment.frame`.
    ///
    /// `bins` must hold exactly `segment.count` values; the payload header
    /// parsers guarantee the segment fits within `segment.total`.
    pub fn push(&mut self, segment: Segment, bins: &[u16]) -> Progress {
        let lost = match self.tracker.check(segment.frame) {
            SequenceCheck::Stale => return Progress::Stale,
            SequenceCheck::First => {
                self.begin(segment.total);
                0
            }
            SequenceCheck::Gap { lost } => {
                self.begin(segment.total);
                lost
            }
            SequenceCheck::InOrder => {
                if self.total != segment.total {
                    self.begin(segment.total);
                }
                0
            }
        };

        let start = (segment.start as usize).min(self.bins.len());
        let end = (start + bins.len()).min(self.bins.len());
        self.bins[start..end].copy_from_slice(&bins[..end - start]);
        for filled in &mut self.filled[start..end] {
            if !*filled {
                *filled = true;
                self.received += 1;
            }
        }

        if self.received < self.total {
            return Progress::Partial { lost };
        }

        self.tracker.advance(segment.frame);
        let bins = std::mem::take(&mut self.bins);
        self.filled.clear();
        self.received = 0;
        self.total = 0;
        Progress::Complete {
            frame: segment.frame,
            bins,
            lost,
        }
    }

    /// Drop the frame in progress and all sequence history.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.bins.clear();
        self.filled.clear();
        self.received = 0;
        self.total = 0;
    }

    fn begin(&mut self, total: u32) {
        self.bins.clear();
        self.bins.resize(total as usize, 0);
        self.filled.clear();
        self.filled.resize(total as usize, false);
        self.received = 0;
        self.total = total;
    }
}
