//! Datagram fan-out to per-stream lanes.
//!
//! [`StreamDemuxer::dispatch`] decodes the VITA-49 header of each datagram
//! and forwards it to the lane registered for its stream id. Every lane is
//! its own task, so packets of one stream are handled strictly in arrival
//! order while different streams proceed independently. Meter packets are
//! decoded inline.
//!
//! Closing a lane cancels its task before anything else happens; a frame
//! completed after cancellation is never handed to the consumer.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use flexsync_core::RadioEvent;

use super::{LaneStats, Reassembler, StreamFrame, StreamKind, StreamStats};
use crate::meters::MeterDecoder;
use crate::vita49::{self, PayloadLayout, StreamType, VitaPacket};

/// Packets queued per lane before new ones are dropped.
const LANE_BACKLOG: usize = 64;

struct Lane {
    kind: Option<StreamKind>,
    packets: mpsc::Sender<VitaPacket>,
    cancel: CancellationToken,
    stats: Arc<LaneStats>,
}

pub struct StreamDemuxer {
    lanes: Mutex<HashMap<u32, Lane>>,
    meters: MeterDecoder,
    events: broadcast::Sender<RadioEvent>,
    layout: PayloadLayout,
    frame_capacity: usize,
}

impl StreamDemuxer {
    pub fn new(
        meters: MeterDecoder,
        events: broadcast::Sender<RadioEvent>,
        layout: PayloadLayout,
        frame_capacity: usize,
    ) -> Self {
        StreamDemuxer {
            lanes: Mutex::new(HashMap::new()),
            meters,
            events,
            layout,
            frame_capacity,
        }
    }

    /// Open a lane for `stream_id` and return the consumer's frame channel.
    ///
    /// With `kind` unset the lane adopts the class of its first packet.
    /// Packets of any other class are counted as malformed. An existing
    /// lane for the same id is closed first. Must be called within a tokio
    /// runtime.
    pub fn open(&self, stream_id: u32, kind: Option<StreamKind>) -> mpsc::Receiver<StreamFrame> {
        let (packet_tx, packet_rx) = mpsc::channel(LANE_BACKLOG);
        let (frame_tx, frame_rx) = mpsc::channel(self.frame_capacity.max(1));
        let cancel = CancellationToken::new();
        let stats = Arc::new(LaneStats::default());

        let task = LaneTask {
            stream_id,
            kind,
            layout: self.layout,
            reassembler: kind.map(|k| k.reassembler(self.layout)),
            frames: frame_tx,
            stats: Arc::clone(&stats),
            events: self.events.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(task.run(packet_rx));

        let lane = Lane {
            kind,
            packets: packet_tx,
            cancel,
            stats,
        };
        if let Some(old) = self.lanes.lock().insert(stream_id, lane) {
            old.cancel.cancel();
        }
        tracing::debug!(
            stream_id = format!("0x{stream_id:08X}"),
            kind = ?kind,
            "Stream lane opened"
        );
        frame_rx
    }

    /// Close the lane for `stream_id`. Returns false if none was open.
    pub fn close(&self, stream_id: u32) -> bool {
        let Some(lane) = self.lanes.lock().remove(&stream_id) else {
            return false;
        };
        lane.cancel.cancel();
        tracing::debug!(
            stream_id = format!("0x{stream_id:08X}"),
            kind = ?lane.kind,
            "Stream lane closed"
        );
        true
    }

    pub fn close_all(&self) {
        let lanes: Vec<Lane> = self.lanes.lock().drain().map(|(_, lane)| lane).collect();
        for lane in lanes {
            lane.cancel.cancel();
        }
    }

    pub fn is_open(&self, stream_id: u32) -> bool {
        self.lanes.lock().contains_key(&stream_id)
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.lock().len()
    }

    pub fn stats(&self, stream_id: u32) -> Option<StreamStats> {
        self.lanes
            .lock()
            .get(&stream_id)
            .map(|lane| lane.stats.snapshot())
    }

    /// Route one raw datagram.
    pub fn dispatch(&self, datagram: Bytes) {
        let packet = match vita49::parse_packet(datagram) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping undecodable datagram");
                return;
            }
        };

        if packet.header.stream_type == StreamType::MeterData {
            if let Err(e) = self.meters.decode(&packet.payload) {
                tracing::debug!(error = %e, "Dropping malformed meter packet");
            }
            return;
        }

        let stream_id = packet.stream_id();
        let lanes = self.lanes.lock();
        let Some(lane) = lanes.get(&stream_id) else {
            tracing::trace!(stream_id = format!("0x{stream_id:08X}"), "No lane for stream");
            return;
        };
        if let Err(e) = lane.packets.try_send(packet) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::debug!(
                        stream_id = format!("0x{stream_id:08X}"),
                        "Lane backlog full, packet dropped"
                    );
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::trace!(stream_id = format!("0x{stream_id:08X}"), "Lane stopped");
                }
            }
        }
    }
}

impl Drop for StreamDemuxer {
    fn drop(&mut self) {
        self.close_all();
    }
}

struct LaneTask {
    stream_id: u32,
    kind: Option<StreamKind>,
    layout: PayloadLayout,
    reassembler: Option<Box<dyn Reassembler>>,
    frames: mpsc::Sender<StreamFrame>,
    stats: Arc<LaneStats>,
    events: broadcast::Sender<RadioEvent>,
    cancel: CancellationToken,
}

impl LaneTask {
    async fn run(mut self, mut packets: mpsc::Receiver<VitaPacket>) {
        loop {
            let packet = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                packet = packets.recv() => match packet {
                    Some(p) => p,
                    None => break,
                },
            };
            if !self.process(packet) {
                break;
            }
        }
        tracing::trace!(stream_id = format!("0x{:08X}", self.stream_id), "Stream lane stopped");
    }

    /// Handle one packet. Returns false once the lane should stop.
    fn process(&mut self, packet: VitaPacket) -> bool {
        let id = format!("0x{:08X}", self.stream_id);
        let packet_kind = StreamKind::from_stream_type(packet.header.stream_type);
        match (self.kind, packet_kind) {
            (None, Some(kind)) => {
                tracing::debug!(stream_id = %id, kind = %kind, "Stream kind detected");
                self.kind = Some(kind);
                self.reassembler = Some(kind.reassembler(self.layout));
            }
            (Some(expected), Some(got)) if expected == got => {}
            _ => {
                self.stats.malformed();
                tracing::debug!(
                    stream_id = %id,
                    class = format!("0x{:04X}", packet.header.packet_class_code),
                    "Packet class does not match lane"
                );
                return true;
            }
        }
        let Some(reassembler) = self.reassembler.as_mut() else {
            return true;
        };

        let accepted = match reassembler.accept(&packet) {
            Ok(a) => a,
            Err(e) => {
                self.stats.malformed();
                tracing::debug!(stream_id = %id, error = %e, "Dropping malformed packet");
                return true;
            }
        };

        if accepted.stale {
            self.stats.stale();
            tracing::debug!(stream_id = %id, seq = packet.sequence(), "Dropping stale packet");
        }
        if accepted.lost > 0 {
            self.stats.lost(accepted.lost);
            tracing::debug!(stream_id = %id, lost = accepted.lost, "Stream gap");
            let _ = self.events.send(RadioEvent::StreamLoss {
                stream_id: self.stream_id,
                lost: accepted.lost,
            });
        }

        for frame in accepted.frames {
            if self.cancel.is_cancelled() {
                return false;
            }
            match self.frames.try_reserve() {
                Ok(permit) => {
                    self.stats.delivered();
                    permit.send(frame);
                }
                Err(mpsc::error::TrySendError::Full(())) => {
                    self.stats.dropped();
                    tracing::debug!(stream_id = %id, "Consumer lagging, frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(())) => {
                    tracing::debug!(stream_id = %id, "Frame consumer gone");
                    return false;
                }
            }
        }
        true
    }
}
