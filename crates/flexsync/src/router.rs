//! Status line routing.
//!
//! The router identifies which object a status payload is about and hands
//! the remaining fields to that object's store. It must be fed in arrival
//! order: later lines assume the state built by earlier ones.

use std::sync::Arc;

use flexsync_core::{ObjectId, ObjectKind, ObjectRef};

use crate::registry::Registry;
use crate::status::{StatusLine, parse_meter_fields};

/// Where the instance id sits in the head words, if the kind has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdPosition {
    At(usize),
    Singleton,
}

/// Dispatches status payloads into a [`Registry`].
pub struct StatusRouter {
    registry: Arc<Registry>,
}

impl StatusRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        StatusRouter { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Apply one status payload (the part after `S<handle>|`).
    ///
    /// Returns the objects this line removed, so the caller can tear down
    /// any stream state bound to them.
    pub fn route(&self, payload: &str) -> Vec<ObjectRef> {
        let payload = payload.trim();
        tracing::trace!(payload = %payload, "Routing status");

        if let Some(body) = payload.strip_prefix("meter ") {
            return self.route_meters(body);
        }

        let line = StatusLine::parse(payload);
        let Some(keyword) = line.kind_token() else {
            return Vec::new();
        };

        let Some((kind, position)) = self.resolve_kind(&line) else {
            if is_stream_removal(&line) {
                tracing::trace!(payload = %payload, "Removal of unknown stream ignored");
            } else {
                tracing::warn!(kind = %keyword, "Unknown status object kind");
            }
            return Vec::new();
        };

        let id = match position {
            IdPosition::Singleton => {
                if line.head.len() > 1 {
                    tracing::trace!(kind = %kind, head = ?line.head, "Sub-object status ignored");
                    return Vec::new();
                }
                ObjectId::Singleton
            }
            IdPosition::At(index) => {
                let Some(token) = line.head_word(index) else {
                    tracing::warn!(kind = %kind, "Status line without object id");
                    return Vec::new();
                };
                match self.registry.sink(kind).parse_id(token) {
                    Some(id) => id,
                    None => {
                        tracing::warn!(kind = %kind, id = %token, "Invalid object id");
                        return Vec::new();
                    }
                }
            }
        };

        if line.is_removal() {
            return self.remove(ObjectRef::new(kind, id));
        }

        for flag in &line.flags {
            tracing::trace!(kind = %kind, id = %id, flag = %flag, "Status flag ignored");
        }
        self.registry.sink(kind).apply_status(&id, &line.fields);
        Vec::new()
    }

    /// Remove an object and anything whose membership depends on it.
    fn remove(&self, object: ObjectRef) -> Vec<ObjectRef> {
        if !self.registry.contains(&object) {
            tracing::trace!(object = %object, "Removal of unknown object ignored");
            return Vec::new();
        }

        let paired_pan = match object.kind {
            ObjectKind::Waterfall => self
                .registry
                .waterfalls()
                .get(&object.id)
                .map(|entry| entry.read().panadapter)
                .filter(|pan| *pan != 0),
            _ => None,
        };

        let mut removed = Vec::new();
        if self.registry.remove(&object) {
            removed.push(object);
        }
        if let Some(pan) = paired_pan {
            let pan = ObjectRef::new(ObjectKind::Panadapter, ObjectId::Handle(pan));
            if self.registry.remove(&pan) {
                removed.push(pan);
            }
        }
        removed
    }

    fn resolve_kind(&self, line: &StatusLine) -> Option<(ObjectKind, IdPosition)> {
        let kind = match line.kind_token()? {
            "slice" => (ObjectKind::Slice, IdPosition::At(1)),
            "display" => match line.head_word(1)? {
                "pan" | "panafall" => (ObjectKind::Panadapter, IdPosition::At(2)),
                "waterfall" => (ObjectKind::Waterfall, IdPosition::At(2)),
                _ => return None,
            },
            "eq" => (ObjectKind::Equalizer, IdPosition::At(1)),
            "tnf" => (ObjectKind::Tnf, IdPosition::At(1)),
            "memory" => (ObjectKind::Memory, IdPosition::At(1)),
            "amplifier" => (ObjectKind::Amplifier, IdPosition::At(1)),
            "xvtr" => (ObjectKind::Xvtr, IdPosition::At(1)),
            "transmit" => (ObjectKind::Transmit, IdPosition::Singleton),
            "interlock" => (ObjectKind::Interlock, IdPosition::Singleton),
            "audio_stream" => (ObjectKind::DaxRxAudioStream, IdPosition::At(1)),
            "tx_audio_stream" => (ObjectKind::DaxTxAudioStream, IdPosition::At(1)),
            "mic_audio_stream" => (ObjectKind::DaxMicAudioStream, IdPosition::At(1)),
            "dax_iq" | "daxiq" => (ObjectKind::DaxIqStream, IdPosition::At(1)),
            "opus_stream" => (ObjectKind::RemoteRxAudioStream, IdPosition::At(1)),
            "stream" => (self.stream_kind(line)?, IdPosition::At(1)),
            _ => return None,
        };
        Some(kind)
    }

    /// `stream 0xH type=...`: the type field names the kind. Removal lines
    /// usually omit it, so fall back to whichever store holds the handle.
    fn stream_kind(&self, line: &StatusLine) -> Option<ObjectKind> {
        if let Some(kind) = line.field("type").and_then(stream_kind_from_type) {
            return Some(kind);
        }
        let handle = line
            .head_word(1)
            .and_then(flexsync_core::convert::parse_hex_u32)?;
        self.registry.stream_kind(handle)
    }

    fn route_meters(&self, body: &str) -> Vec<ObjectRef> {
        let words: Vec<&str> = body.split_whitespace().collect();
        if words.len() >= 2 && words[1] == "removed" && !words[0].contains('=') {
            let Some(id) = ObjectId::index(words[0]) else {
                tracing::warn!(id = %words[0], "Invalid meter id");
                return Vec::new();
            };
            return self.remove(ObjectRef::new(ObjectKind::Meter, id));
        }

        for (id, fields) in parse_meter_fields(body) {
            match id {
                Some(id) => self
                    .registry
                    .meters()
                    .apply_status(&ObjectId::Index(id), &fields),
                None => {
                    tracing::warn!(fields = ?fields, "Malformed meter field");
                }
            }
        }
        Vec::new()
    }
}

/// Map a `type=` value to a stream kind.
pub fn stream_kind_from_type(value: &str) -> Option<ObjectKind> {
    match value {
        "dax_rx" => Some(ObjectKind::DaxRxAudioStream),
        "dax_tx" => Some(ObjectKind::DaxTxAudioStream),
        "dax_mic" => Some(ObjectKind::DaxMicAudioStream),
        "dax_iq" => Some(ObjectKind::DaxIqStream),
        "remote_audio_rx" => Some(ObjectKind::RemoteRxAudioStream),
        "remote_audio_tx" => Some(ObjectKind::RemoteTxAudioStream),
        _ => None,
    }
}

/// `stream 0xH removed` and friends. The handle may belong to a stream this
/// client never saw, so such lines are not protocol drift.
fn is_stream_removal(line: &StatusLine) -> bool {
    line.kind_token() == Some("stream") && line.is_removal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexsync_core::RadioEvent;
    use tokio::sync::broadcast;

    fn router() -> (StatusRouter, broadcast::Receiver<RadioEvent>) {
        let (tx, rx) = broadcast::channel(256);
        (StatusRouter::new(Arc::new(Registry::new(tx))), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<RadioEvent>) -> Vec<RadioEvent> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    fn added(events: &[RadioEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, RadioEvent::ObjectAdded(_)))
            .count()
    }

    fn removed(events: &[RadioEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, RadioEvent::ObjectRemoved(_)))
            .count()
    }

    #[test]
    fn slice_lifecycle_events() {
        let (r, mut rx) = router();
        r.route("slice 0 mode=USB");
        r.route("slice 0 RF_frequency=14.250000");
        assert_eq!(added(&drain(&mut rx)), 0);

        r.route("slice 0 pan=0x40000000 rxant=ANT1");
        assert_eq!(added(&drain(&mut rx)), 1);

        r.route("slice 0 pan=0x40000000 rxant=ANT1");
        assert!(drain(&mut rx).is_empty());

        let gone = r.route("slice 0 in_use=0");
        assert_eq!(gone, vec![ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0))]);
        assert_eq!(removed(&drain(&mut rx)), 1);
        assert!(r.registry().slices().get(&ObjectId::Index(0)).is_none());

        assert!(r.route("slice 0 in_use=0").is_empty());
        assert!(drain(&mut rx).is_empty());
        assert!(r.registry().slices().is_empty());
    }

    #[test]
    fn one_bad_token_does_not_spoil_the_line() {
        let (r, _rx) = router();
        r.route("slice 3 shiny_new_thing=7 mode=CW filter_lo=oops filter_hi=500");
        let entry = r.registry().slices().get(&ObjectId::Index(3)).unwrap();
        let slice = entry.read();
        assert_eq!(slice.mode, "CW");
        assert_eq!(slice.filter_hi, 500);
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let (r, mut rx) = router();
        assert!(r.route("gps lat=51.5 lon=0.1").is_empty());
        assert!(r.route("display spectrogram 0x1 x=1").is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn panadapter_and_waterfall_pairing() {
        let (r, mut rx) = router();
        r.route("display pan 0x40000000 center=14.100000 bandwidth=0.200000 min_dbm=-135.0 max_dbm=-40.0 waterfall=0x42000000");
        r.route("display waterfall 0x42000000 panadapter=0x40000000 line_duration=100");
        assert_eq!(added(&drain(&mut rx)), 2);

        let gone = r.route("display waterfall 0x42000000 removed");
        assert_eq!(
            gone,
            vec![
                ObjectRef::new(ObjectKind::Waterfall, ObjectId::Handle(0x4200_0000)),
                ObjectRef::new(ObjectKind::Panadapter, ObjectId::Handle(0x4000_0000)),
            ]
        );
        assert_eq!(removed(&drain(&mut rx)), 2);
        assert!(r.registry().panadapters().is_empty());
    }

    #[test]
    fn removal_of_unseen_object_is_noop() {
        let (r, mut rx) = router();
        assert!(r.route("display pan 0x40000001 removed").is_empty());
        assert!(r.registry().panadapters().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn removal_of_unseen_stream_is_noop() {
        let (r, mut rx) = router();
        assert!(r.route("stream 0x04000009 removed").is_empty());
        assert!(drain(&mut rx).is_empty());
        assert!(r.registry().stream_kind(0x0400_0009).is_none());

        assert!(is_stream_removal(&StatusLine::parse("stream 0x04000009 removed")));
        assert!(!is_stream_removal(&StatusLine::parse("stream 0x04000009 type=bogus")));
        assert!(!is_stream_removal(&StatusLine::parse("widget 3 removed")));
    }

    #[test]
    fn stream_type_selects_kind() {
        let (r, mut rx) = router();
        r.route("stream 0x04000008 type=dax_rx dax_channel=1 slice=0 client_handle=0x12345678");
        r.route("stream 0x20000000 type=dax_iq daxiq_channel=1 pan=0x40000000 ip=10.0.0.5");
        r.route("stream 0x84000000 type=remote_audio_rx compression=opus client_handle=0x12345678");
        assert_eq!(added(&drain(&mut rx)), 3);
        assert!(r.registry().dax_rx_streams().contains(&ObjectId::Handle(0x0400_0008)));
        assert!(r.registry().dax_iq_streams().contains(&ObjectId::Handle(0x2000_0000)));
        assert!(r.registry().remote_rx_streams().contains(&ObjectId::Handle(0x8400_0000)));

        let gone = r.route("stream 0x04000008 removed");
        assert_eq!(
            gone,
            vec![ObjectRef::new(
                ObjectKind::DaxRxAudioStream,
                ObjectId::Handle(0x0400_0008)
            )]
        );
    }

    #[test]
    fn stream_with_unknown_type_is_skipped() {
        let (r, _rx) = router();
        assert!(r.route("stream 0x1 type=hologram ip=1.2.3.4").is_empty());
        assert!(r.registry().stream_kind(1).is_none());
    }

    #[test]
    fn legacy_stream_keywords() {
        let (r, _rx) = router();
        r.route("audio_stream 0x04000009 dax=2 slice=1 ip=10.0.0.5 port=4991 in_use=1");
        r.route("opus_stream 0x84000001 ip=10.0.0.5 port=4991");
        assert!(r.registry().dax_rx_streams().contains(&ObjectId::Handle(0x0400_0009)));
        assert!(r.registry().remote_rx_streams().contains(&ObjectId::Handle(0x8400_0001)));

        r.route("audio_stream 0x04000009 in_use=0");
        assert!(r.registry().dax_rx_streams().is_empty());
    }

    #[test]
    fn singletons() {
        let (r, mut rx) = router();
        r.route("transmit rfpower=50 tunepower=10");
        assert_eq!(added(&drain(&mut rx)), 1);
        let tx = r.registry().transmit().get(&ObjectId::Singleton).unwrap();
        assert_eq!(tx.read().rf_power, 50);
        drop(tx);

        r.route("transmit band 1 rfpower=100");
        let tx = r.registry().transmit().get(&ObjectId::Singleton).unwrap();
        assert_eq!(tx.read().rf_power, 50);
        drop(tx);

        r.route("interlock state=READY tx_allowed=1");
        assert!(r.registry().interlock().contains(&ObjectId::Singleton));
    }

    #[test]
    fn meters_grouped_and_removed() {
        let (r, mut rx) = router();
        r.route("meter 1.src=SLC#1.num=0#1.nam=LEVEL#1.unit=dBm#1.low=-150.0#1.hi=20.0#2.src=RAD#2.nam=+13.8A#2.unit=Volts#");
        assert_eq!(added(&drain(&mut rx)), 2);
        let volts = r.registry().meters().get(&ObjectId::Index(2)).unwrap();
        assert_eq!(volts.read().units, "Volts");
        drop(volts);

        let gone = r.route("meter 2 removed");
        assert_eq!(gone, vec![ObjectRef::new(ObjectKind::Meter, ObjectId::Index(2))]);
        assert!(!r.registry().meters().contains(&ObjectId::Index(2)));
        assert!(r.registry().meters().contains(&ObjectId::Index(1)));
    }

    #[test]
    fn named_and_indexed_ids() {
        let (r, _rx) = router();
        r.route("eq rxsc mode=1 63Hz=2 125Hz=0");
        r.route("tnf 1 freq=14.205 depth=2 width=0.000100 permanent=0");
        r.route("xvtr 0 name=2m rf_freq=144.0 if_freq=28.0");
        r.route("amplifier 0x10000001 ip=10.0.0.20 port=9008 model=PGXL");
        r.route("memory 7 name=Net freq=146.52 mode=FM");
        let reg = r.registry();
        assert!(reg.equalizers().get_initialized(&ObjectId::Name("rxsc".into())).is_some());
        assert!(reg.tnfs().get_initialized(&ObjectId::Index(1)).is_some());
        assert!(reg.xvtrs().get_initialized(&ObjectId::Index(0)).is_some());
        assert!(reg.amplifiers().get_initialized(&ObjectId::Handle(0x1000_0001)).is_some());
        assert!(reg.memories().get_initialized(&ObjectId::Index(7)).is_some());
    }

    #[test]
    fn invalid_ids_are_skipped() {
        let (r, _rx) = router();
        r.route("slice x mode=USB");
        r.route("display pan nothex center=1.0");
        r.route("slice");
        assert!(r.registry().slices().is_empty());
        assert!(r.registry().panadapters().is_empty());
    }
}
