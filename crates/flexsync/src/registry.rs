//! Keyed stores of radio-side objects and their lifecycle.
//!
//! Every object moves through `Absent -> Provisional -> Initialized ->
//! Removed`. An [`ObjectStore`] owns one kind's instances and drives that
//! machine: it creates entries lazily, applies status fields, flips the
//! initialized flag once the kind's readiness predicate holds, and evicts
//! entries with a pair of removal events. The [`Registry`] bundles one
//! store per kind and shares a single event bus.
//!
//! Each object sits behind its own `parking_lot::RwLock`, so readers never
//! wait on other objects and a write excludes readers of that object only.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

use flexsync_core::{Error, ObjectId, ObjectKind, ObjectRef, RadioEvent, Result};

use crate::objects::{
    Amplifier, DaxIqStream, DaxMicAudioStream, DaxRxAudioStream, DaxTxAudioStream, Equalizer,
    Interlock, Memory, Meter, Panadapter, RadioObject, RemoteRxAudioStream, RemoteTxAudioStream,
    RemovalPolicy, Slice, StatusToken, Tnf, Transmit, Waterfall, Xvtr,
};

/// One registry entry: the object plus its lifecycle flag.
#[derive(Debug)]
pub struct Tracked<T> {
    object: RwLock<T>,
    initialized: AtomicBool,
}

impl<T> Tracked<T> {
    fn new(object: T) -> Self {
        Tracked {
            object: RwLock::new(object),
            initialized: AtomicBool::new(false),
        }
    }

    /// Shared read access to the object's fields.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.object.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.object.write()
    }

    /// Whether the object has passed its readiness predicate.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Set the flag; true only for the caller that flipped it.
    fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::AcqRel)
    }
}

/// All live instances of one object kind.
pub struct ObjectStore<T: RadioObject> {
    entries: RwLock<HashMap<ObjectId, Arc<Tracked<T>>>>,
    events: broadcast::Sender<RadioEvent>,
}

impl<T: RadioObject> ObjectStore<T> {
    pub fn new(events: broadcast::Sender<RadioEvent>) -> Self {
        ObjectStore {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Look up an entry, initialized or not.
    pub fn get(&self, id: &ObjectId) -> Option<Arc<Tracked<T>>> {
        self.entries.read().get(id).cloned()
    }

    /// Look up an entry only if it is initialized.
    pub fn get_initialized(&self, id: &ObjectId) -> Option<Arc<Tracked<T>>> {
        self.get(id).filter(|e| e.is_initialized())
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Ids of every entry, in no particular order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn object_ref(id: &ObjectId) -> ObjectRef {
        ObjectRef::new(T::KIND, id.clone())
    }

    fn emit(&self, event: RadioEvent) {
        let _ = self.events.send(event);
    }

    fn get_or_create(&self, id: &ObjectId) -> Arc<Tracked<T>> {
        if let Some(entry) = self.get(id) {
            return entry;
        }
        let mut entries = self.entries.write();
        entries
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::trace!(kind = %T::KIND, id = %id, "Object provisional");
                Arc::new(Tracked::new(T::new(id.clone())))
            })
            .clone()
    }

    /// Apply a status line's fields to the object, creating it if needed.
    ///
    /// Unknown tokens and unparsable values are logged and skipped one at
    /// a time. Events are sent after the object's lock is released.
    pub fn apply_status(&self, id: &ObjectId, fields: &[(String, String)]) {
        let entry = self.get_or_create(id);

        let mut changed: Vec<&'static str> = Vec::new();
        let ready = {
            let mut object = entry.write();
            for (key, value) in fields {
                let Some(token) = T::Token::parse(key) else {
                    tracing::warn!(kind = %T::KIND, id = %id, token = %key, "Unknown status token");
                    continue;
                };
                match object.apply(token, value) {
                    Ok(true) => changed.push(token.as_str()),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            kind = %T::KIND,
                            id = %id,
                            token = %key,
                            value = %value,
                            error = %e,
                            "Invalid status value"
                        );
                    }
                }
            }
            object.is_ready()
        };

        self.settle(id, &entry, changed, ready);
    }

    /// Optimistically apply a locally-set property to an existing object.
    ///
    /// Follows the same compare-and-signal path as radio updates.
    pub fn set_local(&self, id: &ObjectId, token: T::Token, value: &str) -> Result<bool> {
        let entry = self
            .get(id)
            .ok_or_else(|| Error::InvalidParameter(format!("no {} {id}", T::KIND)))?;
        let (changed, ready) = {
            let mut object = entry.write();
            let changed = object.apply(token, value)?;
            (changed, object.is_ready())
        };
        let tokens = if changed { vec![token.as_str()] } else { Vec::new() };
        self.settle(id, &entry, tokens, ready);
        Ok(changed)
    }

    fn settle(&self, id: &ObjectId, entry: &Tracked<T>, changed: Vec<&'static str>, ready: bool) {
        if entry.is_initialized() {
            for token in changed {
                self.emit(RadioEvent::PropertyChanged {
                    object: Self::object_ref(id),
                    token,
                });
            }
        } else if ready && entry.mark_initialized() {
            tracing::debug!(kind = %T::KIND, id = %id, "Object added");
            self.emit(RadioEvent::ObjectAdded(Self::object_ref(id)));
        }
    }

    /// Evict an entry. Returns false (and emits nothing) if it was absent.
    pub fn remove(&self, id: &ObjectId) -> bool {
        if !self.contains(id) {
            tracing::trace!(kind = %T::KIND, id = %id, "Removal of absent object ignored");
            return false;
        }
        self.emit(RadioEvent::ObjectWillBeRemoved(Self::object_ref(id)));
        if self.entries.write().remove(id).is_none() {
            return false;
        }
        tracing::debug!(kind = %T::KIND, id = %id, "Object removed");
        self.emit(RadioEvent::ObjectRemoved(Self::object_ref(id)));
        true
    }

    /// Drop every entry without per-object events.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Type-erased view of an [`ObjectStore`] used by the status router.
pub(crate) trait StatusSink: Send + Sync {
    fn parse_id(&self, token: &str) -> Option<ObjectId>;
    fn apply_status(&self, id: &ObjectId, fields: &[(String, String)]);
    fn remove(&self, id: &ObjectId) -> bool;
    fn contains(&self, id: &ObjectId) -> bool;
    fn removal_policy(&self) -> RemovalPolicy;
    fn clear(&self);
}

impl<T: RadioObject> StatusSink for ObjectStore<T> {
    fn parse_id(&self, token: &str) -> Option<ObjectId> {
        T::parse_id(token)
    }

    fn apply_status(&self, id: &ObjectId, fields: &[(String, String)]) {
        ObjectStore::apply_status(self, id, fields)
    }

    fn remove(&self, id: &ObjectId) -> bool {
        ObjectStore::remove(self, id)
    }

    fn contains(&self, id: &ObjectId) -> bool {
        ObjectStore::contains(self, id)
    }

    fn removal_policy(&self) -> RemovalPolicy {
        T::REMOVAL
    }

    fn clear(&self) {
        ObjectStore::clear(self)
    }
}

/// Stream-carrying kinds addressed by `stream 0xH` status lines.
pub(crate) const STREAM_KINDS: [ObjectKind; 6] = [
    ObjectKind::DaxRxAudioStream,
    ObjectKind::DaxTxAudioStream,
    ObjectKind::DaxMicAudioStream,
    ObjectKind::DaxIqStream,
    ObjectKind::RemoteRxAudioStream,
    ObjectKind::RemoteTxAudioStream,
];

const ALL_KINDS: [ObjectKind; 17] = [
    ObjectKind::Slice,
    ObjectKind::Panadapter,
    ObjectKind::Waterfall,
    ObjectKind::Meter,
    ObjectKind::Equalizer,
    ObjectKind::Tnf,
    ObjectKind::Memory,
    ObjectKind::Amplifier,
    ObjectKind::Xvtr,
    ObjectKind::DaxRxAudioStream,
    ObjectKind::DaxTxAudioStream,
    ObjectKind::DaxMicAudioStream,
    ObjectKind::DaxIqStream,
    ObjectKind::RemoteRxAudioStream,
    ObjectKind::RemoteTxAudioStream,
    ObjectKind::Transmit,
    ObjectKind::Interlock,
];

/// One store per object kind, sharing an event bus.
pub struct Registry {
    slices: ObjectStore<Slice>,
    panadapters: ObjectStore<Panadapter>,
    waterfalls: ObjectStore<Waterfall>,
    meters: ObjectStore<Meter>,
    equalizers: ObjectStore<Equalizer>,
    tnfs: ObjectStore<Tnf>,
    memories: ObjectStore<Memory>,
    amplifiers: ObjectStore<Amplifier>,
    xvtrs: ObjectStore<Xvtr>,
    dax_rx: ObjectStore<DaxRxAudioStream>,
    dax_tx: ObjectStore<DaxTxAudioStream>,
    dax_mic: ObjectStore<DaxMicAudioStream>,
    dax_iq: ObjectStore<DaxIqStream>,
    remote_rx: ObjectStore<RemoteRxAudioStream>,
    remote_tx: ObjectStore<RemoteTxAudioStream>,
    transmit: ObjectStore<Transmit>,
    interlock: ObjectStore<Interlock>,
    events: broadcast::Sender<RadioEvent>,
}

impl Registry {
    pub fn new(events: broadcast::Sender<RadioEvent>) -> Self {
        Registry {
            slices: ObjectStore::new(events.clone()),
            panadapters: ObjectStore::new(events.clone()),
            waterfalls: ObjectStore::new(events.clone()),
            meters: ObjectStore::new(events.clone()),
            equalizers: ObjectStore::new(events.clone()),
            tnfs: ObjectStore::new(events.clone()),
            memories: ObjectStore::new(events.clone()),
            amplifiers: ObjectStore::new(events.clone()),
            xvtrs: ObjectStore::new(events.clone()),
            dax_rx: ObjectStore::new(events.clone()),
            dax_tx: ObjectStore::new(events.clone()),
            dax_mic: ObjectStore::new(events.clone()),
            dax_iq: ObjectStore::new(events.clone()),
            remote_rx: ObjectStore::new(events.clone()),
            remote_tx: ObjectStore::new(events.clone()),
            transmit: ObjectStore::new(events.clone()),
            interlock: ObjectStore::new(events.clone()),
            events,
        }
    }

    /// The store for object kind `T`.
    pub fn store<T: RadioObject>(&self) -> &ObjectStore<T> {
        T::store(self)
    }

    pub fn slices(&self) -> &ObjectStore<Slice> {
        &self.slices
    }

    pub fn panadapters(&self) -> &ObjectStore<Panadapter> {
        &self.panadapters
    }

    pub fn waterfalls(&self) -> &ObjectStore<Waterfall> {
        &self.waterfalls
    }

    pub fn meters(&self) -> &ObjectStore<Meter> {
        &self.meters
    }

    pub fn equalizers(&self) -> &ObjectStore<Equalizer> {
        &self.equalizers
    }

    pub fn tnfs(&self) -> &ObjectStore<Tnf> {
        &self.tnfs
    }

    pub fn memories(&self) -> &ObjectStore<Memory> {
        &self.memories
    }

    pub fn amplifiers(&self) -> &ObjectStore<Amplifier> {
        &self.amplifiers
    }

    pub fn xvtrs(&self) -> &ObjectStore<Xvtr> {
        &self.xvtrs
    }

    pub fn dax_rx_streams(&self) -> &ObjectStore<DaxRxAudioStream> {
        &self.dax_rx
    }

    pub fn dax_tx_streams(&self) -> &ObjectStore<DaxTxAudioStream> {
        &self.dax_tx
    }

    pub fn dax_mic_streams(&self) -> &ObjectStore<DaxMicAudioStream> {
        &self.dax_mic
    }

    pub fn dax_iq_streams(&self) -> &ObjectStore<DaxIqStream> {
        &self.dax_iq
    }

    pub fn remote_rx_streams(&self) -> &ObjectStore<RemoteRxAudioStream> {
        &self.remote_rx
    }

    pub fn remote_tx_streams(&self) -> &ObjectStore<RemoteTxAudioStream> {
        &self.remote_tx
    }

    pub fn transmit(&self) -> &ObjectStore<Transmit> {
        &self.transmit
    }

    pub fn interlock(&self) -> &ObjectStore<Interlock> {
        &self.interlock
    }

    /// A new receiver on the registry's event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.events.subscribe()
    }

    pub(crate) fn events(&self) -> &broadcast::Sender<RadioEvent> {
        &self.events
    }

    pub(crate) fn sink(&self, kind: ObjectKind) -> &dyn StatusSink {
        match kind {
            ObjectKind::Slice => &self.slices,
            ObjectKind::Panadapter => &self.panadapters,
            ObjectKind::Waterfall => &self.waterfalls,
            ObjectKind::Meter => &self.meters,
            ObjectKind::Equalizer => &self.equalizers,
            ObjectKind::Tnf => &self.tnfs,
            ObjectKind::Memory => &self.memories,
            ObjectKind::Amplifier => &self.amplifiers,
            ObjectKind::Xvtr => &self.xvtrs,
            ObjectKind::DaxRxAudioStream => &self.dax_rx,
            ObjectKind::DaxTxAudioStream => &self.dax_tx,
            ObjectKind::DaxMicAudioStream => &self.dax_mic,
            ObjectKind::DaxIqStream => &self.dax_iq,
            ObjectKind::RemoteRxAudioStream => &self.remote_rx,
            ObjectKind::RemoteTxAudioStream => &self.remote_tx,
            ObjectKind::Transmit => &self.transmit,
            ObjectKind::Interlock => &self.interlock,
        }
    }

    /// Whether an object with this kind and id exists.
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.sink(object.kind).contains(&object.id)
    }

    /// The removal policy of an object kind.
    pub fn removal_policy(&self, kind: ObjectKind) -> RemovalPolicy {
        self.sink(kind).removal_policy()
    }

    /// Which stream kind, if any, holds `handle`.
    pub fn stream_kind(&self, handle: u32) -> Option<ObjectKind> {
        let id = ObjectId::Handle(handle);
        STREAM_KINDS
            .into_iter()
            .find(|kind| self.sink(*kind).contains(&id))
    }

    /// Evict one object. Returns whether it existed.
    pub fn remove(&self, object: &ObjectRef) -> bool {
        self.sink(object.kind).remove(&object.id)
    }

    /// Drop every object of every kind without per-object events.
    ///
    /// Used on disconnect; the radio replays full status on reconnect.
    pub fn clear(&self) {
        for kind in ALL_KINDS {
            self.sink(kind).clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::slice::SliceToken;

    fn registry() -> (Registry, broadcast::Receiver<RadioEvent>) {
        let (tx, rx) = broadcast::channel(64);
        (Registry::new(tx), rx)
    }

    fn drain(rx: &mut broadcast::Receiver<RadioEvent>) -> Vec<RadioEvent> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    fn kv(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn slice0() -> ObjectRef {
        ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0))
    }

    #[test]
    fn added_fires_once_after_readiness() {
        let (reg, mut rx) = registry();
        let id = ObjectId::Index(0);

        reg.slices().apply_status(&id, &kv(&[("mode", "USB")]));
        assert!(reg.slices().contains(&id));
        assert!(!reg.slices().get(&id).unwrap().is_initialized());
        assert!(drain(&mut rx).is_empty());

        reg.slices().apply_status(&id, &kv(&[("RF_frequency", "14.250000")]));
        assert!(drain(&mut rx).is_empty());

        reg.slices().apply_status(&id, &kv(&[("pan", "0x40000000")]));
        assert_eq!(drain(&mut rx), vec![RadioEvent::ObjectAdded(slice0())]);

        reg.slices().apply_status(&id, &kv(&[("pan", "0x40000000"), ("mode", "LSB")]));
        assert_eq!(
            drain(&mut rx),
            vec![RadioEvent::PropertyChanged {
                object: slice0(),
                token: "mode"
            }]
        );
    }

    #[test]
    fn identical_update_is_idempotent() {
        let (reg, mut rx) = registry();
        let id = ObjectId::Index(0);
        let fields = kv(&[
            ("pan", "0x40000000"),
            ("RF_frequency", "7.074000"),
            ("mode", "DIGU"),
        ]);
        reg.slices().apply_status(&id, &fields);
        drain(&mut rx);

        let before = reg.slices().get(&id).unwrap().read().frequency_hz;
        reg.slices().apply_status(&id, &fields);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(reg.slices().get(&id).unwrap().read().frequency_hz, before);
    }

    #[test]
    fn unknown_token_does_not_abort_line() {
        let (reg, _rx) = registry();
        let id = ObjectId::Index(1);
        reg.slices().apply_status(
            &id,
            &kv(&[("future_thing", "1"), ("mode", "CW"), ("filter_lo", "bogus")]),
        );
        let entry = reg.slices().get(&id).unwrap();
        assert_eq!(entry.read().mode, "CW");
        assert_eq!(entry.read().filter_lo, 0);
    }

    #[test]
    fn removed_fires_once_and_evicts() {
        let (reg, mut rx) = registry();
        let id = ObjectId::Index(0);
        reg.slices().apply_status(
            &id,
            &kv(&[("pan", "0x1"), ("RF_frequency", "14.0"), ("mode", "USB")]),
        );
        drain(&mut rx);

        assert!(reg.remove(&slice0()));
        assert_eq!(
            drain(&mut rx),
            vec![
                RadioEvent::ObjectWillBeRemoved(slice0()),
                RadioEvent::ObjectRemoved(slice0()),
            ]
        );
        assert!(reg.slices().get(&id).is_none());

        assert!(!reg.remove(&slice0()));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn removal_of_provisional_object_still_signals() {
        let (reg, mut rx) = registry();
        reg.slices()
            .apply_status(&ObjectId::Index(2), &kv(&[("mode", "AM")]));
        assert!(reg.slices().remove(&ObjectId::Index(2)));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn removed_id_restarts_lifecycle() {
        let (reg, mut rx) = registry();
        let id = ObjectId::Index(0);
        let fields = kv(&[("pan", "0x1"), ("RF_frequency", "14.0"), ("mode", "USB")]);
        reg.slices().apply_status(&id, &fields);
        reg.slices().remove(&id);
        drain(&mut rx);

        reg.slices().apply_status(&id, &fields);
        assert_eq!(drain(&mut rx), vec![RadioEvent::ObjectAdded(slice0())]);
    }

    #[test]
    fn set_local_signals_like_radio_update() {
        let (reg, mut rx) = registry();
        let id = ObjectId::Index(0);
        reg.slices().apply_status(
            &id,
            &kv(&[("pan", "0x1"), ("RF_frequency", "14.0"), ("mode", "USB")]),
        );
        drain(&mut rx);

        assert!(reg.slices().set_local(&id, SliceToken::Mode, "CW").unwrap());
        assert!(!reg.slices().set_local(&id, SliceToken::Mode, "CW").unwrap());
        assert_eq!(drain(&mut rx).len(), 1);

        let missing = reg
            .slices()
            .set_local(&ObjectId::Index(7), SliceToken::Mode, "CW");
        assert!(matches!(missing, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn stream_kind_lookup() {
        let (reg, _rx) = registry();
        reg.dax_iq_streams()
            .apply_status(&ObjectId::Handle(0x2000_0000), &kv(&[("ip", "10.0.0.2")]));
        assert_eq!(
            reg.stream_kind(0x2000_0000),
            Some(ObjectKind::DaxIqStream)
        );
        assert_eq!(reg.stream_kind(0x2000_0001), None);
    }

    #[test]
    fn removal_policies() {
        let (reg, _rx) = registry();
        assert_eq!(
            reg.removal_policy(ObjectKind::RemoteRxAudioStream),
            RemovalPolicy::ClientAsserted
        );
        assert_eq!(
            reg.removal_policy(ObjectKind::DaxRxAudioStream),
            RemovalPolicy::RadioConfirmed
        );
    }

    #[test]
    fn clear_drops_everything_silently() {
        let (reg, mut rx) = registry();
        reg.transmit()
            .apply_status(&ObjectId::Singleton, &kv(&[("rfpower", "50")]));
        reg.slices()
            .apply_status(&ObjectId::Index(0), &kv(&[("mode", "USB")]));
        drain(&mut rx);
        reg.clear();
        assert!(reg.transmit().is_empty());
        assert!(reg.slices().is_empty());
        assert!(drain(&mut rx).is_empty());
    }
}
