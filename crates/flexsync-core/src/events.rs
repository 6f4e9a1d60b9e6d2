//! Asynchronous radio events.
//!
//! Events are emitted through a [`tokio::sync::broadcast`] channel whenever
//! the synchronized model changes. Subscribers see object lifecycle
//! transitions, property changes, meter updates, and stream anomalies
//! without polling the registry.

use crate::types::ObjectRef;

/// An event emitted by a session when the radio model changes.
///
/// Delivery is best-effort through a bounded broadcast channel; slow
/// consumers may miss events under heavy status traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    /// An object reached its initialized state. Fires once per lifetime.
    ObjectAdded(ObjectRef),

    /// An object is about to be evicted from the registry.
    ObjectWillBeRemoved(ObjectRef),

    /// An object was evicted from the registry.
    ObjectRemoved(ObjectRef),

    /// A field of an initialized object changed value.
    PropertyChanged {
        /// Which object changed.
        object: ObjectRef,
        /// The status token of the changed field.
        token: &'static str,
    },

    /// A meter reading changed.
    MeterUpdated {
        /// Runtime-assigned meter id.
        id: u32,
        /// Converted value in the meter's unit.
        value: f32,
    },

    /// One or more frames or packets of a stream were lost.
    StreamLoss {
        /// VITA-49 stream id.
        stream_id: u32,
        /// Number of frames or packets skipped.
        lost: u32,
    },

    /// Informational message pushed by the radio (`M` line).
    Message {
        /// Message severity bits from the message code.
        severity: u8,
        /// Message text.
        text: String,
    },

    /// Successfully connected and handshaken.
    Connected,

    /// Connection to the radio was lost or closed.
    Disconnected,
}
