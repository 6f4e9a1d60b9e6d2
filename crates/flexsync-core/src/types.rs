//! Identity types for radio-side objects.
//!
//! Every object the radio reports through status lines is identified by a
//! kind and an instance id. The id takes one of several shapes depending on
//! the kind: a small decimal index (slices, meters), a 32-bit hex handle
//! (panadapters, streams), a name (equalizers), or nothing at all for
//! radio-wide singletons.

use std::fmt;

use crate::convert;

/// The kind of a radio-side object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Slice,
    Panadapter,
    Waterfall,
    Meter,
    Equalizer,
    Tnf,
    Memory,
    Amplifier,
    Xvtr,
    DaxRxAudioStream,
    DaxTxAudioStream,
    DaxMicAudioStream,
    DaxIqStream,
    RemoteRxAudioStream,
    RemoteTxAudioStream,
    Transmit,
    Interlock,
}

impl ObjectKind {
    /// Short lowercase name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Slice => "slice",
            ObjectKind::Panadapter => "panadapter",
            ObjectKind::Waterfall => "waterfall",
            ObjectKind::Meter => "meter",
            ObjectKind::Equalizer => "eq",
            ObjectKind::Tnf => "tnf",
            ObjectKind::Memory => "memory",
            ObjectKind::Amplifier => "amplifier",
            ObjectKind::Xvtr => "xvtr",
            ObjectKind::DaxRxAudioStream => "dax_rx",
            ObjectKind::DaxTxAudioStream => "dax_tx",
            ObjectKind::DaxMicAudioStream => "dax_mic",
            ObjectKind::DaxIqStream => "dax_iq",
            ObjectKind::RemoteRxAudioStream => "remote_audio_rx",
            ObjectKind::RemoteTxAudioStream => "remote_audio_tx",
            ObjectKind::Transmit => "transmit",
            ObjectKind::Interlock => "interlock",
        }
    }

    /// Whether objects of this kind are identified by a stream handle that
    /// also appears as a VITA-49 stream id.
    pub fn carries_stream(&self) -> bool {
        matches!(
            self,
            ObjectKind::Panadapter
                | ObjectKind::Waterfall
                | ObjectKind::DaxRxAudioStream
                | ObjectKind::DaxMicAudioStream
                | ObjectKind::DaxIqStream
                | ObjectKind::RemoteRxAudioStream
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance identifier of a radio-side object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ObjectId {
    /// Decimal index, e.g. `slice 0`, `meter 12`.
    Index(u32),
    /// 32-bit handle written as `0x` hex, e.g. `display pan 0x40000000`.
    Handle(u32),
    /// Free-form name, e.g. `eq rxsc`.
    Name(String),
    /// Radio-wide object with no instance id, e.g. `transmit`.
    #[default]
    Singleton,
}

impl ObjectId {
    /// Parse a decimal index id.
    pub fn index(token: &str) -> Option<Self> {
        token.parse::<u32>().ok().map(ObjectId::Index)
    }

    /// Parse a hex handle id (`0x` prefix optional).
    pub fn handle(token: &str) -> Option<Self> {
        convert::parse_hex_u32(token).map(ObjectId::Handle)
    }

    /// Parse a name id. Empty names are rejected.
    pub fn name(token: &str) -> Option<Self> {
        if token.is_empty() {
            None
        } else {
            Some(ObjectId::Name(token.to_string()))
        }
    }

    /// The numeric value of an index or handle id.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ObjectId::Index(n) | ObjectId::Handle(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Index(n) => write!(f, "{n}"),
            ObjectId::Handle(h) => write!(f, "0x{h:08X}"),
            ObjectId::Name(s) => f.write_str(s),
            ObjectId::Singleton => Ok(()),
        }
    }
}

/// A kind/id pair naming one object in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: ObjectId) -> Self {
        ObjectRef { kind, id }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            ObjectId::Singleton => write!(f, "{}", self.kind),
            ref id => write!(f, "{} {}", self.kind, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_display_is_zero_padded_hex() {
        assert_eq!(ObjectId::Handle(0x4000_0000).to_string(), "0x40000000");
        assert_eq!(ObjectId::Handle(0x42).to_string(), "0x00000042");
    }

    #[test]
    fn index_display_is_decimal() {
        assert_eq!(ObjectId::Index(12).to_string(), "12");
    }

    #[test]
    fn parse_ids() {
        assert_eq!(ObjectId::index("3"), Some(ObjectId::Index(3)));
        assert_eq!(ObjectId::index("0x3"), None);
        assert_eq!(
            ObjectId::handle("0x40000001"),
            Some(ObjectId::Handle(0x4000_0001))
        );
        assert_eq!(ObjectId::handle("2000000A"), Some(ObjectId::Handle(0x2000_000A)));
        assert_eq!(ObjectId::name("rxsc"), Some(ObjectId::Name("rxsc".into())));
        assert_eq!(ObjectId::name(""), None);
    }

    #[test]
    fn object_ref_display() {
        let r = ObjectRef::new(ObjectKind::Panadapter, ObjectId::Handle(0x4000_0000));
        assert_eq!(r.to_string(), "panadapter 0x40000000");
        let t = ObjectRef::new(ObjectKind::Transmit, ObjectId::Singleton);
        assert_eq!(t.to_string(), "transmit");
    }

    #[test]
    fn stream_carrying_kinds() {
        assert!(ObjectKind::Panadapter.carries_stream());
        assert!(ObjectKind::DaxIqStream.carries_stream());
        assert!(!ObjectKind::Slice.carries_stream());
        assert!(!ObjectKind::DaxTxAudioStream.carries_stream());
    }
}
