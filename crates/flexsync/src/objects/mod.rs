//! Radio-side object kinds.
//!
//! Each kind is a plain struct of typed fields plus a token enum naming the
//! status keys it understands. The [`RadioObject`] trait is the only seam
//! the registry needs: construct with defaults, apply one token, report
//! readiness. Change detection happens in [`update`], so every setter
//! writes and signals only when the value differs.

use std::fmt;

use flexsync_core::{ObjectId, ObjectKind, Result};

use crate::registry::{ObjectStore, Registry};

pub mod amplifier;
pub mod equalizer;
pub mod interlock;
pub mod memory;
pub mod meter;
pub mod panadapter;
pub mod slice;
pub mod streams;
pub mod tnf;
pub mod transmit;
pub mod waterfall;
pub mod xvtr;

pub use amplifier::Amplifier;
pub use equalizer::Equalizer;
pub use interlock::Interlock;
pub use memory::Memory;
pub use meter::{Meter, MeterUnit};
pub use panadapter::Panadapter;
pub use slice::Slice;
pub use streams::{
    DaxIqStream, DaxMicAudioStream, DaxRxAudioStream, DaxTxAudioStream, RemoteRxAudioStream,
    RemoteTxAudioStream,
};
pub use tnf::Tnf;
pub use transmit::Transmit;
pub use waterfall::Waterfall;
pub use xvtr::Xvtr;

/// A status key understood by one object kind.
pub trait StatusToken: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Look up a token by its wire spelling.
    fn parse(token: &str) -> Option<Self>;

    /// Canonical wire spelling.
    fn as_str(&self) -> &'static str;
}

/// Who decides that an object is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPolicy {
    /// Evicted when the radio sends a removal status line.
    RadioConfirmed,
    /// The radio never confirms removal; the client evicts the object as
    /// soon as it asks for removal.
    ClientAsserted,
}

/// One kind of radio-side object.
pub trait RadioObject: Send + Sync + Sized + 'static {
    const KIND: ObjectKind;
    const REMOVAL: RemovalPolicy = RemovalPolicy::RadioConfirmed;

    type Token: StatusToken;

    /// Construct with default field values.
    fn new(id: ObjectId) -> Self;

    fn id(&self) -> &ObjectId;

    /// Parse the instance id as it appears in status lines.
    fn parse_id(token: &str) -> Option<ObjectId> {
        ObjectId::index(token)
    }

    /// Apply one status field. Returns whether the stored value changed.
    fn apply(&mut self, token: Self::Token, value: &str) -> Result<bool>;

    /// Whether enough fields are populated for the object to be usable.
    fn is_ready(&self) -> bool;

    /// Command prefix for setting properties, e.g. `slice set 0`.
    /// `None` for kinds the client cannot modify.
    fn command_prefix(id: &ObjectId) -> Option<String>;

    /// Full set command for one property.
    fn set_command(id: &ObjectId, token: Self::Token, value: &str) -> Option<String> {
        Self::command_prefix(id).map(|prefix| format!("{prefix} {}={value}", token.as_str()))
    }

    /// This kind's store within a registry.
    fn store(registry: &Registry) -> &ObjectStore<Self>;
}

/// Write `value` into `field` if it differs. Returns whether it changed.
pub fn update<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

/// Declare a token enum with its wire spellings.
///
/// ```ignore
/// status_tokens! {
///     pub enum SliceToken {
///         Frequency => "RF_frequency",
///         Mode => "mode",
///     }
/// }
/// ```
///
/// Extra spellings can follow the canonical one: `Dax => "dax_channel" | "dax"`.
macro_rules! status_tokens {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::objects::StatusToken for $name {
            fn parse(token: &str) -> Option<Self> {
                match token {
                    $($text $(| $alias)* => Some($name::$variant),)+
                    _ => None,
                }
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

pub(crate) use status_tokens;

#[cfg(test)]
mod tests {
    use super::*;

    status_tokens! {
        enum Sample {
            One => "one",
            Two => "two" | "deux",
        }
    }

    #[test]
    fn token_lookup_and_aliases() {
        assert_eq!(Sample::parse("one"), Some(Sample::One));
        assert_eq!(Sample::parse("deux"), Some(Sample::Two));
        assert_eq!(Sample::parse("three"), None);
        assert_eq!(Sample::Two.as_str(), "two");
    }

    #[test]
    fn update_reports_change() {
        let mut v = 5;
        assert!(!update(&mut v, 5));
        assert!(update(&mut v, 6));
        assert_eq!(v, 6);
    }
}
