//! Tracking notch filters.

use flexsync_core::convert::{parse_bool, parse_mhz_as_hz, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum TnfToken {
        Frequency => "freq",
        Depth => "depth",
        Width => "width",
        Permanent => "permanent",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tnf {
    pub id: ObjectId,
    pub frequency_hz: u64,
    pub depth: u32,
    pub width_hz: u64,
    pub permanent: bool,
}

impl RadioObject for Tnf {
    const KIND: ObjectKind = ObjectKind::Tnf;
    type Token = TnfToken;

    fn new(id: ObjectId) -> Self {
        Tnf {
            id,
            frequency_hz: 0,
            depth: 0,
            width_hz: 0,
            permanent: false,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn apply(&mut self, token: TnfToken, value: &str) -> Result<bool> {
        Ok(match token {
            TnfToken::Frequency => update(&mut self.frequency_hz, parse_mhz_as_hz(value)?),
            TnfToken::Depth => update(&mut self.depth, parse_u32(value)?),
            TnfToken::Width => update(&mut self.width_hz, parse_mhz_as_hz(value)?),
            TnfToken::Permanent => update(&mut self.permanent, parse_bool(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        self.frequency_hz != 0
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("tnf set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.tnfs()
    }
}
