//! Eight-band graphic equalizers (`eq rxsc`, `eq txsc`).

use flexsync_core::convert::{parse_bool, parse_i32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

/// Band centre frequencies in Hz, in token order.
pub const EQ_BANDS_HZ: [u32; 8] = [63, 125, 250, 500, 1000, 2000, 4000, 8000];

status_tokens! {
    pub enum EqualizerToken {
        Enabled => "mode",
        Band63 => "63Hz" | "63hz",
        Band125 => "125Hz" | "125hz",
        Band250 => "250Hz" | "250hz",
        Band500 => "500Hz" | "500hz",
        Band1000 => "1000Hz" | "1000hz",
        Band2000 => "2000Hz" | "2000hz",
        Band4000 => "4000Hz" | "4000hz",
        Band8000 => "8000Hz" | "8000hz",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equalizer {
    pub id: ObjectId,
    pub enabled: bool,
    /// Per-band levels, indexed like [`EQ_BANDS_HZ`].
    pub levels: [i32; 8],
}

impl RadioObject for Equalizer {
    const KIND: ObjectKind = ObjectKind::Equalizer;
    type Token = EqualizerToken;

    fn new(id: ObjectId) -> Self {
        Equalizer {
            id,
            enabled: false,
            levels: [0; 8],
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<ObjectId> {
        ObjectId::name(token)
    }

    fn apply(&mut self, token: EqualizerToken, value: &str) -> Result<bool> {
        use EqualizerToken::*;
        let band = match token {
            Enabled => return Ok(update(&mut self.enabled, parse_bool(value)?)),
            Band63 => 0,
            Band125 => 1,
            Band250 => 2,
            Band500 => 3,
            Band1000 => 4,
            Band2000 => 5,
            Band4000 => 6,
            Band8000 => 7,
        };
        Ok(update(&mut self.levels[band], parse_i32(value)?))
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("eq {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.equalizers()
    }
}
