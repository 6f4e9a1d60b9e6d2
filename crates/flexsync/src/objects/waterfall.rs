//! Waterfall display paired with a panadapter.

use flexsync_core::convert::{parse_bool, parse_handle, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum WaterfallToken {
        Panadapter => "panadapter",
        LineDuration => "line_duration",
        BlackLevel => "black_level",
        ColorGain => "color_gain",
        AutoBlack => "auto_black",
        GradientIndex => "gradient_index",
        ClientHandle => "client_handle",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waterfall {
    pub id: ObjectId,
    /// Handle of the paired panadapter.
    pub panadapter: u32,
    pub line_duration_ms: u32,
    pub black_level: u32,
    pub color_gain: u32,
    pub auto_black: bool,
    pub gradient_index: u32,
    pub client_handle: u32,
}

impl RadioObject for Waterfall {
    const KIND: ObjectKind = ObjectKind::Waterfall;
    type Token = WaterfallToken;

    fn new(id: ObjectId) -> Self {
        Waterfall {
            id,
            panadapter: 0,
            line_duration_ms: 0,
            black_level: 0,
            color_gain: 0,
            auto_black: false,
            gradient_index: 0,
            client_handle: 0,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<ObjectId> {
        ObjectId::handle(token)
    }

    fn apply(&mut self, token: WaterfallToken, value: &str) -> Result<bool> {
        use WaterfallToken::*;
        Ok(match token {
            Panadapter => update(&mut self.panadapter, parse_handle(value)?),
            LineDuration => update(&mut self.line_duration_ms, parse_u32(value)?),
            BlackLevel => update(&mut self.black_level, parse_u32(value)?),
            ColorGain => update(&mut self.color_gain, parse_u32(value)?),
            AutoBlack => update(&mut self.auto_black, parse_bool(value)?),
            GradientIndex => update(&mut self.gradient_index, parse_u32(value)?),
            ClientHandle => update(&mut self.client_handle, parse_handle(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        self.panadapter != 0
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("display panafall set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.waterfalls()
    }
}
