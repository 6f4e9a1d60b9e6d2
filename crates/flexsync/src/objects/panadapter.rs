//! Panadapter (spectrum display).
//!
//! `display pan 0x40000000 center=14.100000 bandwidth=0.200000 ...`. The
//! handle doubles as the VITA-49 stream id of its spectrum data.

use flexsync_core::convert::{
    parse_bool, parse_f64, parse_handle, parse_i32, parse_mhz_as_hz, parse_u32,
};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum PanadapterToken {
        Center => "center",
        Bandwidth => "bandwidth",
        MinDbm => "min_dbm",
        MaxDbm => "max_dbm",
        Fps => "fps",
        Average => "average",
        WeightedAverage => "weighted_average",
        RfGain => "rfgain",
        RxAntenna => "rxant",
        Wide => "wide",
        LoopA => "loopa",
        LoopB => "loopb",
        Band => "band",
        DaxIqChannel => "daxiq_channel" | "daxiq",
        Waterfall => "waterfall",
        XPixels => "x_pixels",
        YPixels => "y_pixels",
        ClientHandle => "client_handle",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panadapter {
    pub id: ObjectId,
    pub center_hz: u64,
    pub bandwidth_hz: u64,
    pub min_dbm: Option<f64>,
    pub max_dbm: Option<f64>,
    pub fps: u32,
    pub average: u32,
    pub weighted_average: bool,
    pub rf_gain: i32,
    pub rx_antenna: String,
    pub wide: bool,
    pub loop_a: bool,
    pub loop_b: bool,
    pub band: String,
    pub daxiq_channel: u32,
    pub waterfall: u32,
    pub x_pixels: u32,
    pub y_pixels: u32,
    pub client_handle: u32,
}

impl RadioObject for Panadapter {
    const KIND: ObjectKind = ObjectKind::Panadapter;
    type Token = PanadapterToken;

    fn new(id: ObjectId) -> Self {
        Panadapter {
            id,
            center_hz: 0,
            bandwidth_hz: 0,
            min_dbm: None,
            max_dbm: None,
            fps: 0,
            average: 0,
            weighted_average: false,
            rf_gain: 0,
            rx_antenna: String::new(),
            wide: false,
            loop_a: false,
            loop_b: false,
            band: String::new(),
            daxiq_channel: 0,
            waterfall: 0,
            x_pixels: 0,
            y_pixels: 0,
            client_handle: 0,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<ObjectId> {
        ObjectId::handle(token)
    }

    fn apply(&mut self, token: PanadapterToken, value: &str) -> Result<bool> {
        use PanadapterToken::*;
        Ok(match token {
            Center => update(&mut self.center_hz, parse_mhz_as_hz(value)?),
            Bandwidth => update(&mut self.bandwidth_hz, parse_mhz_as_hz(value)?),
            MinDbm => update(&mut self.min_dbm, Some(parse_f64(value)?)),
            MaxDbm => update(&mut self.max_dbm, Some(parse_f64(value)?)),
            Fps => update(&mut self.fps, parse_u32(value)?),
            Average => update(&mut self.average, parse_u32(value)?),
            WeightedAverage => update(&mut self.weighted_average, parse_bool(value)?),
            RfGain => update(&mut self.rf_gain, parse_i32(value)?),
            RxAntenna => update(&mut self.rx_antenna, value.to_string()),
            Wide => update(&mut self.wide, parse_bool(value)?),
            LoopA => update(&mut self.loop_a, parse_bool(value)?),
            LoopB => update(&mut self.loop_b, parse_bool(value)?),
            Band => update(&mut self.band, value.to_string()),
            DaxIqChannel => update(&mut self.daxiq_channel, parse_u32(value)?),
            Waterfall => update(&mut self.waterfall, parse_handle(value)?),
            XPixels => update(&mut self.x_pixels, parse_u32(value)?),
            YPixels => update(&mut self.y_pixels, parse_u32(value)?),
            ClientHandle => update(&mut self.client_handle, parse_handle(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        self.center_hz != 0
            && self.bandwidth_hz != 0
            && self.min_dbm.is_some()
            && self.max_dbm.is_some()
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("display pan set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.panadapters()
    }
}
