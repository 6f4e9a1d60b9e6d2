//! Transverter definitions.

use flexsync_core::convert::{parse_bool, parse_f64, parse_i32, parse_mhz_as_hz, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum XvtrToken {
        Name => "name",
        RfFrequency => "rf_freq",
        IfFrequency => "if_freq",
        LoError => "lo_error",
        RxGain => "rx_gain",
        MaxPower => "max_power",
        RxOnly => "rx_only",
        Order => "order",
        Valid => "is_valid",
        Preferred => "preferred",
        TwoMeterInt => "two_meter_int",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Xvtr {
    pub id: ObjectId,
    pub name: String,
    pub rf_frequency_hz: u64,
    pub if_frequency_hz: u64,
    pub lo_error_hz: i32,
    pub rx_gain: f64,
    pub max_power: f64,
    pub rx_only: bool,
    pub order: u32,
    pub valid: bool,
    pub preferred: bool,
    pub two_meter_int: u32,
}

impl RadioObject for Xvtr {
    const KIND: ObjectKind = ObjectKind::Xvtr;
    type Token = XvtrToken;

    fn new(id: ObjectId) -> Self {
        Xvtr {
            id,
            name: String::new(),
            rf_frequency_hz: 0,
            if_frequency_hz: 0,
            lo_error_hz: 0,
            rx_gain: 0.0,
            max_power: 0.0,
            rx_only: false,
            order: 0,
            valid: false,
            preferred: false,
            two_meter_int: 0,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn apply(&mut self, token: XvtrToken, value: &str) -> Result<bool> {
        use XvtrToken::*;
        Ok(match token {
            Name => update(&mut self.name, value.to_string()),
            RfFrequency => update(&mut self.rf_frequency_hz, parse_mhz_as_hz(value)?),
            IfFrequency => update(&mut self.if_frequency_hz, parse_mhz_as_hz(value)?),
            LoError => update(&mut self.lo_error_hz, parse_i32(value)?),
            RxGain => update(&mut self.rx_gain, parse_f64(value)?),
            MaxPower => update(&mut self.max_power, parse_f64(value)?),
            RxOnly => update(&mut self.rx_only, parse_bool(value)?),
            Order => update(&mut self.order, parse_u32(value)?),
            Valid => update(&mut self.valid, parse_bool(value)?),
            Preferred => update(&mut self.preferred, parse_bool(value)?),
            TwoMeterInt => update(&mut self.two_meter_int, parse_u32(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        !self.name.is_empty()
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("xvtr set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.xvtrs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_once_named() {
        let mut x = Xvtr::new(ObjectId::Index(0));
        x.apply(XvtrToken::RfFrequency, "144.000000").unwrap();
        assert!(!x.is_ready());
        x.apply(XvtrToken::Name, "2m").unwrap();
        assert!(x.is_ready());
        assert_eq!(x.rf_frequency_hz, 144_000_000);
    }
}
