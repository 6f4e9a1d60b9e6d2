//! Radio-wide transmitter settings (`transmit ...`).

use flexsync_core::convert::{parse_bool, parse_i32, parse_mhz_as_hz, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum TransmitToken {
        Frequency => "freq",
        RfPower => "rfpower",
        TunePower => "tunepower",
        Tune => "tune",
        AmCarrierLevel => "am_carrier_level",
        MicLevel => "mic_level",
        MicSelection => "mic_selection",
        MicBoost => "mic_boost",
        MicBias => "mic_bias",
        Compander => "compander",
        CompanderLevel => "compander_level",
        VoxEnabled => "vox_enable",
        VoxLevel => "vox_level",
        VoxDelay => "vox_delay",
        SpeechProcessor => "speech_processor_enable",
        SpeechProcessorLevel => "speech_processor_level",
        FilterLow => "lo",
        FilterHigh => "hi",
        HardwareAlc => "hwalc_enabled",
        MaxPowerLevel => "max_power_level",
        Dax => "dax",
        Monitor => "sb_monitor",
        MonitorGain => "mon_gain_sb",
        Inhibit => "inhibit",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transmit {
    pub id: ObjectId,
    pub frequency_hz: u64,
    pub rf_power: u32,
    pub tune_power: u32,
    pub tune: bool,
    pub am_carrier_level: u32,
    pub mic_level: u32,
    pub mic_selection: String,
    pub mic_boost: bool,
    pub mic_bias: bool,
    pub compander: bool,
    pub compander_level: u32,
    pub vox_enabled: bool,
    pub vox_level: u32,
    pub vox_delay: u32,
    pub speech_processor: bool,
    pub speech_processor_level: u32,
    pub filter_lo: i32,
    pub filter_hi: i32,
    pub hardware_alc: bool,
    pub max_power_level: u32,
    pub dax: bool,
    pub monitor: bool,
    pub monitor_gain: u32,
    pub inhibit: bool,
}

impl RadioObject for Transmit {
    const KIND: ObjectKind = ObjectKind::Transmit;
    type Token = TransmitToken;

    fn new(id: ObjectId) -> Self {
        Transmit {
            id,
            frequency_hz: 0,
            rf_power: 0,
            tune_power: 0,
            tune: false,
            am_carrier_level: 0,
            mic_level: 0,
            mic_selection: String::new(),
            mic_boost: false,
            mic_bias: false,
            compander: false,
            compander_level: 0,
            vox_enabled: false,
            vox_level: 0,
            vox_delay: 0,
            speech_processor: false,
            speech_processor_level: 0,
            filter_lo: 0,
            filter_hi: 0,
            hardware_alc: false,
            max_power_level: 0,
            dax: false,
            monitor: false,
            monitor_gain: 0,
            inhibit: false,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(_token: &str) -> Option<ObjectId> {
        Some(ObjectId::Singleton)
    }

    fn apply(&mut self, token: TransmitToken, value: &str) -> Result<bool> {
        use TransmitToken::*;
        Ok(match token {
            Frequency => update(&mut self.frequency_hz, parse_mhz_as_hz(value)?),
            RfPower => update(&mut self.rf_power, parse_u32(value)?),
            TunePower => update(&mut self.tune_power, parse_u32(value)?),
            Tune => update(&mut self.tune, parse_bool(value)?),
            AmCarrierLevel => update(&mut self.am_carrier_level, parse_u32(value)?),
            MicLevel => update(&mut self.mic_level, parse_u32(value)?),
            MicSelection => update(&mut self.mic_selection, value.to_string()),
            MicBoost => update(&mut self.mic_boost, parse_bool(value)?),
            MicBias => update(&mut self.mic_bias, parse_bool(value)?),
            Compander => update(&mut self.compander, parse_bool(value)?),
            CompanderLevel => update(&mut self.compander_level, parse_u32(value)?),
            VoxEnabled => update(&mut self.vox_enabled, parse_bool(value)?),
            VoxLevel => update(&mut self.vox_level, parse_u32(value)?),
            VoxDelay => update(&mut self.vox_delay, parse_u32(value)?),
            SpeechProcessor => update(&mut self.speech_processor, parse_bool(value)?),
            SpeechProcessorLevel => update(&mut self.speech_processor_level, parse_u32(value)?),
            FilterLow => update(&mut self.filter_lo, parse_i32(value)?),
            FilterHigh => update(&mut self.filter_hi, parse_i32(value)?),
            HardwareAlc => update(&mut self.hardware_alc, parse_bool(value)?),
            MaxPowerLevel => update(&mut self.max_power_level, parse_u32(value)?),
            Dax => update(&mut self.dax, parse_bool(value)?),
            Monitor => update(&mut self.monitor, parse_bool(value)?),
            MonitorGain => update(&mut self.monitor_gain, parse_u32(value)?),
            Inhibit => update(&mut self.inhibit, parse_bool(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn command_prefix(_id: &ObjectId) -> Option<String> {
        Some("transmit set".to_string())
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.transmit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_ready_immediately() {
        let mut t = Transmit::new(ObjectId::Singleton);
        assert!(t.is_ready());
        assert!(t.apply(TransmitToken::RfPower, "75").unwrap());
        assert_eq!(
            Transmit::set_command(&ObjectId::Singleton, TransmitToken::RfPower, "50").as_deref(),
            Some("transmit set rfpower=50")
        );
    }
}
