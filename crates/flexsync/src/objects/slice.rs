//! Receiver slice.
//!
//! A slice is one demodulator tuned within a panadapter. Status lines look
//! like `slice 0 pan=0x40000000 RF_frequency=14.250000 mode=USB ...` and the
//! radio removes a slice with `in_use=0`.

use flexsync_core::convert::{
    format_mhz, parse_bool, parse_handle, parse_i32, parse_mhz_as_hz, parse_u32,
};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, StatusToken, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum SliceToken {
        InUse => "in_use",
        Panadapter => "pan",
        Frequency => "RF_frequency",
        Mode => "mode",
        FilterLow => "filter_lo",
        FilterHigh => "filter_hi",
        RxAntenna => "rxant",
        TxAntenna => "txant",
        AudioLevel => "audio_level" | "audio_gain",
        AudioPan => "audio_pan",
        AudioMute => "audio_mute",
        Active => "active",
        Transmit => "tx",
        DaxChannel => "dax",
        RitOn => "rit_on",
        RitFrequency => "rit_freq",
        XitOn => "xit_on",
        XitFrequency => "xit_freq",
        AgcMode => "agc_mode",
        AgcThreshold => "agc_threshold",
        NoiseReduction => "nr",
        NoiseBlanker => "nb",
        AutoNotch => "anf",
        Step => "step",
        Lock => "lock",
        ClientHandle => "client_handle",
        IndexLetter => "index_letter",
        Wide => "wide",
        Diversity => "diversity",
    }
}

/// One receiver slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub id: ObjectId,
    pub panadapter: u32,
    pub frequency_hz: u64,
    pub mode: String,
    pub filter_lo: i32,
    pub filter_hi: i32,
    pub rx_antenna: String,
    pub tx_antenna: String,
    pub audio_level: u32,
    pub audio_pan: u32,
    pub audio_mute: bool,
    pub active: bool,
    pub transmit: bool,
    pub dax_channel: u32,
    pub rit_on: bool,
    pub rit_hz: i32,
    pub xit_on: bool,
    pub xit_hz: i32,
    pub agc_mode: String,
    pub agc_threshold: u32,
    pub noise_reduction: bool,
    pub noise_blanker: bool,
    pub auto_notch: bool,
    pub step_hz: u32,
    pub locked: bool,
    pub client_handle: u32,
    pub letter: String,
    pub wide: bool,
    pub diversity: bool,
}

impl RadioObject for Slice {
    const KIND: ObjectKind = ObjectKind::Slice;
    type Token = SliceToken;

    fn new(id: ObjectId) -> Self {
        Slice {
            id,
            panadapter: 0,
            frequency_hz: 0,
            mode: String::new(),
            filter_lo: 0,
            filter_hi: 0,
            rx_antenna: String::new(),
            tx_antenna: String::new(),
            audio_level: 0,
            audio_pan: 50,
            audio_mute: false,
            active: false,
            transmit: false,
            dax_channel: 0,
            rit_on: false,
            rit_hz: 0,
            xit_on: false,
            xit_hz: 0,
            agc_mode: String::new(),
            agc_threshold: 0,
            noise_reduction: false,
            noise_blanker: false,
            auto_notch: false,
            step_hz: 0,
            locked: false,
            client_handle: 0,
            letter: String::new(),
            wide: false,
            diversity: false,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn apply(&mut self, token: SliceToken, value: &str) -> Result<bool> {
        use SliceToken::*;
        Ok(match token {
            // Removal is decided by the router; the flag itself is not stored.
            InUse => false,
            Panadapter => update(&mut self.panadapter, parse_handle(value)?),
            Frequency => update(&mut self.frequency_hz, parse_mhz_as_hz(value)?),
            Mode => update(&mut self.mode, value.to_string()),
            FilterLow => update(&mut self.filter_lo, parse_i32(value)?),
            FilterHigh => update(&mut self.filter_hi, parse_i32(value)?),
            RxAntenna => update(&mut self.rx_antenna, value.to_string()),
            TxAntenna => update(&mut self.tx_antenna, value.to_string()),
            AudioLevel => update(&mut self.audio_level, parse_u32(value)?),
            AudioPan => update(&mut self.audio_pan, parse_u32(value)?),
            AudioMute => update(&mut self.audio_mute, parse_bool(value)?),
            Active => update(&mut self.active, parse_bool(value)?),
            Transmit => update(&mut self.transmit, parse_bool(value)?),
            DaxChannel => update(&mut self.dax_channel, parse_u32(value)?),
            RitOn => update(&mut self.rit_on, parse_bool(value)?),
            RitFrequency => update(&mut self.rit_hz, parse_i32(value)?),
            XitOn => update(&mut self.xit_on, parse_bool(value)?),
            XitFrequency => update(&mut self.xit_hz, parse_i32(value)?),
            AgcMode => update(&mut self.agc_mode, value.to_string()),
            AgcThreshold => update(&mut self.agc_threshold, parse_u32(value)?),
            NoiseReduction => update(&mut self.noise_reduction, parse_bool(value)?),
            NoiseBlanker => update(&mut self.noise_blanker, parse_bool(value)?),
            AutoNotch => update(&mut self.auto_notch, parse_bool(value)?),
            Step => update(&mut self.step_hz, parse_u32(value)?),
            Lock => update(&mut self.locked, parse_bool(value)?),
            ClientHandle => update(&mut self.client_handle, parse_handle(value)?),
            IndexLetter => update(&mut self.letter, value.to_string()),
            Wide => update(&mut self.wide, parse_bool(value)?),
            Diversity => update(&mut self.diversity, parse_bool(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        self.panadapter != 0 && self.frequency_hz != 0 && !self.mode.is_empty()
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("slice set {id}"))
    }

    /// Frequency changes go through `slice tune`, everything else through
    /// `slice set`.
    fn set_command(id: &ObjectId, token: SliceToken, value: &str) -> Option<String> {
        match token {
            SliceToken::Frequency => {
                let hz = parse_mhz_as_hz(value).ok()?;
                Some(format!("slice tune {id} {}", format_mhz(hz)))
            }
            SliceToken::InUse => None,
            other => Some(format!("slice set {id} {}={value}", other.as_str())),
        }
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.slices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_needs_pan_frequency_and_mode() {
        let mut s = Slice::new(ObjectId::Index(0));
        assert!(!s.is_ready());
        s.apply(SliceToken::Mode, "USB").unwrap();
        s.apply(SliceToken::Frequency, "14.250000").unwrap();
        assert!(!s.is_ready());
        s.apply(SliceToken::Panadapter, "0x40000000").unwrap();
        assert!(s.is_ready());
        assert_eq!(s.frequency_hz, 14_250_000);
        assert_eq!(s.panadapter, 0x4000_0000);
    }

    #[test]
    fn setters_report_change_only_once() {
        let mut s = Slice::new(ObjectId::Index(0));
        assert!(s.apply(SliceToken::FilterLow, "-2800").unwrap());
        assert!(!s.apply(SliceToken::FilterLow, "-2800").unwrap());
        assert!(s.apply(SliceToken::Lock, "1").unwrap());
        assert!(!s.apply(SliceToken::InUse, "1").unwrap());
    }

    #[test]
    fn bad_values_are_errors() {
        let mut s = Slice::new(ObjectId::Index(0));
        assert!(s.apply(SliceToken::Frequency, "abc").is_err());
        assert!(s.apply(SliceToken::Panadapter, "nothex").is_err());
        assert_eq!(s.frequency_hz, 0);
    }

    #[test]
    fn set_commands() {
        let id = ObjectId::Index(1);
        assert_eq!(
            Slice::set_command(&id, SliceToken::Frequency, "14.074").as_deref(),
            Some("slice tune 1 14.074000")
        );
        assert_eq!(
            Slice::set_command(&id, SliceToken::Mode, "CW").as_deref(),
            Some("slice set 1 mode=CW")
        );
        assert_eq!(Slice::set_command(&id, SliceToken::InUse, "0"), None);
    }
}
