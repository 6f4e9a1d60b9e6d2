//! Stored memory channels.

use flexsync_core::convert::{parse_bool, parse_i32, parse_mhz_as_hz, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum MemoryToken {
        Owner => "owner",
        Group => "group",
        Frequency => "freq",
        Name => "name",
        Mode => "mode",
        Step => "step",
        OffsetDirection => "repeater",
        RepeaterOffset => "repeater_offset",
        ToneMode => "tone_mode",
        ToneValue => "tone_value",
        Squelch => "squelch",
        SquelchLevel => "squelch_level",
        FilterLow => "rx_filter_low",
        FilterHigh => "rx_filter_high",
        RttyMark => "rtty_mark",
        RttyShift => "rtty_shift",
        DiglOffset => "digl_offset",
        DiguOffset => "digu_offset",
        Highlight => "highlight",
        HighlightColor => "highlight_color",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub id: ObjectId,
    pub owner: String,
    pub group: String,
    pub frequency_hz: u64,
    pub name: String,
    pub mode: String,
    pub step_hz: u32,
    pub offset_direction: String,
    pub repeater_offset_hz: u64,
    pub tone_mode: String,
    pub tone_value: String,
    pub squelch: bool,
    pub squelch_level: u32,
    pub filter_lo: i32,
    pub filter_hi: i32,
    pub rtty_mark: i32,
    pub rtty_shift: i32,
    pub digl_offset: i32,
    pub digu_offset: i32,
    pub highlight: bool,
    pub highlight_color: String,
}

impl RadioObject for Memory {
    const KIND: ObjectKind = ObjectKind::Memory;
    type Token = MemoryToken;

    fn new(id: ObjectId) -> Self {
        Memory {
            id,
            owner: String::new(),
            group: String::new(),
            frequency_hz: 0,
            name: String::new(),
            mode: String::new(),
            step_hz: 0,
            offset_direction: String::new(),
            repeater_offset_hz: 0,
            tone_mode: String::new(),
            tone_value: String::new(),
            squelch: false,
            squelch_level: 0,
            filter_lo: 0,
            filter_hi: 0,
            rtty_mark: 0,
            rtty_shift: 0,
            digl_offset: 0,
            digu_offset: 0,
            highlight: false,
            highlight_color: String::new(),
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn apply(&mut self, token: MemoryToken, value: &str) -> Result<bool> {
        use MemoryToken::*;
        Ok(match token {
            Owner => update(&mut self.owner, value.to_string()),
            Group => update(&mut self.group, value.to_string()),
            Frequency => update(&mut self.frequency_hz, parse_mhz_as_hz(value)?),
            Name => update(&mut self.name, value.to_string()),
            Mode => update(&mut self.mode, value.to_string()),
            Step => update(&mut self.step_hz, parse_u32(value)?),
            OffsetDirection => update(&mut self.offset_direction, value.to_string()),
            RepeaterOffset => update(&mut self.repeater_offset_hz, parse_mhz_as_hz(value)?),
            ToneMode => update(&mut self.tone_mode, value.to_string()),
            ToneValue => update(&mut self.tone_value, value.to_string()),
            Squelch => update(&mut self.squelch, parse_bool(value)?),
            SquelchLevel => update(&mut self.squelch_level, parse_u32(value)?),
            FilterLow => update(&mut self.filter_lo, parse_i32(value)?),
            FilterHigh => update(&mut self.filter_hi, parse_i32(value)?),
            RttyMark => update(&mut self.rtty_mark, parse_i32(value)?),
            RttyShift => update(&mut self.rtty_shift, parse_i32(value)?),
            DiglOffset => update(&mut self.digl_offset, parse_i32(value)?),
            DiguOffset => update(&mut self.digu_offset, parse_i32(value)?),
            Highlight => update(&mut self.highlight, parse_bool(value)?),
            HighlightColor => update(&mut self.highlight_color, value.to_string()),
        })
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("memory set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.memories()
    }
}
