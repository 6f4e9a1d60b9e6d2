//! VITA-49 datagram builders.
//!
//! Builds FlexRadio-shaped packets (28-byte header with class id and
//! timestamps) plus the payload layouts the engine decodes. Everything is
//! written big-endian, as on the wire.

/// FlexRadio OUI carried in the class id.
pub const FLEX_OUI: u32 = 0x001C2D;

/// Information class code FlexRadio puts in every packet.
pub const FLEX_INFO_CLASS: u16 = 0x534C;

pub const CLASS_METER: u16 = 0x8002;
pub const CLASS_PANADAPTER: u16 = 0x8003;
pub const CLASS_WATERFALL: u16 = 0x8004;
pub const CLASS_OPUS: u16 = 0x8005;
pub const CLASS_DAX_IQ_24K: u16 = 0x02E3;
pub const CLASS_DAX_IQ_48K: u16 = 0x02E4;
pub const CLASS_DAX_AUDIO: u16 = 0x03E3;
pub const CLASS_DAX_AUDIO_REDUCED: u16 = 0x0123;

/// Build a complete datagram with a 4-bit packet count.
///
/// The payload is zero-padded to a 32-bit boundary so the declared packet
/// size always matches the buffer.
pub fn packet(class_code: u16, stream_id: u32, count: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = payload.to_vec();
    while body.len() % 4 != 0 {
        body.push(0);
    }
    let size_words = ((28 + body.len()) / 4) as u32;

    let mut hw: u32 = 0x3 << 28; // extension data with stream id
    hw |= 1 << 27; // class id present
    hw |= 0x01 << 22; // TSI: UTC
    hw |= 0x01 << 20; // TSF: sample count
    hw |= (count as u32 & 0x0F) << 16;
    hw |= size_words & 0xFFFF;

    let mut pkt = Vec::with_capacity(28 + body.len());
    pkt.extend_from_slice(&hw.to_be_bytes());
    pkt.extend_from_slice(&stream_id.to_be_bytes());
    pkt.extend_from_slice(&(FLEX_OUI << 8).to_be_bytes());
    pkt.extend_from_slice(&(((FLEX_INFO_CLASS as u32) << 16) | class_code as u32).to_be_bytes());
    pkt.extend_from_slice(&0u32.to_be_bytes());
    pkt.extend_from_slice(&0u64.to_be_bytes());
    pkt.extend_from_slice(&body);
    pkt
}

/// Panadapter payload in the current layout.
pub fn panadapter_payload(start: u16, bins: &[u16], total: u16, frame: u32) -> Vec<u8> {
    let mut p = Vec::with_capacity(12 + bins.len() * 2);
    p.extend_from_slice(&start.to_be_bytes());
    p.extend_from_slice(&(bins.len() as u16).to_be_bytes());
    p.extend_from_slice(&2u16.to_be_bytes());
    p.extend_from_slice(&total.to_be_bytes());
    p.extend_from_slice(&frame.to_be_bytes());
    push_u16s(&mut p, bins);
    p
}

/// Panadapter payload in the legacy layout, where every packet is a whole
/// frame.
pub fn panadapter_payload_legacy(bins: &[u16], frame: u32) -> Vec<u8> {
    let mut p = Vec::with_capacity(16 + bins.len() * 2);
    p.extend_from_slice(&0u32.to_be_bytes());
    p.extend_from_slice(&(bins.len() as u32).to_be_bytes());
    p.extend_from_slice(&2u32.to_be_bytes());
    p.extend_from_slice(&frame.to_be_bytes());
    push_u16s(&mut p, bins);
    p
}

/// Fixed-point frequency fields shared by both waterfall layouts.
#[derive(Debug, Clone, Copy)]
pub struct WaterfallLine {
    pub first_bin_hz: f64,
    pub bin_bandwidth_hz: f64,
    pub line_duration_ms: u32,
    pub height: u16,
    pub timecode: u32,
    pub auto_black: u32,
}

impl Default for WaterfallLine {
    fn default() -> Self {
        WaterfallLine {
            first_bin_hz: 14_000_000.0,
            bin_bandwidth_hz: 100.0,
            line_duration_ms: 100,
            height: 1,
            timecode: 0,
            auto_black: 0,
        }
    }
}

fn waterfall_common(p: &mut Vec<u8>, line: &WaterfallLine, count: u16) {
    p.extend_from_slice(&to_fixed(line.first_bin_hz).to_be_bytes());
    p.extend_from_slice(&to_fixed(line.bin_bandwidth_hz).to_be_bytes());
    p.extend_from_slice(&line.line_duration_ms.to_be_bytes());
    p.extend_from_slice(&count.to_be_bytes());
    p.extend_from_slice(&line.height.to_be_bytes());
    p.extend_from_slice(&line.timecode.to_be_bytes());
    p.extend_from_slice(&line.auto_black.to_be_bytes());
}

/// Waterfall payload in the current layout.
pub fn waterfall_payload(line: &WaterfallLine, start: u16, bins: &[u16], total: u16) -> Vec<u8> {
    let mut p = Vec::with_capacity(36 + bins.len() * 2);
    waterfall_common(&mut p, line, bins.len() as u16);
    p.extend_from_slice(&total.to_be_bytes());
    p.extend_from_slice(&start.to_be_bytes());
    push_u16s(&mut p, bins);
    p
}

/// Waterfall payload in the legacy layout (one packet per line).
pub fn waterfall_payload_legacy(line: &WaterfallLine, bins: &[u16]) -> Vec<u8> {
    let mut p = Vec::with_capacity(32 + bins.len() * 2);
    waterfall_common(&mut p, line, bins.len() as u16);
    push_u16s(&mut p, bins);
    p
}

/// Meter payload of `(id, raw value)` pairs.
pub fn meter_payload(readings: &[(u16, i16)]) -> Vec<u8> {
    let mut p = Vec::with_capacity(readings.len() * 4);
    for &(id, value) in readings {
        p.extend_from_slice(&id.to_be_bytes());
        p.extend_from_slice(&value.to_be_bytes());
    }
    p
}

/// Big-endian float32 samples (DAX audio, IQ).
pub fn f32_payload(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

/// Big-endian int16 samples (reduced-bandwidth DAX audio).
pub fn i16_payload(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_be_bytes()).collect()
}

fn push_u16s(p: &mut Vec<u8>, values: &[u16]) {
    for v in values {
        p.extend_from_slice(&v.to_be_bytes());
    }
}

fn to_fixed(hz: f64) -> u64 {
    (hz * (1u64 << 20) as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_is_word_aligned_and_sized() {
        let pkt = packet(CLASS_METER, 0x0000_0700, 5, &[1, 2, 3]);
        assert_eq!(pkt.len(), 32);
        let hw = u32::from_be_bytes([pkt[0], pkt[1], pkt[2], pkt[3]]);
        assert_eq!(hw & 0xFFFF, 8);
        assert_eq!((hw >> 16) & 0x0F, 5);
        assert_eq!(&pkt[4..8], &0x0000_0700u32.to_be_bytes());
        assert_eq!(&pkt[14..16], &CLASS_METER.to_be_bytes());
    }

    #[test]
    fn panadapter_layout_sizes() {
        assert_eq!(panadapter_payload(0, &[1, 2], 2, 0).len(), 12 + 4);
        assert_eq!(panadapter_payload_legacy(&[1, 2], 0).len(), 16 + 4);
    }

    #[test]
    fn waterfall_layout_sizes() {
        let line = WaterfallLine::default();
        assert_eq!(waterfall_payload(&line, 0, &[1], 1).len(), 36 + 2);
        assert_eq!(waterfall_payload_legacy(&line, &[1]).len(), 32 + 2);
    }
}
