//! VITA-49.0 wire codec for FlexRadio SmartSDR.
//!
//! SmartSDR radios send every real-time stream as VITA-49.0 extension data
//! packets to the client's UDP port (4991 by default). This module decodes
//! the fixed 28-byte packet header and the per-class payload headers. It
//! performs no I/O and keeps no state.
//!
//! Payload headers for spectrum and waterfall streams come in two layouts
//! selected by the caller from the negotiated firmware version; see
//! [`PayloadLayout`].

use bytes::{Buf, Bytes};

use flexsync_core::{Error, Result};

/// Bytes before the payload: header word, stream id, class id, timestamps.
pub const HEADER_SIZE: usize = 28;

/// OUI carried in the class id of every SmartSDR packet.
pub const FLEXRADIO_OUI: u32 = 0x001C2D;

/// What a packet carries, from its packet class code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Packed meter readings, 0x8002.
    MeterData,
    /// Spectrum bins, 0x8003.
    Panadapter,
    /// Waterfall tiles, 0x8004.
    Waterfall,
    /// Opus-compressed remote audio, 0x8005.
    OpusAudio,
    /// DAX IQ, class codes 0x02E3..=0x02E6. Carries the sample rate in Hz.
    DaxIq(u32),
    /// DAX audio, float32 stereo, 0x03E3.
    DaxAudio,
    /// DAX audio, int16 mono, 0x0123.
    DaxAudioReduced,
    /// Radio discovery beacon, 0xFFFF. Not decoded further.
    Discovery,
    /// Anything else.
    Unknown(u16),
}

/// Map a packet class code onto a [`StreamType`].
pub fn stream_type_from_class_code(code: u16) -> StreamType {
    match code {
        0x8002 => StreamType::MeterData,
        0x8003 => StreamType::Panadapter,
        0x8004 => StreamType::Waterfall,
        0x8005 => StreamType::OpusAudio,
        0x02E3 => StreamType::DaxIq(24_000),
        0x02E4 => StreamType::DaxIq(48_000),
        0x02E5 => StreamType::DaxIq(96_000),
        0x02E6 => StreamType::DaxIq(192_000),
        0x03E3 => StreamType::DaxAudio,
        0x0123 => StreamType::DaxAudioReduced,
        0xFFFF => StreamType::Discovery,
        other => StreamType::Unknown(other),
    }
}

/// The fixed packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitaHeader {
    /// Bits 31-28 of the header word; 3 for extension data with a stream id.
    pub packet_type: u8,
    /// Bit 27.
    pub class_id_present: bool,
    /// Bit 26. A trailer word is excluded from the payload.
    pub trailer_present: bool,
    /// 4-bit rolling packet counter (bits 19-16).
    pub packet_count: u8,
    /// Total packet size in 32-bit words, including header (bits 15-0).
    pub packet_size_words: u16,
    /// Which stream the packet belongs to.
    pub stream_id: u32,
    /// Organization id from the class id.
    pub class_oui: u32,
    /// Information Class Code (upper 16 bits at offset 12).
    pub info_class_code: u16,
    /// Low half of the second class id word; selects the payload format.
    pub packet_class_code: u16,
    /// Decoded form of `packet_class_code`.
    pub stream_type: StreamType,
    /// Integer seconds.
    pub timestamp_int: u32,
    /// Fractional timestamp.
    pub timestamp_frac: u64,
}

/// A decoded VITA-49 packet: header plus its payload.
///
/// The payload shares the datagram's buffer, so handing a packet to a
/// stream lane never copies sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct VitaPacket {
    pub header: VitaHeader,
    pub payload: Bytes,
}

impl VitaPacket {
    pub fn stream_id(&self) -> u32 {
        self.header.stream_id
    }

    pub fn sequence(&self) -> u8 {
        self.header.packet_count
    }
}

/// Parse a VITA-49 packet from a raw UDP datagram.
///
/// The buffer must contain at least [`HEADER_SIZE`] bytes and the declared
/// `packet_size_words` must not exceed it. Bytes beyond the declared size
/// are ignored, as is the trailer word when present.
pub fn parse_packet(data: Bytes) -> Result<VitaPacket> {
    if data.len() < HEADER_SIZE {
        return Err(Error::Protocol(format!(
            "datagram of {} bytes is shorter than the {HEADER_SIZE}-byte VITA-49 header",
            data.len()
        )));
    }

    let mut buf = &data[..HEADER_SIZE];

    // Word 0: type, flags, count, size.
    let header_word = buf.get_u32();
    let packet_type = ((header_word >> 28) & 0x0F) as u8;
    let class_id_present = (header_word >> 27) & 1 == 1;
    let trailer_present = (header_word >> 26) & 1 == 1;
    let packet_count = ((header_word >> 16) & 0x0F) as u8;
    let packet_size_words = (header_word & 0xFFFF) as u16;

    let packet_size_bytes = packet_size_words as usize * 4;
    if packet_size_bytes > data.len() {
        return Err(Error::Protocol(format!(
            "VITA-49 size field says {packet_size_bytes} bytes but the datagram holds {}",
            data.len()
        )));
    }
    let trailer_len = if trailer_present { 4 } else { 0 };
    if packet_size_bytes < HEADER_SIZE + trailer_len {
        return Err(Error::Protocol(format!(
            "VITA-49 packet_size ({packet_size_words} words) smaller than its header"
        )));
    }

    let stream_id = buf.get_u32();

    // Class id: OUI, then info class and packet class.
    let class_oui = (buf.get_u32() >> 8) & 0x00FF_FFFF;
    if class_oui != FLEXRADIO_OUI {
        tracing::trace!(
            oui = class_oui,
            expected = FLEXRADIO_OUI,
            "Foreign OUI in VITA-49 class id"
        );
    }

    let info_class_code = buf.get_u16();
    let packet_class_code = buf.get_u16();

    let timestamp_int = buf.get_u32();
    let timestamp_frac = buf.get_u64();

    let header = VitaHeader {
        packet_type,
        class_id_present,
        trailer_present,
        packet_count,
        packet_size_words,
        stream_id,
        class_oui,
        info_class_code,
        packet_class_code,
        stream_type: stream_type_from_class_code(packet_class_code),
        timestamp_int,
        timestamp_frac,
    };

    let payload = data.slice(HEADER_SIZE..packet_size_bytes - trailer_len);

    Ok(VitaPacket { header, payload })
}

// ---------------------------------------------------------------------------
// Payload headers
// ---------------------------------------------------------------------------

/// Which payload-header layout the radio speaks.
///
/// Firmware before v2 sends 32-bit panadapter fields and no frame totals;
/// newer firmware sends 16-bit fields plus total/start counts so a frame
/// can span several packets. The engine never picks this itself; it comes
/// from the session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadLayout {
    Legacy,
    #[default]
    Current,
}

/// Position of one packet's units within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Index of the first unit carried by this packet.
    pub start: u32,
    /// Number of units carried by this packet.
    pub count: u32,
    /// Units in the complete frame.
    pub total: u32,
    /// Frame index (panadapter) or timecode (waterfall).
    pub frame: u32,
}

/// Decoded panadapter payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanadapterHeader {
    pub segment: Segment,
    /// Bytes per bin. Always 2 in practice.
    pub bin_size: u32,
}

/// Decoded waterfall payload header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallHeader {
    pub segment: Segment,
    /// Frequency of the first bin in Hz.
    pub first_bin_hz: f64,
    /// Width of one bin in Hz.
    pub bin_bandwidth_hz: f64,
    /// Line duration in milliseconds.
    pub line_duration_ms: u32,
    /// Line height in pixels.
    pub height: u16,
    /// Auto-black level computed by the radio.
    pub auto_black: u32,
}

/// Waterfall frequencies are 64-bit fixed point with 20 fractional bits.
fn fixed_to_hz(raw: u64) -> f64 {
    raw as f64 / (1u64 << 20) as f64
}

fn require(payload: &[u8], needed: usize, what: &str) -> Result<()> {
    if payload.len() < needed {
        return Err(Error::Protocol(format!(
            "{what} payload too short: {} bytes, header needs {needed}",
            payload.len()
        )));
    }
    Ok(())
}

/// Decode a panadapter payload header.
///
/// Returns the header and the byte offset of the first bin.
pub fn parse_panadapter_header(
    payload: &[u8],
    layout: PayloadLayout,
) -> Result<(PanadapterHeader, usize)> {
    let mut buf = payload;
    let (header, len) = match layout {
        PayloadLayout::Legacy => {
            require(payload, 16, "panadapter")?;
            let start = buf.get_u32();
            let count = buf.get_u32();
            let bin_size = buf.get_u32();
            let frame = buf.get_u32();
            let segment = Segment {
                start,
                count,
                total: count,
                frame,
            };
            (PanadapterHeader { segment, bin_size }, 16)
        }
        PayloadLayout::Current => {
            require(payload, 12, "panadapter")?;
            let start = buf.get_u16() as u32;
            let count = buf.get_u16() as u32;
            let bin_size = buf.get_u16() as u32;
            let total = buf.get_u16() as u32;
            let frame = buf.get_u32();
            let segment = Segment {
                start,
                count,
                total,
                frame,
            };
            (PanadapterHeader { segment, bin_size }, 12)
        }
    };
    if header.bin_size != 2 {
        return Err(Error::Protocol(format!(
            "unsupported panadapter bin size {}",
            header.bin_size
        )));
    }
    check_units(payload.len() - len, header.segment, 2, "panadapter")?;
    Ok((header, len))
}

/// Decode a waterfall payload header.
///
/// Returns the header and the byte offset of the first bin.
pub fn parse_waterfall_header(
    payload: &[u8],
    layout: PayloadLayout,
) -> Result<(WaterfallHeader, usize)> {
    let len = match layout {
        PayloadLayout::Legacy => 32,
        PayloadLayout::Current => 36,
    };
    require(payload, len, "waterfall")?;

    let mut buf = payload;
    let first_bin_hz = fixed_to_hz(buf.get_u64());
    let bin_bandwidth_hz = fixed_to_hz(buf.get_u64());
    let line_duration_ms = buf.get_u32();
    let count = buf.get_u16() as u32;
    let height = buf.get_u16();
    let timecode = buf.get_u32();
    let auto_black = buf.get_u32();
    let (total, start) = match layout {
        PayloadLayout::Legacy => (count, 0),
        PayloadLayout::Current => (buf.get_u16() as u32, buf.get_u16() as u32),
    };

    let segment = Segment {
        start,
        count,
        total,
        frame: timecode,
    };
    check_units(payload.len() - len, segment, 2, "waterfall")?;

    Ok((
        WaterfallHeader {
            segment,
            first_bin_hz,
            bin_bandwidth_hz,
            line_duration_ms,
            height,
            auto_black,
        },
        len,
    ))
}

/// A segment must fit its frame and its units must be present.
fn check_units(available: usize, segment: Segment, unit_size: usize, what: &str) -> Result<()> {
    if segment.start as u64 + segment.count as u64 > segment.total as u64 {
        return Err(Error::Protocol(format!(
            "{what} segment {}+{} exceeds frame total {}",
            segment.start, segment.count, segment.total
        )));
    }
    let needed = segment.count as usize * unit_size;
    if available < needed {
        return Err(Error::Protocol(format!(
            "{what} payload carries {available} bytes, {} units need {needed}",
            segment.count
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sample payloads
// ---------------------------------------------------------------------------

/// A single meter reading extracted from a meter data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterReading {
    /// 16-bit meter ID (assigned dynamically by the radio).
    pub meter_id: u16,
    /// Signed 16-bit meter value in internal units.
    pub value: i16,
}

/// A single stereo audio sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSample {
    pub left: f32,
    pub right: f32,
}

/// A single complex IQ sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqSample {
    pub i: f32,
    pub q: f32,
}

/// Extract meter readings from a meter data packet's payload.
///
/// Each reading is 4 bytes: a 16-bit unsigned meter ID followed by a 16-bit
/// signed value, both big-endian. The payload length must be divisible by 4.
/// An empty payload returns an empty Vec (valid -- no meters reported).
pub fn parse_meter_payload(payload: &[u8]) -> Result<Vec<MeterReading>> {
    if payload.len() % 4 != 0 {
        return Err(Error::Protocol(format!(
            "meter payload length {} is not divisible by 4",
            payload.len()
        )));
    }

    let mut buf = payload;
    let mut readings = Vec::with_capacity(payload.len() / 4);
    while buf.has_remaining() {
        let meter_id = buf.get_u16();
        let value = buf.get_i16();
        readings.push(MeterReading { meter_id, value });
    }
    Ok(readings)
}

/// Extract stereo samples from a DAX audio payload.
///
/// Samples are interleaved left/right IEEE 754 float32 values, big-endian.
/// Each stereo frame is 8 bytes.
pub fn parse_dax_audio_payload(payload: &[u8]) -> Result<Vec<AudioSample>> {
    if payload.len() % 8 != 0 {
        return Err(Error::Protocol(format!(
            "DAX audio payload length {} is not divisible by 8",
            payload.len()
        )));
    }

    let mut buf = payload;
    let mut samples = Vec::with_capacity(payload.len() / 8);
    while buf.has_remaining() {
        let left = buf.get_f32();
        let right = buf.get_f32();
        samples.push(AudioSample { left, right });
    }
    Ok(samples)
}

/// Extract samples from a reduced-bandwidth DAX audio payload.
///
/// The payload is mono int16. Each value is scaled to `[-1, 1)` and copied
/// to both channels.
pub fn parse_reduced_audio_payload(payload: &[u8]) -> Result<Vec<AudioSample>> {
    if payload.len() % 2 != 0 {
        return Err(Error::Protocol(format!(
            "reduced DAX audio payload length {} is not divisible by 2",
            payload.len()
        )));
    }

    let mut buf = payload;
    let mut samples = Vec::with_capacity(payload.len() / 2);
    while buf.has_remaining() {
        let v = buf.get_i16() as f32 / 32768.0;
        samples.push(AudioSample { left: v, right: v });
    }
    Ok(samples)
}

/// Extract IQ pairs from a DAX IQ payload (big-endian float32 I then Q).
pub fn parse_iq_payload(payload: &[u8]) -> Result<Vec<IqSample>> {
    if payload.len() % 8 != 0 {
        return Err(Error::Protocol(format!(
            "DAX IQ payload length {} is not divisible by 8",
            payload.len()
        )));
    }

    let mut buf = payload;
    let mut samples = Vec::with_capacity(payload.len() / 8);
    while buf.has_remaining() {
        let i = buf.get_f32();
        let q = buf.get_f32();
        samples.push(IqSample { i, q });
    }
    Ok(samples)
}

/// Read `count` big-endian 16-bit bins.
pub(crate) fn read_bins(payload: &[u8], count: usize) -> Vec<u16> {
    let mut buf = payload;
    (0..count).map(|_| buf.get_u16()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
