//! SmartSDR TCP line encoding and decoding.
//!
//! The text protocol uses newline-terminated ASCII lines over TCP port
//! 4992. Commands flow from client to radio; replies, status lines,
//! messages, and handshake lines flow from radio to client.
//!
//! # Line formats
//!
//! ```text
//! Command:   C<seq>|<command_text>\n
//! Reply:     R<seq>|<hex_error_code>|<reply_text>\n
//! Status:    S<hex_handle>|<object> [<id>] <key>=<value> ...\n
//! Message:   M<hex_code>|<text>\n
//! Version:   V<major>.<minor>.<patch>.<build>\n
//! Handle:    H<hex_handle>\n
//! ```
//!
//! Nothing here touches a socket.

use flexsync_core::convert::parse_hex_u32;
use flexsync_core::{Error, Result};

// ---------------------------------------------------------------------------
// Command encoding
// ---------------------------------------------------------------------------

/// Encode a command with the given sequence number.
///
/// Format: `C<seq>|<command>\n`
pub fn encode_command(seq: u32, command: &str) -> Vec<u8> {
    format!("C{seq}|{command}\n").into_bytes()
}

// ---------------------------------------------------------------------------
// Command builders
//
// Builders return bare command text; the command channel adds `C<seq>|`.
// Property setters come from the object kinds themselves.
// ---------------------------------------------------------------------------

/// `sub <object>`, e.g. `sub slice all`.
pub fn cmd_subscribe(object: &str) -> String {
    format!("sub {object}")
}

/// Register the client program name shown on the radio.
pub fn cmd_client_program(name: &str) -> String {
    format!("client program {name}")
}

/// Tell the radio which local UDP port receives VITA-49 streams.
///
/// Example output: `"client udpport 4991"`
pub fn cmd_client_udp_port(port: u16) -> String {
    format!("client udpport {port}")
}

/// Create a DAX RX audio stream for the given channel.
///
/// Example output: `"stream create type=dax_rx dax_channel=1"`
pub fn cmd_stream_create_dax_rx(dax_channel: u8) -> String {
    format!("stream create type=dax_rx dax_channel={dax_channel}")
}

/// Create a DAX IQ stream for the given channel.
///
/// Example output: `"stream create type=dax_iq daxiq_channel=2"`
pub fn cmd_stream_create_dax_iq(channel: u8) -> String {
    format!("stream create type=dax_iq daxiq_channel={channel}")
}

/// Create a compressed (Opus) remote RX audio stream.
///
/// Example output: `"stream create type=remote_audio_rx compression=opus"`
pub fn cmd_stream_create_remote_rx() -> String {
    "stream create type=remote_audio_rx compression=opus".to_string()
}

/// `stream remove 0x<handle>`.
pub fn cmd_stream_remove(stream_id: u32) -> String {
    format!("stream remove 0x{stream_id:08X}")
}

// ---------------------------------------------------------------------------
// Inbound line types
// ---------------------------------------------------------------------------

/// A decoded reply to a previously-sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence number correlating this reply to the originating command.
    pub sequence: u32,
    /// Error code. `0` means success; non-zero is a radio error code.
    pub error_code: u32,
    /// Reply text (may be empty). For `stream create` this is the new handle.
    pub message: String,
}

impl Reply {
    /// Whether the radio reported success.
    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}

/// A status line before object-level tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// The client handle this status was sent to.
    pub handle: u32,
    /// Everything after the `|`: object kind, id, and key/value pairs.
    pub payload: String,
}

/// A decoded handshake version line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
}

impl ProtocolVersion {
    /// Parse a dotted `major.minor.patch.build` string.
    pub fn parse(text: &str) -> Result<Self> {
        let mut numbers = [0u32; 4];
        let mut parts = text.split('.');
        for slot in numbers.iter_mut() {
            let part = parts.next().ok_or_else(|| {
                Error::Protocol(format!("version {text:?} has fewer than 4 parts"))
            })?;
            *slot = part
                .parse()
                .map_err(|_| Error::Protocol(format!("version {text:?} has a bad part {part:?}")))?;
        }
        if parts.next().is_some() {
            return Err(Error::Protocol(format!("version {text:?} has more than 4 parts")));
        }

        let [major, minor, patch, build] = numbers;
        Ok(ProtocolVersion {
            major,
            minor,
            patch,
            build,
        })
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// Types of lines received from the TCP stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Handshake version line: `V1.4.0.0`
    Version(ProtocolVersion),
    /// Handshake client handle: `H12345678`
    Handle(u32),
    /// Reply to a command: `R<seq>|<error>|<text>`
    Reply(Reply),
    /// Unsolicited status update: `S<handle>|<object> <kv>...`
    Status(Status),
    /// Informational message: `M<code>|<text>`
    Message { severity: u8, text: String },
    /// An unrecognised line.
    Unknown(String),
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Parse a single line received from the TCP stream.
///
/// The line should NOT include the trailing `\n`. Surrounding whitespace
/// is stripped.
pub fn parse_line(line: &str) -> Result<Line> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Protocol("empty line".into()));
    }

    match line.as_bytes()[0] {
        b'V' => Ok(Line::Version(ProtocolVersion::parse(&line[1..])?)),
        b'H' => parse_handle(line),
        b'R' => parse_reply(line),
        b'S' => parse_status(line),
        b'M' => parse_message(line),
        _ => Ok(Line::Unknown(line.to_string())),
    }
}

/// `H<hex handle>`
fn parse_handle(line: &str) -> Result<Line> {
    parse_hex_u32(&line[1..])
        .map(Line::Handle)
        .ok_or_else(|| Error::Protocol(format!("bad client handle in {line:?}")))
}

/// `R<seq>|<hex code>|<text>`; the text may be missing.
fn parse_reply(line: &str) -> Result<Line> {
    let (seq, rest) = line[1..]
        .split_once('|')
        .ok_or_else(|| Error::Protocol(format!("reply without error code: {line:?}")))?;
    let (code, message) = rest.split_once('|').unwrap_or((rest, ""));

    let sequence = seq
        .parse::<u32>()
        .map_err(|_| Error::Protocol(format!("bad reply sequence {seq:?}")))?;
    let error_code =
        parse_hex_u32(code).ok_or_else(|| Error::Protocol(format!("bad reply code {code:?}")))?;

    Ok(Line::Reply(Reply {
        sequence,
        error_code,
        message: message.to_string(),
    }))
}

/// `S<hex handle>|<payload>`
fn parse_status(line: &str) -> Result<Line> {
    let (handle, payload) = line[1..]
        .split_once('|')
        .ok_or_else(|| Error::Protocol(format!("status without payload: {line:?}")))?;
    let handle = parse_hex_u32(handle)
        .ok_or_else(|| Error::Protocol(format!("bad status handle {handle:?}")))?;

    Ok(Line::Status(Status {
        handle,
        payload: payload.to_string(),
    }))
}

/// `M<hex code>|<text>`. Bits 24-25 of the code carry the severity
/// (info, warning, error, fatal); an unreadable code counts as info.
fn parse_message(line: &str) -> Result<Line> {
    let (code, text) = line[1..]
        .split_once('|')
        .ok_or_else(|| Error::Protocol(format!("message without text: {line:?}")))?;
    let severity = parse_hex_u32(code).map_or(0, |code| ((code >> 24) & 0x03) as u8);

    Ok(Line::Message {
        severity,
        text: text.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
