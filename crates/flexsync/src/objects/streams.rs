//! Audio and IQ stream objects.
//!
//! Current firmware reports every stream as `stream 0xH type=<kind> ...`;
//! older firmware used one keyword per kind (`audio_stream`,
//! `tx_audio_stream`, `mic_audio_stream`, `dax_iq`, `opus_stream`). The
//! router maps both spellings onto the types here. A stream is usable once
//! the radio reports which client owns it or where it is sent.

use flexsync_core::convert::{parse_bool, parse_handle, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, RemovalPolicy, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

/// Where a stream's datagrams go, common to all stream kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub client_handle: u32,
    pub ip: String,
    pub port: u32,
}

impl StreamEndpoint {
    fn is_bound(&self) -> bool {
        self.client_handle != 0 || !self.ip.is_empty()
    }

    fn set_client_handle(&mut self, value: &str) -> Result<bool> {
        Ok(update(&mut self.client_handle, parse_handle(value)?))
    }

    fn set_ip(&mut self, value: &str) -> Result<bool> {
        Ok(update(&mut self.ip, value.to_string()))
    }

    fn set_port(&mut self, value: &str) -> Result<bool> {
        Ok(update(&mut self.port, parse_u32(value)?))
    }
}

/// Shared `RadioObject` plumbing. Each type provides `apply_token`.
macro_rules! stream_object {
    ($ty:ident, $token:ident, $kind:ident, $store:ident, $removal:ident) => {
        impl RadioObject for $ty {
            const KIND: ObjectKind = ObjectKind::$kind;
            const REMOVAL: RemovalPolicy = RemovalPolicy::$removal;
            type Token = $token;

            fn new(id: ObjectId) -> Self {
                $ty {
                    id,
                    ..Default::default()
                }
            }

            fn id(&self) -> &ObjectId {
                &self.id
            }

            fn parse_id(token: &str) -> Option<ObjectId> {
                ObjectId::handle(token)
            }

            fn apply(&mut self, token: $token, value: &str) -> Result<bool> {
                self.apply_token(token, value)
            }

            fn is_ready(&self) -> bool {
                self.endpoint.is_bound()
            }

            fn command_prefix(_id: &ObjectId) -> Option<String> {
                None
            }

            fn store(registry: &Registry) -> &ObjectStore<Self> {
                registry.$store()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// DAX RX audio
// ---------------------------------------------------------------------------

status_tokens! {
    pub enum DaxRxToken {
        Type => "type",
        InUse => "in_use",
        ClientHandle => "client_handle",
        Ip => "ip",
        Port => "port",
        DaxChannel => "dax_channel" | "dax",
        Slice => "slice",
        Gain => "gain",
    }
}

/// Demodulated slice audio delivered to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct DaxRxAudioStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub dax_channel: u32,
    /// Slice index, if the channel is assigned to one.
    pub slice: Option<u32>,
    pub gain: u32,
}

impl Default for DaxRxAudioStream {
    fn default() -> Self {
        DaxRxAudioStream {
            id: ObjectId::Handle(0),
            endpoint: StreamEndpoint::default(),
            dax_channel: 0,
            slice: None,
            gain: 50,
        }
    }
}

impl DaxRxAudioStream {
    fn apply_token(&mut self, token: DaxRxToken, value: &str) -> Result<bool> {
        match token {
            DaxRxToken::Type | DaxRxToken::InUse => Ok(false),
            DaxRxToken::ClientHandle => self.endpoint.set_client_handle(value),
            DaxRxToken::Ip => self.endpoint.set_ip(value),
            DaxRxToken::Port => self.endpoint.set_port(value),
            DaxRxToken::DaxChannel => Ok(update(&mut self.dax_channel, parse_u32(value)?)),
            // The radio reports an unassigned channel as slice=-1 or empty.
            DaxRxToken::Slice => Ok(update(&mut self.slice, value.parse::<u32>().ok())),
            DaxRxToken::Gain => Ok(update(&mut self.gain, parse_u32(value)?)),
        }
    }
}

stream_object!(DaxRxAudioStream, DaxRxToken, DaxRxAudioStream, dax_rx_streams, RadioConfirmed);

// ---------------------------------------------------------------------------
// DAX TX audio
// ---------------------------------------------------------------------------

status_tokens! {
    pub enum DaxTxToken {
        Type => "type",
        InUse => "in_use",
        ClientHandle => "client_handle",
        Ip => "ip",
        Port => "port",
        Transmit => "tx" | "dax_tx",
    }
}

/// Audio sent from the client to the transmitter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaxTxAudioStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub transmit: bool,
}

impl DaxTxAudioStream {
    fn apply_token(&mut self, token: DaxTxToken, value: &str) -> Result<bool> {
        match token {
            DaxTxToken::Type | DaxTxToken::InUse => Ok(false),
            DaxTxToken::ClientHandle => self.endpoint.set_client_handle(value),
            DaxTxToken::Ip => self.endpoint.set_ip(value),
            DaxTxToken::Port => self.endpoint.set_port(value),
            DaxTxToken::Transmit => Ok(update(&mut self.transmit, parse_bool(value)?)),
        }
    }
}

stream_object!(DaxTxAudioStream, DaxTxToken, DaxTxAudioStream, dax_tx_streams, RadioConfirmed);

// ---------------------------------------------------------------------------
// DAX microphone audio
// ---------------------------------------------------------------------------

status_tokens! {
    pub enum DaxMicToken {
        Type => "type",
        InUse => "in_use",
        ClientHandle => "client_handle",
        Ip => "ip",
        Port => "port",
        Gain => "gain",
    }
}

/// The radio's microphone input delivered to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaxMicAudioStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub gain: u32,
}

impl DaxMicAudioStream {
    fn apply_token(&mut self, token: DaxMicToken, value: &str) -> Result<bool> {
        match token {
            DaxMicToken::Type | DaxMicToken::InUse => Ok(false),
            DaxMicToken::ClientHandle => self.endpoint.set_client_handle(value),
            DaxMicToken::Ip => self.endpoint.set_ip(value),
            DaxMicToken::Port => self.endpoint.set_port(value),
            DaxMicToken::Gain => Ok(update(&mut self.gain, parse_u32(value)?)),
        }
    }
}

stream_object!(DaxMicAudioStream, DaxMicToken, DaxMicAudioStream, dax_mic_streams, RadioConfirmed);

// ---------------------------------------------------------------------------
// DAX IQ
// ---------------------------------------------------------------------------

status_tokens! {
    pub enum DaxIqToken {
        Type => "type",
        InUse => "in_use",
        ClientHandle => "client_handle",
        Ip => "ip",
        Port => "port",
        Channel => "daxiq_channel" | "daxiq",
        Panadapter => "pan",
        Rate => "daxiq_rate" | "rate",
        Active => "active",
    }
}

/// Raw IQ from a panadapter delivered to the client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaxIqStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub channel: u32,
    pub panadapter: u32,
    pub rate: u32,
    pub active: bool,
}

impl DaxIqStream {
    fn apply_token(&mut self, token: DaxIqToken, value: &str) -> Result<bool> {
        match token {
            DaxIqToken::Type | DaxIqToken::InUse => Ok(false),
            DaxIqToken::ClientHandle => self.endpoint.set_client_handle(value),
            DaxIqToken::Ip => self.endpoint.set_ip(value),
            DaxIqToken::Port => self.endpoint.set_port(value),
            DaxIqToken::Channel => Ok(update(&mut self.channel, parse_u32(value)?)),
            DaxIqToken::Panadapter => Ok(update(&mut self.panadapter, parse_handle(value)?)),
            DaxIqToken::Rate => Ok(update(&mut self.rate, parse_u32(value)?)),
            DaxIqToken::Active => Ok(update(&mut self.active, parse_bool(value)?)),
        }
    }
}

stream_object!(DaxIqStream, DaxIqToken, DaxIqStream, dax_iq_streams, RadioConfirmed);

// ---------------------------------------------------------------------------
// Remote (Opus) audio
// ---------------------------------------------------------------------------

status_tokens! {
    pub enum RemoteAudioToken {
        Type => "type",
        InUse => "in_use",
        ClientHandle => "client_handle",
        Ip => "ip",
        Port => "port",
        Compression => "compression",
    }
}

/// Compressed receive audio for remote operation.
///
/// The radio never confirms removal of these streams, so the client evicts
/// them itself when it removes one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteRxAudioStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub compression: String,
}

impl RemoteRxAudioStream {
    fn apply_token(&mut self, token: RemoteAudioToken, value: &str) -> Result<bool> {
        match token {
            RemoteAudioToken::Type | RemoteAudioToken::InUse => Ok(false),
            RemoteAudioToken::ClientHandle => self.endpoint.set_client_handle(value),
            RemoteAudioToken::Ip => self.endpoint.set_ip(value),
            RemoteAudioToken::Port => self.endpoint.set_port(value),
            RemoteAudioToken::Compression => Ok(update(&mut self.compression, value.to_string())),
        }
    }
}

stream_object!(
    RemoteRxAudioStream,
    RemoteAudioToken,
    RemoteRxAudioStream,
    remote_rx_streams,
    ClientAsserted
);

/// Compressed transmit audio for remote operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteTxAudioStream {
    pub id: ObjectId,
    pub endpoint: StreamEndpoint,
    pub compression: String,
}

impl RemoteTxAudioStream {
    fn apply_token(&mut self, token: RemoteAudioToken, value: &str) -> Result<bool> {
        match token {
            RemoteAudioToken::Type | RemoteAudioToken::InUse => Ok(false),
            RemoteAudioToken::ClientHandle => self.endpoint.set_client_handle(value),
            RemoteAudioToken::Ip => self.endpoint.set_ip(value),
            RemoteAudioToken::Port => self.endpoint.set_port(value),
            RemoteAudioToken::Compression => Ok(update(&mut self.compression, value.to_string())),
        }
    }
}

stream_object!(
    RemoteTxAudioStream,
    RemoteAudioToken,
    RemoteTxAudioStream,
    remote_tx_streams,
    RadioConfirmed
);
