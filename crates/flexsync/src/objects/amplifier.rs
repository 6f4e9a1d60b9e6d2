//! External amplifiers registered with the radio.

use flexsync_core::convert::parse_u32;
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum AmplifierToken {
        Ip => "ip",
        Port => "port",
        Model => "model",
        SerialNumber => "serial_num",
        Antenna => "ant",
        Mode => "mode",
        State => "state",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Amplifier {
    pub id: ObjectId,
    pub ip: String,
    pub port: u32,
    pub model: String,
    pub serial_number: String,
    pub antenna: String,
    pub mode: String,
    pub state: String,
}

impl RadioObject for Amplifier {
    const KIND: ObjectKind = ObjectKind::Amplifier;
    type Token = AmplifierToken;

    fn new(id: ObjectId) -> Self {
        Amplifier {
            id,
            ip: String::new(),
            port: 0,
            model: String::new(),
            serial_number: String::new(),
            antenna: String::new(),
            mode: String::new(),
            state: String::new(),
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<ObjectId> {
        ObjectId::handle(token)
    }

    fn apply(&mut self, token: AmplifierToken, value: &str) -> Result<bool> {
        use AmplifierToken::*;
        Ok(match token {
            Ip => update(&mut self.ip, value.to_string()),
            Port => update(&mut self.port, parse_u32(value)?),
            Model => update(&mut self.model, value.to_string()),
            SerialNumber => update(&mut self.serial_number, value.to_string()),
            Antenna => update(&mut self.antenna, value.to_string()),
            Mode => update(&mut self.mode, value.to_string()),
            State => update(&mut self.state, value.to_string()),
        })
    }

    fn is_ready(&self) -> bool {
        !self.ip.is_empty() && self.port != 0
    }

    fn command_prefix(id: &ObjectId) -> Option<String> {
        Some(format!("amplifier set {id}"))
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.amplifiers()
    }
}
