//! Transmit interlock state (`interlock ...`).

use flexsync_core::convert::{parse_bool, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};

status_tokens! {
    pub enum InterlockToken {
        State => "state",
        Reason => "reason",
        Source => "source",
        TxAllowed => "tx_allowed",
        Timeout => "timeout",
        AccTxReq => "acc_txreq_enable",
        RcaTxReq => "rca_txreq_enable",
        Tx1Enabled => "tx1_enabled",
        Tx2Enabled => "tx2_enabled",
        Tx3Enabled => "tx3_enabled",
        TxDelay => "tx_delay",
        Amplifier => "amplifier",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interlock {
    pub id: ObjectId,
    /// `RECEIVE`, `READY`, `PTT_REQUESTED`, `TRANSMITTING`, ...
    pub state: String,
    pub reason: String,
    pub source: String,
    pub tx_allowed: bool,
    pub timeout_ms: u32,
    pub acc_tx_request: bool,
    pub rca_tx_request: bool,
    pub tx1_enabled: bool,
    pub tx2_enabled: bool,
    pub tx3_enabled: bool,
    pub tx_delay_ms: u32,
    pub amplifier: String,
}

impl Interlock {
    pub fn is_transmitting(&self) -> bool {
        self.state == "TRANSMITTING"
    }
}

impl RadioObject for Interlock {
    const KIND: ObjectKind = ObjectKind::Interlock;
    type Token = InterlockToken;

    fn new(id: ObjectId) -> Self {
        Interlock {
            id,
            state: String::new(),
            reason: String::new(),
            source: String::new(),
            tx_allowed: false,
            timeout_ms: 0,
            acc_tx_request: false,
            rca_tx_request: false,
            tx1_enabled: false,
            tx2_enabled: false,
            tx3_enabled: false,
            tx_delay_ms: 0,
            amplifier: String::new(),
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn parse_id(_token: &str) -> Option<ObjectId> {
        Some(ObjectId::Singleton)
    }

    fn apply(&mut self, token: InterlockToken, value: &str) -> Result<bool> {
        use InterlockToken::*;
        Ok(match token {
            State => update(&mut self.state, value.to_string()),
            Reason => update(&mut self.reason, value.to_string()),
            Source => update(&mut self.source, value.to_string()),
            TxAllowed => update(&mut self.tx_allowed, parse_bool(value)?),
            Timeout => update(&mut self.timeout_ms, parse_u32(value)?),
            AccTxReq => update(&mut self.acc_tx_request, parse_bool(value)?),
            RcaTxReq => update(&mut self.rca_tx_request, parse_bool(value)?),
            Tx1Enabled => update(&mut self.tx1_enabled, parse_bool(value)?),
            Tx2Enabled => update(&mut self.tx2_enabled, parse_bool(value)?),
            Tx3Enabled => update(&mut self.tx3_enabled, parse_bool(value)?),
            TxDelay => update(&mut self.tx_delay_ms, parse_u32(value)?),
            Amplifier => update(&mut self.amplifier, value.to_string()),
        })
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn command_prefix(_id: &ObjectId) -> Option<String> {
        Some("interlock".to_string())
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.interlock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_tracking() {
        let mut i = Interlock::new(ObjectId::Singleton);
        i.apply(InterlockToken::State, "TRANSMITTING").unwrap();
        assert!(i.is_transmitting());
        assert!(!i.apply(InterlockToken::State, "TRANSMITTING").unwrap());
    }
}
