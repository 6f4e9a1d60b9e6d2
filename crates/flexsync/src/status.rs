//! Status payload tokenization.
//!
//! A status payload looks like
//!
//! ```text
//! slice 0 RF_frequency=14.250000 mode=USB pan=0x40000000
//! display pan 0x40000000 center=14.100000 bandwidth=0.200000
//! stream 0x04000008 type=dax_rx dax_channel=1 client_handle=0x12345678
//! transmit rfpower=50
//! meter 5 removed
//! ```
//!
//! Leading words without `=` form the head (object kind, optional sub-kind,
//! optional id). Everything after is a `key=value` field, except bare words
//! which are kept as flags (`removed`). Meter definitions use their own
//! `N.key=value#` form, handled by [`parse_meter_fields`].

use flexsync_core::convert::unescape_spaces;

/// One tokenized status payload. Transient: built, routed, dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    /// Words before the first `key=value` pair.
    pub head: Vec<String>,
    /// `key=value` pairs in arrival order. Values have escaped spaces
    /// restored.
    pub fields: Vec<(String, String)>,
    /// Bare words after the first field.
    pub flags: Vec<String>,
}

impl StatusLine {
    pub fn parse(payload: &str) -> Self {
        let mut line = StatusLine::default();
        for word in payload.split_whitespace() {
            match word.split_once('=') {
                Some((key, value)) => {
                    line.fields.push((key.to_string(), unescape_spaces(value)));
                }
                None if line.fields.is_empty() => line.head.push(word.to_string()),
                None => line.flags.push(word.to_string()),
            }
        }
        line
    }

    /// First head word, the object kind.
    pub fn kind_token(&self) -> Option<&str> {
        self.head.first().map(String::as_str)
    }

    /// Head word at `index`.
    pub fn head_word(&self, index: usize) -> Option<&str> {
        self.head.get(index).map(String::as_str)
    }

    /// Value of the first field named `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the line announces removal: a bare `removed` anywhere after
    /// the kind, or `in_use=0`.
    pub fn is_removal(&self) -> bool {
        self.head.iter().skip(1).any(|w| w == "removed")
            || self.flags.iter().any(|w| w == "removed")
            || self.field("in_use") == Some("0")
    }
}

/// Group meter definition fields by meter id.
///
/// Input is the payload after the `meter ` keyword, e.g.
/// `1.src=SLC#1.num=0#1.nam=LEVEL#2.src=TX-#2.nam=FWDPWR#`. Entries
/// whose key has no numeric `N.` prefix are returned under `None` so the
/// caller can log them.
pub fn parse_meter_fields(body: &str) -> Vec<(Option<u32>, Vec<(String, String)>)> {
    let mut groups: Vec<(Option<u32>, Vec<(String, String)>)> = Vec::new();
    for entry in body.split('#').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((key, value)) = entry.split_once('=') else {
            groups.push((None, vec![(entry.to_string(), String::new())]));
            continue;
        };
        let (id, token) = match key.split_once('.') {
            Some((n, token)) => match n.parse::<u32>() {
                Ok(n) => (Some(n), token),
                Err(_) => (None, key),
            },
            None => (None, key),
        };
        let pair = (token.to_string(), unescape_spaces(value));
        match groups.iter_mut().find(|(g, _)| *g == id && id.is_some()) {
            Some((_, fields)) => fields.push(pair),
            None => groups.push((id, vec![pair])),
        }
    }
    groups
}
