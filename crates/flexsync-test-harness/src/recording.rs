//! Recording command transport.
//!
//! [`RecordingTransport`] implements [`CommandTransport`] by appending every
//! written line to a shared log. Tests hold a [`SentLog`] handle to inspect
//! what the command channel put on the wire.
//!
//! # Example
//!
//! ```
//! use flexsync_test_harness::RecordingTransport;
//!
//! let transport = RecordingTransport::new();
//! let log = transport.log();
//! // ... hand `transport` to a CommandChannel, send commands ...
//! assert!(log.lines().is_empty());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use flexsync_core::error::{Error, Result};
use flexsync_core::transport::CommandTransport;

/// Shared view of everything sent through a [`RecordingTransport`].
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    lines: Arc<Mutex<Vec<String>>>,
    fail: Arc<AtomicBool>,
}

impl SentLog {
    /// All lines sent so far, without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// The most recently sent line.
    pub fn last(&self) -> Option<String> {
        self.lines.lock().last().cloned()
    }

    /// Make subsequent sends fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

/// A [`CommandTransport`] that records instead of writing to a socket.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    log: SentLog,
    connected: bool,
}

impl RecordingTransport {
    /// Create a new recording transport in the connected state.
    pub fn new() -> Self {
        RecordingTransport {
            log: SentLog::default(),
            connected: true,
        }
    }

    /// A handle to the sent-line log that outlives the transport.
    pub fn log(&self) -> SentLog {
        self.log.clone()
    }
}

#[async_trait]
impl CommandTransport for RecordingTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.log.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport("recording transport set to fail".into()));
        }
        let text = String::from_utf8_lossy(data);
        self.log
            .lines
            .lock()
            .push(text.trim_end_matches('\n').to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_lines_without_newline() {
        let mut t = RecordingTransport::new();
        let log = t.log();
        t.send(b"C1|sub slice all\n").await.unwrap();
        t.send(b"C2|info\n").await.unwrap();
        assert_eq!(log.lines(), vec!["C1|sub slice all", "C2|info"]);
        assert_eq!(log.last().as_deref(), Some("C2|info"));
    }

    #[tokio::test]
    async fn failing_and_closed() {
        let mut t = RecordingTransport::new();
        let log = t.log();
        log.fail_sends(true);
        assert!(matches!(t.send(b"C1|x\n").await, Err(Error::Transport(_))));
        log.fail_sends(false);
        t.close().await.unwrap();
        assert!(!t.is_connected());
        assert!(matches!(t.send(b"C2|x\n").await, Err(Error::NotConnected)));
        assert!(log.lines().is_empty());
    }
}
