//! Command channel: sequence allocation and reply correlation.
//!
//! Every outbound command gets a sequence number and goes out as
//! `C{seq}|{command}\n`. Callers that care about the outcome register a
//! callback; the parse lane hands each `R` line to
//! [`CommandChannel::handle_reply`], which invokes and forgets the matching
//! entry. Replies nobody is waiting for are dropped. There is no retry.
//!
//! Entries older than the command timeout are expired by
//! [`CommandChannel::expire`], which the session's sweeper calls
//! periodically; their callbacks see [`Error::Timeout`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use flexsync_core::{CommandTransport, Error, Result};

use crate::codec::{self, Reply};

/// Completion callback for a command. Receives the sequence number and
/// either the radio's reply (any error code) or a local failure.
pub type ReplyCallback = Box<dyn FnOnce(u32, Result<Reply>) + Send + 'static>;

struct PendingCommand {
    command: String,
    callback: ReplyCallback,
    created: Instant,
}

pub struct CommandChannel {
    transport: tokio::sync::Mutex<Option<Box<dyn CommandTransport>>>,
    next_seq: AtomicU32,
    pending: Mutex<HashMap<u32, PendingCommand>>,
    timeout: Duration,
}

impl CommandChannel {
    pub fn new(transport: Box<dyn CommandTransport>, timeout: Duration) -> Self {
        CommandChannel {
            transport: tokio::sync::Mutex::new(Some(transport)),
            next_seq: AtomicU32::new(1),
            pending: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// The bound used by [`send_with_check`](Self::send_with_check) and
    /// [`expire`](Self::expire).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a command, optionally registering a reply callback.
    ///
    /// Returns the sequence number used. If the write fails the callback
    /// is discarded without being called and the error is returned.
    pub async fn send(&self, command: &str, on_reply: Option<ReplyCallback>) -> Result<u32> {
        let mut transport = self.transport.lock().await;
        let t = transport.as_mut().ok_or(Error::NotConnected)?;
        if !t.is_connected() {
            return Err(Error::NotConnected);
        }

        // Allocated under the transport lock so sequence order matches wire order.
        let seq = self.allocate_sequence();
        if let Some(callback) = on_reply {
            self.pending.lock().insert(
                seq,
                PendingCommand {
                    command: command.to_string(),
                    callback,
                    created: Instant::now(),
                },
            );
        }

        tracing::trace!(seq, command = %command, "Sending command");
        if let Err(e) = t.send(&codec::encode_command(seq, command)).await {
            self.pending.lock().remove(&seq);
            return Err(e);
        }
        Ok(seq)
    }

    /// Send a command and wait (bounded) for its reply.
    ///
    /// A non-zero error code becomes [`Error::CommandFailed`]; no reply
    /// within the timeout becomes [`Error::Timeout`].
    pub async fn send_with_check(&self, command: &str) -> Result<Reply> {
        let (tx, rx) = oneshot::channel();
        let callback: ReplyCallback = Box::new(move |_, result| {
            let _ = tx.send(result);
        });
        let seq = self.send(command, Some(callback)).await?;

        let result = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                self.pending.lock().remove(&seq);
                Err(Error::Timeout)
            }
        };

        let reply = result?;
        if reply.is_ok() {
            Ok(reply)
        } else {
            Err(Error::CommandFailed {
                sequence: reply.sequence,
                code: reply.error_code,
                message: reply.message,
            })
        }
    }

    /// Correlate a reply with its pending command.
    ///
    /// Returns `false` when nothing was waiting for it.
    pub fn handle_reply(&self, reply: Reply) -> bool {
        let Some(entry) = self.pending.lock().remove(&reply.sequence) else {
            tracing::debug!(seq = reply.sequence, "Dropping unmatched reply");
            return false;
        };

        if !reply.is_ok() {
            tracing::debug!(
                seq = reply.sequence,
                command = %entry.command,
                code = format!("0x{:08X}", reply.error_code),
                message = %reply.message,
                "Command failed"
            );
        }
        (entry.callback)(reply.sequence, Ok(reply));
        true
    }

    /// Fail every entry older than the timeout with [`Error::Timeout`].
    ///
    /// Returns how many entries were expired.
    pub fn expire(&self, now: Instant) -> usize {
        let expired: Vec<(u32, PendingCommand)> = {
            let mut pending = self.pending.lock();
            let stale: Vec<u32> = pending
                .iter()
                .filter(|(_, p)| now.saturating_duration_since(p.created) >= self.timeout)
                .map(|(seq, _)| *seq)
                .collect();
            stale
                .into_iter()
                .filter_map(|seq| pending.remove(&seq).map(|p| (seq, p)))
                .collect()
        };

        let count = expired.len();
        for (seq, entry) in expired {
            tracing::debug!(seq, command = %entry.command, "Command timed out");
            (entry.callback)(seq, Err(Error::Timeout));
        }
        count
    }

    /// Fail every pending command with [`Error::ConnectionLost`].
    pub fn fail_all(&self) {
        let drained: Vec<(u32, PendingCommand)> = self.pending.lock().drain().collect();
        for (seq, entry) in drained {
            (entry.callback)(seq, Err(Error::ConnectionLost));
        }
    }

    /// Close the transport. Later sends return [`Error::NotConnected`].
    pub async fn close(&self) -> Result<()> {
        let transport = self.transport.lock().await.take();
        match transport {
            Some(mut t) => t.close().await,
            None => Ok(()),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, seq: u32) -> bool {
        self.pending.lock().contains_key(&seq)
    }

    /// Next sequence number, skipping zero and anything still pending
    /// after wraparound.
    fn allocate_sequence(&self) -> u32 {
        let pending = self.pending.lock();
        loop {
            let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
            if seq != 0 && !pending.contains_key(&seq) {
                return seq;
            }
        }
    }
}
