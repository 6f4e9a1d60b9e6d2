//! Scripted SmartSDR radio over TCP.
//!
//! [`MockRadio`] listens on a random localhost port and behaves like the
//! command side of a radio: it sends the `V`/`H` handshake on accept,
//! records every `C<seq>|<command>` line the client sends, answers each one
//! with a reply line, and lets the test push arbitrary status or message
//! lines at any time.
//!
//! # Example
//!
//! ```no_run
//! use flexsync_test_harness::MockRadio;
//!
//! # async fn example() -> flexsync_core::Result<()> {
//! let radio = MockRadio::start().await?;
//! radio.reply_to("stream create", 0, "0x04000008");
//! // ... connect a session to radio.addr() ...
//! radio.push_status("slice 0 pan=0x40000000 RF_frequency=14.250000 mode=USB");
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use flexsync_core::error::{Error, Result};

/// Default handshake version line body.
pub const DEFAULT_VERSION: &str = "1.4.0.0";

/// Default client handle announced in the handshake.
pub const DEFAULT_HANDLE: u32 = 0x1234_5678;

/// How the radio answers a command whose text starts with `prefix`.
#[derive(Debug, Clone)]
struct ReplyRule {
    prefix: String,
    /// `None` means never answer.
    reply: Option<(u32, String)>,
}

#[derive(Debug, Default)]
struct Shared {
    commands: Mutex<Vec<(u32, String)>>,
    rules: Mutex<Vec<ReplyRule>>,
}

impl Shared {
    fn reply_for(&self, command: &str) -> Option<(u32, String)> {
        let rules = self.rules.lock();
        match rules.iter().find(|r| command.starts_with(&r.prefix)) {
            Some(rule) => rule.reply.clone(),
            None => Some((0, String::new())),
        }
    }
}

/// A mock radio accepting a single client connection.
pub struct MockRadio {
    addr: SocketAddr,
    handle: u32,
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl MockRadio {
    /// Start a mock radio with the default version and handle.
    pub async fn start() -> Result<Self> {
        Self::start_with(DEFAULT_VERSION, DEFAULT_HANDLE).await
    }

    /// Start a mock radio announcing the given version and client handle.
    pub async fn start_with(version: &str, handle: u32) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock radio: {e}")))?;
        let addr = listener.local_addr().map_err(Error::Io)?;

        let shared = Arc::new(Shared::default());
        let cancel = CancellationToken::new();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        // The handshake is queued first so it always precedes pushed lines.
        let _ = outbound.send(format!("V{version}"));
        let _ = outbound.send(format!("H{handle:08X}"));

        let task_shared = shared.clone();
        let task_cancel = cancel.clone();
        let reply_tx = outbound.clone();
        tokio::spawn(async move {
            let (stream, _) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::debug!(error = %e, "Mock radio accept failed");
                        return;
                    }
                },
                _ = task_cancel.cancelled() => return,
            };
            let (reader, mut writer) = stream.into_split();

            let writer_cancel = task_cancel.clone();
            let writer_task = tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = writer_cancel.cancelled() => break,
                        line = outbound_rx.recv() => {
                            let Some(line) = line else { break };
                            let mut bytes = line.into_bytes();
                            bytes.push(b'\n');
                            if writer.write_all(&bytes).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = writer.shutdown().await;
            });

            let mut lines = BufReader::new(reader).lines();
            loop {
                let line = tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    line = lines.next_line() => line,
                };
                let line = match line {
                    Ok(Some(line)) => line,
                    _ => break,
                };
                let Some((seq, command)) = parse_command(&line) else {
                    tracing::debug!(line = %line, "Mock radio ignoring non-command line");
                    continue;
                };
                task_shared.commands.lock().push((seq, command.clone()));
                if let Some((code, text)) = task_shared.reply_for(&command) {
                    let _ = reply_tx.send(format!("R{seq}|{code:X}|{text}"));
                }
            }
            task_cancel.cancel();
            let _ = writer_task.await;
        });

        Ok(MockRadio {
            addr,
            handle,
            shared,
            outbound,
            cancel,
        })
    }

    /// Address the radio is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The client handle announced in the handshake.
    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Answer commands starting with `prefix` with `R<seq>|<code>|<text>`.
    ///
    /// Rules are matched in the order they were added. Commands with no
    /// matching rule get a success reply with empty text.
    pub fn reply_to(&self, prefix: &str, code: u32, text: &str) {
        self.shared.rules.lock().push(ReplyRule {
            prefix: prefix.to_string(),
            reply: Some((code, text.to_string())),
        });
    }

    /// Never answer commands starting with `prefix`.
    pub fn ignore(&self, prefix: &str) {
        self.shared.rules.lock().push(ReplyRule {
            prefix: prefix.to_string(),
            reply: None,
        });
    }

    /// Send a raw line (without newline) to the client.
    pub fn push_line(&self, line: &str) {
        let _ = self.outbound.send(line.to_string());
    }

    /// Send a status line addressed to this client's handle.
    pub fn push_status(&self, payload: &str) {
        self.push_line(&format!("S{:08X}|{payload}", self.handle));
    }

    /// Every command text received so far, in arrival order.
    pub fn commands(&self) -> Vec<String> {
        self.shared
            .commands
            .lock()
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Wait until a command starting with `prefix` has been received.
    ///
    /// Returns its sequence number and full text, or `None` on timeout.
    pub async fn wait_for_command(&self, prefix: &str, timeout: Duration) -> Option<(u32, String)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(found) = self
                .shared
                .commands
                .lock()
                .iter()
                .find(|(_, c)| c.starts_with(prefix))
                .cloned()
            {
                return Some(found);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Drop the client connection.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

impl Drop for MockRadio {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Split `C<seq>|<command>` into its parts.
fn parse_command(line: &str) -> Option<(u32, String)> {
    let body = line.trim().strip_prefix('C')?;
    let (seq, command) = body.split_once('|')?;
    Some((seq.parse().ok()?, command.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpStream;

    #[test]
    fn command_line_parsing() {
        assert_eq!(
            parse_command("C12|sub slice all"),
            Some((12, "sub slice all".to_string()))
        );
        assert_eq!(parse_command("R1|0|"), None);
        assert_eq!(parse_command("Cx|info"), None);
    }

    #[tokio::test]
    async fn handshake_then_reply() {
        let radio = MockRadio::start().await.unwrap();
        radio.reply_to("info", 0, "model=FLEX-6600");

        let stream = TcpStream::connect(radio.addr()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        assert_eq!(lines.next_line().await.unwrap().unwrap(), "V1.4.0.0");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "H12345678");

        writer.write_all(b"C3|info\n").await.unwrap();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "R3|0|model=FLEX-6600"
        );

        writer.write_all(b"C4|sub slice all\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "R4|0|");

        assert_eq!(radio.commands(), vec!["info", "sub slice all"]);
    }

    #[tokio::test]
    async fn ignored_commands_get_no_reply() {
        let radio = MockRadio::start().await.unwrap();
        radio.ignore("slow");

        let stream = TcpStream::connect(radio.addr()).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();
        lines.next_line().await.unwrap();
        lines.next_line().await.unwrap();

        writer.write_all(b"C1|slow thing\nC2|fast\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "R2|0|");
        assert!(
            radio
                .wait_for_command("slow", Duration::from_secs(1))
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn pushed_status_uses_handle() {
        let radio = MockRadio::start_with("2.4.9.2", 0xABCD).await.unwrap();
        let stream = TcpStream::connect(radio.addr()).await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "V2.4.9.2");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "H0000ABCD");

        radio.push_status("transmit rfpower=50");
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            "S0000ABCD|transmit rfpower=50"
        );

        radio.disconnect();
        assert!(lines.next_line().await.unwrap().is_none());
    }
}
