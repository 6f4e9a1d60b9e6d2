//! Outbound transport trait for the command channel.
//!
//! The socket layer is owned by the caller; the engine only needs somewhere
//! to write encoded command lines. [`CommandTransport`] is that seam. The
//! session wraps the write half of its TCP stream in [`StreamTransport`],
//! and tests substitute a recording implementation from
//! `flexsync-test-harness`.
//!
//! Inbound traffic is push-driven: the owner of the socket feeds lines and
//! datagrams into the engine, so there is no `receive` here.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Asynchronous outbound byte sink.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Write one encoded command line.
    ///
    /// Implementations should not return until the bytes have been handed
    /// to the underlying socket.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Close the transport. Later `send()` calls return
    /// [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport can still send.
    fn is_connected(&self) -> bool;
}

/// [`CommandTransport`] over any async writer, typically the write half of
/// a TCP stream.
pub struct StreamTransport<W> {
    writer: Option<W>,
}

impl<W> StreamTransport<W>
where
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(writer: W) -> Self {
        StreamTransport {
            writer: Some(writer),
        }
    }
}

#[async_trait]
impl<W> CommandTransport for StreamTransport<W>
where
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let w = self.writer.as_mut().ok_or(Error::NotConnected)?;
        w.write_all(data)
            .await
            .map_err(|e| Error::Transport(format!("failed to send command: {e}")))?;
        w.flush()
            .await
            .map_err(|e| Error::Transport(format!("failed to flush command: {e}")))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            let _ = w.shutdown().await;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}
