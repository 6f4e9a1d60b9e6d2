//! SessionBuilder -- fluent builder for constructing [`Session`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! network parameters, stream layout, and subscriptions before
//! establishing the TCP connection to the radio.
//!
//! # Example
//!
//! ```no_run
//! use flexsync::builder::{FirmwareVersion, SessionBuilder};
//!
//! # async fn example() -> flexsync_core::Result<()> {
//! let firmware = FirmwareVersion::parse("3.3.32.8203")?;
//! let session = SessionBuilder::new()
//!     .host("192.168.1.100")
//!     .firmware(&firmware)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use flexsync_core::{Error, Result};

use crate::codec::ProtocolVersion;
use crate::session::Session;
use crate::vita49::PayloadLayout;

/// Default SmartSDR TCP command port.
pub const DEFAULT_TCP_PORT: u16 = 4992;

/// Default SmartSDR VITA-49 UDP port.
pub const DEFAULT_UDP_PORT: u16 = 4991;

/// Default client program name.
const DEFAULT_CLIENT_NAME: &str = "flexsync";

/// Default command timeout.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// How often pending commands are checked for expiry.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// Broadcast channel capacity for event subscribers.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Frames buffered per stream consumer.
const DEFAULT_FRAME_CAPACITY: usize = 32;

/// Subscriptions sent after connecting.
const DEFAULT_SUBSCRIPTIONS: &[&str] = &[
    "slice all",
    "pan all",
    "tx all",
    "meter all",
    "audio_stream all",
    "daxiq all",
];

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Client program name sent during registration.
    pub client_name: String,
    /// Timeout for individual command replies.
    pub command_timeout: Duration,
    /// Period of the pending-reply sweep.
    pub sweep_interval: Duration,
    /// Payload-header layout of spectrum and waterfall streams.
    pub layout: PayloadLayout,
    /// Send the client registration and subscriptions after connect.
    pub auto_subscribe: bool,
    /// Objects subscribed to, as in `sub <object>`.
    pub subscriptions: Vec<String>,
    pub event_capacity: usize,
    pub frame_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            layout: PayloadLayout::default(),
            auto_subscribe: true,
            subscriptions: DEFAULT_SUBSCRIPTIONS.iter().map(|s| s.to_string()).collect(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }
}

/// A radio firmware version, used to pick the stream payload layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareVersion(pub ProtocolVersion);

impl FirmwareVersion {
    /// Parse a dotted `major.minor.patch.build` string.
    pub fn parse(text: &str) -> Result<Self> {
        ProtocolVersion::parse(text.trim()).map(FirmwareVersion)
    }

    /// Firmware before v2 uses the legacy payload headers.
    pub fn layout(&self) -> PayloadLayout {
        if self.0.major < 2 {
            PayloadLayout::Legacy
        } else {
            PayloadLayout::Current
        }
    }
}

/// Pre-connected async streams for constructing a [`Session`] without a
/// real TCP connection, for example from [`tokio::io::duplex()`] in tests.
///
/// The reader is wrapped in a `BufReader` by the session; pass a raw one.
pub struct SessionTransports {
    pub read: Box<dyn AsyncRead + Unpin + Send + 'static>,
    pub write: Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>,
}

/// Fluent builder for [`Session`].
pub struct SessionBuilder {
    host: Option<String>,
    tcp_port: u16,
    udp_port: Option<u16>,
    options: SessionOptions,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        SessionBuilder {
            host: None,
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: Some(DEFAULT_UDP_PORT),
            options: SessionOptions::default(),
        }
    }

    /// Set the radio's IP address or hostname.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    /// Set the SmartSDR TCP command port (default: 4992).
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Set the local VITA-49 UDP port (default: 4991). Port 0 binds any
    /// free port.
    pub fn udp_port(mut self, port: u16) -> Self {
        self.udp_port = Some(port);
        self
    }

    /// Do not open a UDP receiver. Datagrams can still be pushed through
    /// [`Session::feed_datagram`].
    pub fn without_udp(mut self) -> Self {
        self.udp_port = None;
        self
    }

    /// Set the client program name sent during registration (default: "flexsync").
    pub fn client_name(mut self, name: &str) -> Self {
        self.options.client_name = name.to_string();
        self
    }

    /// Set the command reply timeout (default: 2 s).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.options.command_timeout = timeout;
        self
    }

    /// Set the pending-reply sweep period (default: 250 ms).
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.options.sweep_interval = interval;
        self
    }

    pub fn layout(mut self, layout: PayloadLayout) -> Self {
        self.options.layout = layout;
        self
    }

    /// Pick the payload layout matching a radio firmware version.
    pub fn firmware(mut self, version: &FirmwareVersion) -> Self {
        self.options.layout = version.layout();
        self
    }

    /// Enable or disable registration and subscriptions after connect
    /// (default: enabled).
    pub fn auto_subscribe(mut self, enable: bool) -> Self {
        self.options.auto_subscribe = enable;
        self
    }

    /// Replace the subscription list.
    pub fn subscriptions<I, S>(mut self, subscriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.subscriptions = subscriptions.into_iter().map(Into::into).collect();
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.options.event_capacity = capacity;
        self
    }

    pub fn frame_capacity(mut self, capacity: usize) -> Self {
        self.options.frame_capacity = capacity;
        self
    }

    /// The options assembled so far.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Connect to the radio, handshake, and start the UDP receiver.
    ///
    /// Requires that [`host()`](Self::host) has been called.
    pub async fn build(self) -> Result<Session> {
        let host = self.host.as_ref().ok_or_else(|| {
            Error::InvalidParameter("host is required: call .host() before .build()".into())
        })?;

        let session = Session::connect(host, self.tcp_port, self.options).await?;
        if let Some(port) = self.udp_port {
            session.start_udp(port).await?;
        }
        Ok(session)
    }

    /// Build a [`Session`] over pre-connected async streams.
    ///
    /// No UDP receiver is started; feed datagrams with
    /// [`Session::feed_datagram`].
    pub async fn build_with_transport(self, transports: SessionTransports) -> Result<Session> {
        Session::from_streams(transports.read, transports.write, self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn default_options() {
        let options = SessionOptions::default();
        assert_eq!(options.client_name, "flexsync");
        assert_eq!(options.command_timeout, Duration::from_secs(2));
        assert_eq!(options.sweep_interval, Duration::from_millis(250));
        assert_eq!(options.layout, PayloadLayout::Current);
        assert!(options.auto_subscribe);
        assert_eq!(options.subscriptions.len(), 6);
        assert_eq!(options.subscriptions[0], "slice all");
    }

    #[test]
    fn builder_setters() {
        let builder = SessionBuilder::new()
            .client_name("logger")
            .command_timeout(Duration::from_millis(500))
            .layout(PayloadLayout::Legacy)
            .subscriptions(["slice all", "meter all"])
            .frame_capacity(4);
        let options = builder.options();
        assert_eq!(options.client_name, "logger");
        assert_eq!(options.command_timeout, Duration::from_millis(500));
        assert_eq!(options.layout, PayloadLayout::Legacy);
        assert_eq!(options.subscriptions, vec!["slice all", "meter all"]);
        assert_eq!(options.frame_capacity, 4);
    }

    #[test]
    fn firmware_selects_layout() {
        let old = FirmwareVersion::parse("1.4.0.0").unwrap();
        assert_eq!(old.layout(), PayloadLayout::Legacy);
        let new = FirmwareVersion::parse("2.4.9.2").unwrap();
        assert_eq!(new.layout(), PayloadLayout::Current);
        assert!(FirmwareVersion::parse("v3").is_err());

        let builder = SessionBuilder::new().firmware(&old);
        assert_eq!(builder.options().layout, PayloadLayout::Legacy);
    }

    #[tokio::test]
    async fn build_requires_host() {
        let result = SessionBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_with_duplex_transport() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, mut server_write) = tokio::io::split(server);

        server_write
            .write_all(b"V1.4.0.0\nH2A000001\n")
            .await
            .unwrap();

        let session = SessionBuilder::new()
            .client_name("duplex")
            .subscriptions(["slice all"])
            .build_with_transport(SessionTransports {
                read: Box::new(client_read),
                write: Box::new(client_write),
            })
            .await
            .unwrap();
        assert_eq!(session.handle(), 0x2A00_0001);
        assert!(session.is_connected());

        let mut lines = BufReader::new(server_read).lines();
        assert_eq!(
            lines.next_line().await.unwrap().as_deref(),
            Some("C1|client program duplex")
        );
        assert_eq!(
            lines.next_line().await.unwrap().as_deref(),
            Some("C2|sub slice all")
        );
    }
}
