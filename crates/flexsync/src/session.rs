//! A live connection to one radio.
//!
//! [`Session`] owns everything the engine needs for a single radio: the
//! command channel, the object registry, and the stream demuxer. Nothing is
//! global, so several sessions can run side by side.
//!
//! After the `V`/`H` handshake the session runs three kinds of tasks:
//!
//! - the parse lane, which reads TCP lines strictly in arrival order and
//!   applies replies and status updates,
//! - a sweeper that expires unanswered commands,
//! - optionally a UDP receiver feeding the [`StreamDemuxer`], which runs
//!   one lane per open stream.
//!
//! When the TCP connection ends, pending commands fail with
//! [`Error::ConnectionLost`], all stream lanes close, the registry is
//! emptied, and [`RadioEvent::Disconnected`] is sent. Reconnecting is up to
//! the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use flexsync_core::convert::parse_hex_u32;
use flexsync_core::{Error, ObjectId, ObjectKind, ObjectRef, RadioEvent, Result, StreamTransport};

use crate::builder::SessionOptions;
use crate::codec::{self, Line, ProtocolVersion, Reply};
use crate::command::{CommandChannel, ReplyCallback};
use crate::meters::MeterDecoder;
use crate::objects::{RadioObject, RemovalPolicy, StatusToken};
use crate::registry::Registry;
use crate::router::{StatusRouter, stream_kind_from_type};
use crate::status::StatusLine;
use crate::stream::{StreamDemuxer, StreamFrame, StreamKind, StreamStats};

/// Handshake timeout (5 seconds).
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest datagram the UDP receiver accepts.
const MAX_DATAGRAM: usize = 65_536;

/// Lane kind for a created stream, when its type fixes the packet class.
/// DAX RX audio may arrive full or reduced bandwidth, so it is left open.
fn lane_kind(kind: ObjectKind) -> Option<StreamKind> {
    match kind {
        ObjectKind::DaxIqStream => Some(StreamKind::DaxIq),
        ObjectKind::RemoteRxAudioStream => Some(StreamKind::Opus),
        _ => None,
    }
}

pub struct Session {
    commands: Arc<CommandChannel>,
    registry: Arc<Registry>,
    demux: Arc<StreamDemuxer>,
    events: broadcast::Sender<RadioEvent>,
    connected: Arc<AtomicBool>,
    teardown: Teardown,
    handle: u32,
    version: ProtocolVersion,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    /// Connect over TCP and handshake. No UDP receiver is started; see
    /// [`start_udp`](Self::start_udp).
    pub async fn connect(host: &str, tcp_port: u16, options: SessionOptions) -> Result<Self> {
        let addr = format!("{host}:{tcp_port}");
        tracing::debug!(addr = %addr, "Connecting to radio");

        let stream = tokio::time::timeout(HANDSHAKE_TIMEOUT, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(|e| Error::Transport(format!("TCP connect failed: {e}")))?;
        let _ = stream.set_nodelay(true);

        let (read_half, write_half) = stream.into_split();
        Self::from_streams(read_half, write_half, options).await
    }

    /// Handshake over an already-connected stream pair and start the
    /// background tasks.
    pub async fn from_streams<R, W>(read: R, write: W, options: SessionOptions) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + Sync + 'static,
    {
        let mut reader = BufReader::new(read);

        let version = match codec::parse_line(&read_handshake_line(&mut reader).await?)? {
            Line::Version(v) => v,
            other => {
                return Err(Error::Protocol(format!(
                    "expected version line, got: {other:?}"
                )));
            }
        };
        let handle = match codec::parse_line(&read_handshake_line(&mut reader).await?)? {
            Line::Handle(h) => h,
            other => {
                return Err(Error::Protocol(format!(
                    "expected handle line, got: {other:?}"
                )));
            }
        };
        tracing::debug!(version = %version, handle = format!("{handle:08X}"), "Handshake complete");

        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let registry = Arc::new(Registry::new(events.clone()));
        let commands = Arc::new(CommandChannel::new(
            Box::new(StreamTransport::new(write)),
            options.command_timeout,
        ));
        let demux = Arc::new(StreamDemuxer::new(
            MeterDecoder::new(Arc::clone(&registry), options.layout),
            events.clone(),
            options.layout,
            options.frame_capacity,
        ));
        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let teardown = Teardown {
            connected: Arc::clone(&connected),
            commands: Arc::clone(&commands),
            registry: Arc::clone(&registry),
            demux: Arc::clone(&demux),
            events: events.clone(),
        };
        let lane = ParseLane {
            router: StatusRouter::new(Arc::clone(&registry)),
            commands: Arc::clone(&commands),
            demux: Arc::clone(&demux),
            events: events.clone(),
            teardown: teardown.clone(),
            cancel: cancel.clone(),
        };
        let parse_task = tokio::spawn(lane.run(reader));
        let sweep_task = tokio::spawn(sweep_loop(
            Arc::clone(&commands),
            options.sweep_interval,
            cancel.clone(),
        ));

        let session = Session {
            commands,
            registry,
            demux,
            events,
            connected,
            teardown,
            handle,
            version,
            cancel,
            tasks: Mutex::new(vec![parse_task, sweep_task]),
        };

        if options.auto_subscribe {
            session
                .send_command_no_wait(&codec::cmd_client_program(&options.client_name))
                .await?;
            for sub in &options.subscriptions {
                session.send_command_no_wait(&codec::cmd_subscribe(sub)).await?;
            }
        }

        let _ = session.events.send(RadioEvent::Connected);
        tracing::debug!("Session connected");
        Ok(session)
    }

    /// Bind a UDP socket for VITA-49 streams and tell the radio about it.
    ///
    /// Returns the bound port, which differs from `port` only when `port`
    /// is 0.
    pub async fn start_udp(&self, port: u16) -> Result<u16> {
        let bind_addr = format!("0.0.0.0:{port}");
        let socket = UdpSocket::bind(&bind_addr).await.map_err(|e| {
            Error::Transport(format!("failed to bind UDP socket on {bind_addr}: {e}"))
        })?;
        let bound = socket.local_addr()?.port();
        tracing::debug!(port = bound, "UDP VITA-49 receiver started");

        let task = tokio::spawn(udp_loop(socket, Arc::clone(&self.demux), self.cancel.clone()));
        self.tasks.lock().push(task);

        self.send_command_no_wait(&codec::cmd_client_udp_port(bound))
            .await?;
        Ok(bound)
    }

    /// Push one datagram into the stream demuxer, for callers that own
    /// the UDP socket themselves.
    pub fn feed_datagram(&self, datagram: Bytes) {
        self.demux.dispatch(datagram);
    }

    /// Send a command and wait for a successful reply.
    pub async fn send_command(&self, command: &str) -> Result<Reply> {
        self.ensure_connected()?;
        self.commands.send_with_check(command).await
    }

    /// Send a command without waiting for its reply.
    pub async fn send_command_no_wait(&self, command: &str) -> Result<u32> {
        self.ensure_connected()?;
        self.commands.send(command, None).await
    }

    /// Send a command with a completion callback.
    pub async fn send_command_with(&self, command: &str, on_reply: ReplyCallback) -> Result<u32> {
        self.ensure_connected()?;
        self.commands.send(command, Some(on_reply)).await
    }

    /// Set a property of an object: update the local copy right away, then
    /// send the matching set command.
    ///
    /// A later status line from the radio overwrites the local value. A
    /// failed reply is logged; it does not roll back the local value.
    pub async fn set_property<K: RadioObject>(
        &self,
        id: &ObjectId,
        token: K::Token,
        value: &str,
    ) -> Result<u32> {
        self.ensure_connected()?;
        let command = K::set_command(id, token, value).ok_or_else(|| {
            Error::InvalidParameter(format!("{} {id} {} is read-only", K::KIND, token.as_str()))
        })?;
        K::store(&self.registry).set_local(id, token, value)?;

        let object = ObjectRef::new(K::KIND, id.clone());
        let callback: ReplyCallback = Box::new(move |seq, result| match result {
            Ok(reply) if !reply.is_ok() => {
                tracing::warn!(
                    seq,
                    object = %object,
                    code = format!("0x{:08X}", reply.error_code),
                    message = %reply.message,
                    "Property set rejected"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(seq, object = %object, error = %e, "Property set failed");
            }
        });
        self.commands.send(&command, Some(callback)).await
    }

    /// Create a stream with a `stream create ...` command and open its lane.
    ///
    /// Returns the radio-assigned handle and the frame receiver. DAX IQ and
    /// remote RX audio lanes accept only their own packet class; for other
    /// types the lane kind is fixed by the first packet that arrives.
    pub async fn create_stream(&self, command: &str) -> Result<(u32, mpsc::Receiver<StreamFrame>)> {
        let reply = self.send_command(command).await?;
        let stream_id = parse_hex_u32(reply.message.trim()).ok_or_else(|| {
            Error::Protocol(format!("stream create reply has no handle: {}", reply.message))
        })?;

        let kind = StatusLine::parse(command)
            .field("type")
            .and_then(stream_kind_from_type)
            .and_then(lane_kind);
        tracing::debug!(
            stream_id = format!("0x{stream_id:08X}"),
            kind = ?kind,
            "Stream created"
        );
        Ok((stream_id, self.demux.open(stream_id, kind)))
    }

    /// Open a lane for a stream the radio created on its own, such as a
    /// panadapter or waterfall.
    pub fn attach_stream(&self, stream_id: u32, kind: StreamKind) -> mpsc::Receiver<StreamFrame> {
        self.demux.open(stream_id, Some(kind))
    }

    /// Close a lane without telling the radio.
    pub fn detach_stream(&self, stream_id: u32) -> bool {
        self.demux.close(stream_id)
    }

    /// Close a stream's lane and ask the radio to remove it.
    ///
    /// The lane closes before the command is sent, so no frame is
    /// delivered after this call. Kinds whose removal the radio never
    /// confirms are evicted from the registry immediately.
    pub async fn remove_stream(&self, stream_id: u32) -> Result<()> {
        self.demux.close(stream_id);

        if let Some(kind) = self.registry.stream_kind(stream_id) {
            if self.registry.removal_policy(kind) == RemovalPolicy::ClientAsserted {
                self.registry
                    .remove(&ObjectRef::new(kind, ObjectId::Handle(stream_id)));
            }
        }

        self.send_command(&codec::cmd_stream_remove(stream_id))
            .await
            .map(|_| ())
    }

    /// Counters of an open stream lane.
    pub fn stream_stats(&self, stream_id: u32) -> Option<StreamStats> {
        self.demux.stats(stream_id)
    }

    /// Read-only view of the synchronized radio model.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A new receiver on the session's event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Client handle assigned by the radio during the handshake.
    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Protocol version announced during the handshake.
    pub fn version(&self) -> &ProtocolVersion {
        &self.version
    }

    /// Commands still waiting for a reply.
    pub fn pending_commands(&self) -> usize {
        self.commands.pending_count()
    }

    /// Close the connection and stop every background task.
    pub async fn disconnect(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        tracing::debug!("Disconnecting session");

        self.cancel.cancel();
        let close = self.commands.close().await;
        self.teardown.run();
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        close
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Shared connection-loss cleanup, run once by whichever side notices first.
#[derive(Clone)]
struct Teardown {
    connected: Arc<AtomicBool>,
    commands: Arc<CommandChannel>,
    registry: Arc<Registry>,
    demux: Arc<StreamDemuxer>,
    events: broadcast::Sender<RadioEvent>,
}

impl Teardown {
    fn run(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.commands.fail_all();
        self.demux.close_all();
        self.registry.clear();
        let _ = self.events.send(RadioEvent::Disconnected);
        tracing::debug!("Session disconnected");
    }
}

/// Read a single line during the handshake phase.
async fn read_handshake_line<R>(reader: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    match tokio::time::timeout(HANDSHAKE_TIMEOUT, reader.read_line(&mut line)).await {
        Ok(Ok(0)) => Err(Error::ConnectionLost),
        Ok(Ok(_)) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        Ok(Err(e)) => Err(Error::Transport(format!("handshake read error: {e}"))),
        Err(_) => Err(Error::Timeout),
    }
}

/// The single sequential consumer of inbound TCP lines.
struct ParseLane {
    router: StatusRouter,
    commands: Arc<CommandChannel>,
    demux: Arc<StreamDemuxer>,
    events: broadcast::Sender<RadioEvent>,
    teardown: Teardown,
    cancel: CancellationToken,
}

impl ParseLane {
    async fn run<R>(self, mut reader: R)
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        loop {
            line.clear();
            let read = tokio::select! {
                _ = self.cancel.cancelled() => return,
                read = reader.read_line(&mut line) => read,
            };
            match read {
                Ok(0) => {
                    tracing::debug!("TCP connection closed by radio");
                    break;
                }
                Ok(_) => self.handle_line(line.trim_end_matches(['\r', '\n'])),
                Err(e) => {
                    tracing::debug!(error = %e, "TCP read error");
                    break;
                }
            }
        }
        self.teardown.run();
    }

    fn handle_line(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match codec::parse_line(text) {
            Ok(Line::Reply(reply)) => {
                tracing::trace!(seq = reply.sequence, code = reply.error_code, "Reply received");
                self.commands.handle_reply(reply);
            }
            Ok(Line::Status(status)) => {
                for removed in self.router.route(&status.payload) {
                    self.release_stream(&removed);
                }
            }
            Ok(Line::Message { severity, text }) => {
                tracing::debug!(severity, message = %text, "Radio message");
                let _ = self.events.send(RadioEvent::Message { severity, text });
            }
            Ok(Line::Version(v)) => {
                tracing::warn!(version = %v, "Unexpected version line after handshake");
            }
            Ok(Line::Handle(h)) => {
                tracing::warn!(
                    handle = format!("{h:08X}"),
                    "Unexpected handle line after handshake"
                );
            }
            Ok(Line::Unknown(line)) => {
                tracing::trace!(line = %line, "Unknown line from radio");
            }
            Err(e) => {
                tracing::debug!(error = %e, line = %text, "Failed to parse line");
            }
        }
    }

    /// Close the lane of a removed object that carried a stream.
    fn release_stream(&self, object: &ObjectRef) {
        if !object.kind.carries_stream() {
            return;
        }
        if let ObjectId::Handle(handle) = object.id {
            if self.demux.close(handle) {
                tracing::debug!(object = %object, "Stream lane closed by radio removal");
            }
        }
    }
}

async fn sweep_loop(commands: Arc<CommandChannel>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                let expired = commands.expire(tokio::time::Instant::now());
                if expired > 0 {
                    tracing::debug!(expired, "Expired unanswered commands");
                }
            }
        }
    }
}

async fn udp_loop(socket: UdpSocket, demux: Arc<StreamDemuxer>, cancel: CancellationToken) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => return,
            received = socket.recv(&mut buf) => received,
        };
        match received {
            Ok(n) => demux.dispatch(Bytes::copy_from_slice(&buf[..n])),
            Err(e) => {
                tracing::debug!(error = %e, "UDP receive error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexsync_test_harness::{MockRadio, vita};

    use crate::builder::SessionBuilder;

    use crate::objects::Slice;
    use crate::objects::slice::SliceToken;

    const WAIT: Duration = Duration::from_secs(2);

    async fn connect(radio: &MockRadio) -> Session {
        SessionBuilder::new()
            .host("127.0.0.1")
            .tcp_port(radio.addr().port())
            .without_udp()
            .build()
            .await
            .unwrap()
    }

    async fn next_event(rx: &mut broadcast::Receiver<RadioEvent>) -> RadioEvent {
        tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("event timeout")
            .expect("event channel closed")
    }

    async fn wait_until(mut check: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + WAIT;
        while !check() {
            assert!(tokio::time::Instant::now() < deadline, "condition not reached");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn handshake_and_auto_subscribe() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        assert_eq!(session.handle(), radio.handle());
        assert_eq!(session.version().to_string(), "1.4.0.0");

        radio
            .wait_for_command("sub daxiq all", WAIT)
            .await
            .expect("subscriptions sent");
        assert_eq!(
            radio.commands(),
            vec![
                "client program flexsync",
                "sub slice all",
                "sub pan all",
                "sub tx all",
                "sub meter all",
                "sub audio_stream all",
                "sub daxiq all",
            ]
        );
    }

    #[tokio::test]
    async fn status_lines_populate_registry() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_status("slice 0 pan=0x40000000 RF_frequency=14.250000 mode=USB");
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::ObjectAdded(ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0)))
        );
        let slice = session
            .registry()
            .slices()
            .get_initialized(&ObjectId::Index(0))
            .unwrap();
        assert_eq!(slice.read().frequency_hz, 14_250_000);

        radio.push_status("slice 0 in_use=0");
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::ObjectWillBeRemoved(ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0)))
        );
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::ObjectRemoved(ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0)))
        );
        assert!(session.registry().slices().is_empty());
    }

    #[tokio::test]
    async fn command_reply_and_failure() {
        let radio = MockRadio::start().await.unwrap();
        radio.reply_to("radio info", 0, "model=FLEX-6600");
        radio.reply_to("slice tune 9", 0x5000_0015, "Invalid slice");
        let session = connect(&radio).await;

        let reply = session.send_command("radio info").await.unwrap();
        assert_eq!(reply.message, "model=FLEX-6600");

        match session.send_command("slice tune 9 14.1").await {
            Err(Error::CommandFailed { code, message, .. }) => {
                assert_eq!(code, 0x5000_0015);
                assert_eq!(message, "Invalid slice");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unanswered_command_times_out() {
        let radio = MockRadio::start().await.unwrap();
        radio.ignore("radio info");
        let session = SessionBuilder::new()
            .host("127.0.0.1")
            .tcp_port(radio.addr().port())
            .without_udp()
            .command_timeout(Duration::from_millis(100))
            .sweep_interval(Duration::from_millis(20))
            .build()
            .await
            .unwrap();

        assert!(matches!(
            session.send_command("radio info").await,
            Err(Error::Timeout)
        ));
        assert_eq!(session.pending_commands(), 0);
    }

    #[tokio::test]
    async fn set_property_applies_locally_and_sends() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_status("slice 0 pan=0x40000000 RF_frequency=14.250000 mode=USB");
        next_event(&mut events).await;

        session
            .set_property::<Slice>(&ObjectId::Index(0), SliceToken::Mode, "CW")
            .await
            .unwrap();
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::PropertyChanged {
                object: ObjectRef::new(ObjectKind::Slice, ObjectId::Index(0)),
                token: "mode",
            }
        );
        radio
            .wait_for_command("slice set 0 mode=CW", WAIT)
            .await
            .expect("set command sent");

        session
            .set_property::<Slice>(&ObjectId::Index(0), SliceToken::Frequency, "7.040000")
            .await
            .unwrap();
        radio
            .wait_for_command("slice tune 0 7.040000", WAIT)
            .await
            .expect("tune command sent");

        let missing = session
            .set_property::<Slice>(&ObjectId::Index(5), SliceToken::Mode, "CW")
            .await;
        assert!(matches!(missing, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn create_and_remove_stream() {
        let radio = MockRadio::start().await.unwrap();
        radio.reply_to("stream create", 0, "04000008");
        let session = connect(&radio).await;

        let (id, mut frames) = session
            .create_stream(&codec::cmd_stream_create_dax_rx(1))
            .await
            .unwrap();
        assert_eq!(id, 0x0400_0008);

        session.feed_datagram(Bytes::from(vita::packet(
            vita::CLASS_DAX_AUDIO,
            id,
            0,
            &vita::f32_payload(&[0.25, 0.5]),
        )));
        let frame = tokio::time::timeout(WAIT, frames.recv()).await.unwrap().unwrap();
        assert!(matches!(frame, StreamFrame::Audio(ref s) if s.len() == 1));
        assert_eq!(session.stream_stats(id).unwrap().frames_delivered, 1);

        session.remove_stream(id).await.unwrap();
        assert!(session.stream_stats(id).is_none());
        assert!(radio.commands().contains(&"stream remove 0x04000008".to_string()));
        assert!(tokio::time::timeout(WAIT, frames.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dax_iq_lane_rejects_other_classes() {
        let radio = MockRadio::start().await.unwrap();
        radio.reply_to("stream create", 0, "20000001");
        let session = connect(&radio).await;

        let (id, mut frames) = session
            .create_stream(&codec::cmd_stream_create_dax_iq(1))
            .await
            .unwrap();
        session.feed_datagram(Bytes::from(vita::packet(
            vita::CLASS_DAX_AUDIO,
            id,
            0,
            &vita::f32_payload(&[0.25, 0.5]),
        )));
        session.feed_datagram(Bytes::from(vita::packet(
            vita::CLASS_DAX_IQ_48K,
            id,
            0,
            &vita::f32_payload(&[0.25, -0.75]),
        )));

        let frame = tokio::time::timeout(WAIT, frames.recv()).await.unwrap().unwrap();
        assert!(matches!(
            frame,
            StreamFrame::Iq { rate: 48_000, ref samples } if samples.len() == 1
        ));
        let stats = session.stream_stats(id).unwrap();
        assert_eq!(stats.malformed_packets, 1);
        assert_eq!(stats.frames_delivered, 1);
    }

    #[tokio::test]
    async fn remote_rx_lane_carries_opus() {
        let radio = MockRadio::start().await.unwrap();
        radio.reply_to("stream create", 0, "07000001");
        let session = connect(&radio).await;

        let (id, mut frames) = session
            .create_stream(&codec::cmd_stream_create_remote_rx())
            .await
            .unwrap();
        assert_eq!(id, 0x0700_0001);
        assert!(
            radio
                .commands()
                .contains(&"stream create type=remote_audio_rx compression=opus".to_string())
        );

        session.feed_datagram(Bytes::from(vita::packet(
            vita::CLASS_DAX_AUDIO,
            id,
            0,
            &vita::f32_payload(&[0.25, 0.5]),
        )));
        session.feed_datagram(Bytes::from(vita::packet(vita::CLASS_OPUS, id, 0, &[1, 2, 3, 4])));

        let frame = tokio::time::timeout(WAIT, frames.recv()).await.unwrap().unwrap();
        assert_eq!(frame, StreamFrame::Opus(Bytes::from_static(&[1, 2, 3, 4])));
        assert_eq!(session.stream_stats(id).unwrap().malformed_packets, 1);
    }

    #[tokio::test]
    async fn client_asserted_stream_evicted_on_remove() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_status(
            "stream 0x07000001 type=remote_audio_rx compression=OPUS client_handle=0x12345678",
        );
        let added = next_event(&mut events).await;
        assert_eq!(
            added,
            RadioEvent::ObjectAdded(ObjectRef::new(
                ObjectKind::RemoteRxAudioStream,
                ObjectId::Handle(0x0700_0001)
            ))
        );

        session.remove_stream(0x0700_0001).await.unwrap();
        assert!(session.registry().remote_rx_streams().is_empty());
    }

    #[tokio::test]
    async fn radio_removal_closes_lane() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_status("stream 0x04000009 type=dax_rx dax_channel=2 client_handle=0x12345678");
        next_event(&mut events).await;
        let mut frames = session.attach_stream(0x0400_0009, StreamKind::DaxAudio);
        assert!(session.stream_stats(0x0400_0009).is_some());

        radio.push_status("stream 0x04000009 removed");
        assert!(tokio::time::timeout(WAIT, frames.recv()).await.unwrap().is_none());
        assert!(session.stream_stats(0x0400_0009).is_none());
        assert!(session.registry().dax_rx_streams().is_empty());
    }

    #[tokio::test]
    async fn connection_loss_tears_down() {
        let radio = MockRadio::start().await.unwrap();
        radio.ignore("radio info");
        let session = Arc::new(connect(&radio).await);
        let mut events = session.subscribe();

        radio.push_status("slice 0 pan=0x40000000 RF_frequency=14.250000 mode=USB");
        next_event(&mut events).await;
        let _frames = session.attach_stream(0x4000_0000, StreamKind::Panadapter);

        let waiter = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send_command("radio info").await })
        };
        radio.wait_for_command("radio info", WAIT).await.unwrap();

        radio.disconnect();
        assert!(matches!(waiter.await.unwrap(), Err(Error::ConnectionLost)));
        wait_until(|| !session.is_connected()).await;
        assert_eq!(next_event(&mut events).await, RadioEvent::Disconnected);
        assert!(session.registry().slices().is_empty());
        assert!(session.stream_stats(0x4000_0000).is_none());
        assert!(matches!(
            session.send_command("info").await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn messages_become_events() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_line("M10000001|Client connected from IP 10.0.0.2");
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::Message {
                severity: 0,
                text: "Client connected from IP 10.0.0.2".into(),
            }
        );
    }

    #[tokio::test]
    async fn meter_datagrams_update_values() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();

        radio.push_status("meter 12.src=RAD#12.num=0#12.nam=+13.8A#12.unit=Volts#");
        next_event(&mut events).await;

        session.feed_datagram(Bytes::from(vita::packet(
            vita::CLASS_METER,
            0x0000_0700,
            0,
            &vita::meter_payload(&[(12, 3532)]),
        )));
        assert_eq!(
            next_event(&mut events).await,
            RadioEvent::MeterUpdated {
                id: 12,
                value: 3532.0 / 256.0,
            }
        );
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let radio = MockRadio::start().await.unwrap();
        let session = connect(&radio).await;
        let mut events = session.subscribe();
        session.disconnect().await.unwrap();
        assert!(!session.is_connected());
        assert_eq!(next_event(&mut events).await, RadioEvent::Disconnected);
        session.disconnect().await.unwrap();
    }
}
