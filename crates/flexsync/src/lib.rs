//! Synchronization and streaming engine for FlexRadio SmartSDR radios.
//!
//! A client keeps a local copy of the radio's object model (slices,
//! panadapters, meters, streams, ...) in sync with the radio, and turns the
//! VITA-49 datagrams the radio sends into ordered application frames.
//!
//! - **Command channel** ([`command`]) -- sequence-numbered commands with
//!   reply correlation, callbacks, and timeouts.
//! - **Status routing** ([`status`], [`router`], [`registry`]) -- status
//!   lines are tokenized and applied to typed objects, which announce their
//!   lifecycle through [`RadioEvent`]s.
//! - **VITA-49 codec** ([`vita49`]) -- packet headers and the payload
//!   formats of every stream class, in both payload layouts.
//! - **Streams** ([`stream`], [`meters`]) -- per-stream lanes that detect
//!   loss with [`sequence`] tracking and reassemble spectrum, waterfall,
//!   audio, IQ, and Opus frames.
//! - **Session** ([`session`], [`builder`]) -- one connection, its
//!   background tasks, and its teardown.
//!
//! # Architecture
//!
//! TCP lines are consumed by a single parse lane, so status updates and
//! replies are applied in the order the radio sent them. UDP datagrams are
//! demultiplexed by stream id into independent lanes; a slow consumer on one
//! stream never holds up another, or the status path.
//!
//! # Example
//!
//! ```no_run
//! use flexsync::{RadioEvent, SessionBuilder};
//!
//! # async fn example() -> flexsync_core::Result<()> {
//! let session = SessionBuilder::new().host("192.168.1.100").build().await?;
//! let mut events = session.subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let RadioEvent::ObjectAdded(object) = event {
//!         println!("new object: {object}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod codec;
pub mod command;
pub mod meters;
pub mod objects;
pub mod registry;
pub mod router;
pub mod sequence;
pub mod session;
pub mod status;
pub mod stream;
pub mod vita49;

pub use builder::{FirmwareVersion, SessionBuilder, SessionOptions, SessionTransports};
pub use codec::{ProtocolVersion, Reply};
pub use command::{CommandChannel, ReplyCallback};
pub use flexsync_core::{Error, ObjectId, ObjectKind, ObjectRef, RadioEvent, Result};
pub use registry::Registry;
pub use session::Session;
pub use stream::{StreamFrame, StreamKind, StreamStats};
pub use vita49::PayloadLayout;
