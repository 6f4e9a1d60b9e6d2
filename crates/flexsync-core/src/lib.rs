//! flexsync-core: shared types, errors, and events for flexsync.
//!
//! This crate holds the pieces that both the synchronization engine and
//! its test harness need without pulling in the engine itself.
//!
//! # Key types
//!
//! - [`Error`] / [`Result`] -- error handling
//! - [`RadioEvent`] -- object lifecycle and stream notifications
//! - [`ObjectKind`] / [`ObjectId`] / [`ObjectRef`] -- radio-side object identity
//! - [`CommandTransport`] -- outbound byte sink for the command channel
//! - [`convert`] -- status value conversion helpers

pub mod convert;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::RadioEvent;
pub use transport::{CommandTransport, StreamTransport};
pub use types::{ObjectId, ObjectKind, ObjectRef};
