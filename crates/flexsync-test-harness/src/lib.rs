//! flexsync-test-harness: Test utilities, mock transports, and packet
//! builders for flexsync.
//!
//! This crate provides [`RecordingTransport`] for unit testing the command
//! channel without a socket, [`MockRadio`] for exercising a full session
//! over TCP against a scripted radio, and the [`vita`] module for building
//! VITA-49 datagrams byte by byte.

pub mod mock_radio;
pub mod recording;
pub mod vita;

pub use mock_radio::MockRadio;
pub use recording::RecordingTransport;
