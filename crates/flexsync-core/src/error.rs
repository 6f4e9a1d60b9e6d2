//! Error types for flexsync.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport, protocol, and command-level
//! failures are all captured here.

/// The error type for all flexsync operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (TCP socket, UDP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (malformed line, short VITA-49 packet).
    ///
    /// Lanes log and skip these; they never stop status or stream
    /// processing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for a reply from the radio.
    #[error("timeout waiting for response")]
    Timeout,

    /// The radio answered a command with a non-zero error code.
    #[error("command {sequence} failed with 0x{code:08X}: {message}")]
    CommandFailed {
        /// Sequence number of the failed command.
        sequence: u32,
        /// Error code from the reply line.
        code: u32,
        /// Reply text, surfaced verbatim.
        message: String,
    },

    /// An invalid parameter was passed to an API call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the radio has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the radio was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_protocol() {
        let e = Error::Protocol("packet too short".into());
        assert_eq!(e.to_string(), "protocol error: packet too short");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_command_failed() {
        let e = Error::CommandFailed {
            sequence: 7,
            code: 0x5000_0015,
            message: "Invalid slice".into(),
        };
        assert_eq!(
            e.to_string(),
            "command 7 failed with 0x50000015: Invalid slice"
        );
    }

    #[test]
    fn error_display_connection_lost() {
        assert_eq!(Error::ConnectionLost.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
