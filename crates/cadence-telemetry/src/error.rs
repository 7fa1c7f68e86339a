//! Error types for the telemetry bridge.
//!
//! None of these reach the scheduler: the bridge swallows them into its
//! drop counters, and only connection setup reports them to the caller.

use std::error::Error;
use std::fmt;
use std::io;
use std::net::SocketAddr;

// ── TelemetryError ─────────────────────────────────────────────────

/// Errors from managing the outbound connection.
#[derive(Debug)]
pub enum TelemetryError {
    /// Connecting to the consumer failed.
    Connect {
        /// The consumer address.
        addr: SocketAddr,
        /// The underlying socket error.
        source: io::Error,
    },
    /// The channel has been closed and will not connect again.
    Closed,
    /// An I/O error while configuring an established connection.
    Io(io::Error),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect { addr, source } => {
                write!(f, "failed to connect to telemetry consumer at {addr}: {source}")
            }
            Self::Closed => write!(f, "telemetry channel is closed"),
            Self::Io(e) => write!(f, "telemetry I/O error: {e}"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connect { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<io::Error> for TelemetryError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ── WriteOutcome ───────────────────────────────────────────────────

/// Why a message was not written. Every variant means the message was
/// dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No connection is established.
    NotConnected,
    /// The socket's send buffer is full.
    WouldBlock,
    /// The connection is being set up or torn down on another thread.
    Contended,
    /// The write failed; the connection has been torn down.
    Failed,
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::WouldBlock => write!(f, "send buffer full"),
            Self::Contended => write!(f, "channel busy"),
            Self::Failed => write!(f, "write failed"),
        }
    }
}

impl Error for WriteOutcome {}

// ── WireError ──────────────────────────────────────────────────────

/// A received line is not a valid telemetry record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The line is not valid UTF-8.
    NotUtf8,
    /// The line does not have exactly four comma-separated fields.
    FieldCount {
        /// Number of fields found.
        found: usize,
    },
    /// The kind tag is not a known signal kind.
    UnknownKind {
        /// The tag as received.
        tag: String,
    },
    /// The subject field is not a non-negative integer.
    InvalidSubject {
        /// The field as received.
        field: String,
    },
    /// The value field is not a real number.
    InvalidValue {
        /// The field as received.
        field: String,
    },
    /// The time field is not a finite, non-negative real number.
    InvalidTime {
        /// The field as received.
        field: String,
    },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotUtf8 => write!(f, "line is not valid UTF-8"),
            Self::FieldCount { found } => write!(f, "expected 4 fields, found {found}"),
            Self::UnknownKind { tag } => write!(f, "unknown kind '{tag}'"),
            Self::InvalidSubject { field } => write!(f, "invalid subject id '{field}'"),
            Self::InvalidValue { field } => write!(f, "invalid value '{field}'"),
            Self::InvalidTime { field } => write!(f, "invalid virtual time '{field}'"),
        }
    }
}

impl Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_error_exposes_source() {
        let err = TelemetryError::Connect {
            addr: SocketAddr::from(([127, 0, 0, 1], 5555)),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert!(err.to_string().contains("127.0.0.1:5555"));
        assert!(err.source().is_some());
        assert!(TelemetryError::Closed.source().is_none());
    }

    #[test]
    fn io_error_converts() {
        fn configure() -> Result<(), TelemetryError> {
            Err::<(), _>(io::Error::from(io::ErrorKind::InvalidInput))?;
            Ok(())
        }
        assert!(matches!(configure(), Err(TelemetryError::Io(_))));
    }
}
