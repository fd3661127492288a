//! Crate error types
//!
//! A small hierarchy: encoding failures (`MuxError`) and transport/session
//! failures (`SessionError`), wrapped in a top-level `Error`. End of stream
//! is a status, never an error.

/// Error type for tag/record encoding operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxError {
    /// Encoded output would exceed the fixed buffer bound
    BufferOverflow {
        /// Bytes the encoder would have needed
        needed: usize,
        /// Fixed capacity of the target buffer
        capacity: usize,
    },
    /// SPS/PPS missing, undersized, or over the scratch capacity
    MalformedParameterSets {
        /// What was wrong with the parameter sets
        reason: &'static str,
    },
}

impl std::fmt::Display for MuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MuxError::BufferOverflow { needed, capacity } => {
                write!(
                    f,
                    "encode buffer overflow: need {} bytes, capacity {}",
                    needed, capacity
                )
            }
            MuxError::MalformedParameterSets { reason } => {
                write!(f, "malformed parameter sets: {}", reason)
            }
        }
    }
}

impl std::error::Error for MuxError {}

/// Error type for stream session operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transport refused the connection
    ConnectFailed(String),
    /// Operation attempted before the connection was established
    NotConnected,
    /// The underlying connection has timed out
    TimedOut,
    /// Transport rejected a write
    WriteFailed,
    /// Transport-level read failure mid-stream
    TransportError,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::ConnectFailed(url) => write!(f, "failed to connect: {}", url),
            SessionError::NotConnected => write!(f, "not connected"),
            SessionError::TimedOut => write!(f, "connection timed out"),
            SessionError::WriteFailed => write!(f, "transport write failed"),
            SessionError::TransportError => write!(f, "transport read failed"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Top-level crate error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Tag/record encoding failure
    Mux(MuxError),
    /// Session/transport failure
    Session(SessionError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Mux(e) => write!(f, "{}", e),
            Error::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Mux(e) => Some(e),
            Error::Session(e) => Some(e),
        }
    }
}

impl From<MuxError> for Error {
    fn from(e: MuxError) -> Self {
        Error::Mux(e)
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Session(e)
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let e = MuxError::BufferOverflow {
            needed: 600,
            capacity: 512,
        };
        assert!(e.to_string().contains("600"));
        assert!(e.to_string().contains("512"));

        let e = SessionError::ConnectFailed("rtmp://example/live".into());
        assert!(e.to_string().contains("rtmp://example/live"));
    }

    #[test]
    fn test_conversion() {
        let e: Error = MuxError::MalformedParameterSets {
            reason: "sps too short",
        }
        .into();
        assert!(matches!(e, Error::Mux(_)));

        let e: Error = SessionError::NotConnected.into();
        assert!(matches!(e, Error::Session(_)));
    }
}
