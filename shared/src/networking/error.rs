use std::{io, time::Duration};

/// Everything that can go wrong on a coordinator/worker connection.
///
/// Variants fall in two classes: transport failures (the peer is gone or slow) and
/// protocol failures (the peer sent something we cannot act on).
#[derive(Debug, thiserror::Error)]
pub enum NetworkingError {
    #[error("I/O error: {0}")]
    Io(io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {length} bytes exceeds the {max} byte limit")]
    FrameTooLarge { length: u32, max: u32 },

    #[error("protocol violation: {reason}")]
    Protocol { reason: String },
}

impl NetworkingError {
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::ConnectionClosed | Self::Timeout(_)
        )
    }
}

impl From<io::Error> for NetworkingError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe => Self::ConnectionClosed,
            _ => Self::Io(e),
        }
    }
}
