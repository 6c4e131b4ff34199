//! Unified error type for NodeManager clients.

use nodemanager_protocol::{ProtocolError, StatusClass, StatusCode, StatusError};
use nodemanager_transport::TransportError;

/// Top-level error returned by every client operation.
///
/// The variants follow where the failure happened:
///
/// - [`Transport`](Self::Transport): the channel could not carry the exchange.
/// - [`Protocol`](Self::Protocol): the bytes were not a valid envelope.
/// - [`Status`](Self::Status): the daemon answered with a non-2xx code.
/// - [`Validation`](Self::Validation) and [`NotAttached`](Self::NotAttached):
///   rejected locally before the request was sent.
///
/// The `#[from]` attributes let `?` lift sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (connect, send, recv, timeout).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unexpected reply shape).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The daemon classified the request as failed.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// The arguments were rejected before any traffic.
    #[error("invalid request: {0}")]
    Validation(String),

    /// `delete_number` was asked to detach a number the IMSI does not have.
    #[error("number {number} not attached to IMSI {imsi}")]
    NotAttached { imsi: String, number: String },
}

impl ClientError {
    /// The daemon's status code, when the failure came from a reply.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(err) => Some(err.code()),
            _ => None,
        }
    }

    /// The band of the daemon's status code, when there is one.
    pub fn status_class(&self) -> Option<StatusClass> {
        self.status().map(StatusCode::class)
    }

    /// `true` when the daemon reported that nothing matched (404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(err) if err.is_not_found())
    }

    /// `true` when the channel itself failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// `true` when the request never left the client.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotAttached { .. })
    }
}
