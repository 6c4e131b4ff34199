//! Error types for the protocol layer.
//!
//! Two enums live here. [`ProtocolError`] means the bytes or the envelope
//! shape were wrong. [`StatusError`] means the envelope was fine but the
//! daemon's status code says the request did not succeed.

use serde_json::Value;

use crate::status::{StatusClass, StatusCode};

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a reply without a `code` key, or
    /// a field of the wrong JSON type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates the protocol's shape rules, e.g. a
    /// read request whose `fields` is a mapping, or a reply whose `data`
    /// is not the shape the command returns.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// A reply whose status code is not in the success band.
///
/// 4xx and 5xx share one kind because the daemon itself does not separate
/// caller faults from its own faults. The carried [`StatusCode`] keeps the
/// full information; use [`StatusError::class`] to tell them apart.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatusError {
    /// The daemon rejected the request (4xx) or failed to carry it out (5xx).
    #[error("invalid request: {} ({code})", code.reason())]
    InvalidRequest {
        code: StatusCode,
        data: Option<Value>,
    },

    /// The code lies outside every band the protocol defines.
    #[error("unclassified status code {code}")]
    Unclassified {
        code: StatusCode,
        data: Option<Value>,
    },
}

impl StatusError {
    /// Returns the status code carried by the reply.
    pub fn code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { code, .. } | Self::Unclassified { code, .. } => *code,
        }
    }

    /// Returns the band the carried code falls in.
    pub fn class(&self) -> StatusClass {
        self.code().class()
    }

    /// Returns the reply payload, if the daemon sent one.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::InvalidRequest { data, .. } | Self::Unclassified { data, .. } => {
                data.as_ref()
            }
        }
    }

    /// `true` when the daemon reported that the qualifier matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InvalidRequest { code, .. } if *code == StatusCode::NOT_FOUND)
    }
}
