//! Status codes and reply classification.
//!
//! Every reply carries an HTTP-style numeric `code`. This module turns a
//! decoded [`Reply`] into either a [`Response`] (success) or a
//! [`StatusError`]. The mapping is pure and total: every `i64` lands in
//! exactly one [`StatusClass`], and only the success band yields `Ok`.
//!
//! ```text
//! 200..=299 → Success        → Ok(Response)
//! 400..=499 → ClientFault    → Err(InvalidRequest)
//! 500..=599 → ServerFault    → Err(InvalidRequest)
//! otherwise → Unclassified   → Err(Unclassified)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Reply, StatusError};

// ---------------------------------------------------------------------------
// StatusCode
// ---------------------------------------------------------------------------

/// A status code as sent by the daemon.
///
/// Kept as `i64` so that any integer the daemon might send is representable
/// and classifiable, including values the protocol never defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub i64);

impl StatusCode {
    pub const OK: Self = Self(200);
    /// Success with nothing worth returning.
    pub const NO_CONTENT: Self = Self(204);
    /// The qualifier matched no rows, or the key does not exist.
    pub const NOT_FOUND: Self = Self(404);
    /// The value is outside the allowed range or domain.
    pub const NOT_ACCEPTABLE: Self = Self(406);
    pub const CONFLICT: Self = Self(409);
    /// The daemon could not store or load the value.
    pub const INTERNAL_ERROR: Self = Self(500);
    pub const NOT_IMPLEMENTED: Self = Self(501);

    /// Returns the band this code falls in.
    pub fn class(self) -> StatusClass {
        match self.0 {
            200..=299 => StatusClass::Success,
            400..=499 => StatusClass::ClientFault,
            500..=599 => StatusClass::ServerFault,
            _ => StatusClass::Unclassified,
        }
    }

    pub fn is_success(self) -> bool {
        self.class() == StatusClass::Success
    }

    /// Short human-readable meaning, for error messages.
    pub fn reason(self) -> &'static str {
        match self {
            Self::OK => "ok",
            Self::NO_CONTENT => "no content",
            Self::NOT_FOUND => "not found",
            Self::NOT_ACCEPTABLE => "invalid value",
            Self::CONFLICT => "conflicting value",
            Self::INTERNAL_ERROR => "storage failure",
            Self::NOT_IMPLEMENTED => "unknown action",
            other => match other.class() {
                StatusClass::Success => "success",
                StatusClass::ClientFault => "client fault",
                StatusClass::ServerFault => "server fault",
                StatusClass::Unclassified => "unclassified",
            },
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StatusCode {
    fn from(code: i64) -> Self {
        Self(code)
    }
}

/// The band a [`StatusCode`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// 2xx.
    Success,
    /// 4xx: the request was malformed or matched nothing.
    ClientFault,
    /// 5xx: the daemon failed, e.g. its storage backend is unavailable.
    ServerFault,
    /// Outside every defined band.
    Unclassified,
}

// ---------------------------------------------------------------------------
// Response: the success side of a classified reply
// ---------------------------------------------------------------------------

/// A successful reply.
///
/// Built once from a [`Reply`] by [`Reply::classify`] and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: StatusCode,
    /// The payload; `None` when the daemon sent no `data` key.
    pub data: Option<Value>,
    /// Non-zero when the change only takes effect after the component
    /// restarts. Defaults to 0 when absent.
    pub dirty: i64,
}

impl Response {
    /// `true` for 204: success with no meaningful content.
    pub fn is_no_content(&self) -> bool {
        self.code == StatusCode::NO_CONTENT
    }

    /// `true` when the change applies only after a restart.
    pub fn is_dirty(&self) -> bool {
        self.dirty != 0
    }

    /// The payload as a string slice, when it is a JSON string.
    pub fn data_str(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }
}

impl Reply {
    /// Classifies this reply into a [`Response`] or a [`StatusError`].
    pub fn classify(self) -> Result<Response, StatusError> {
        let code = StatusCode(self.code);
        match code.class() {
            StatusClass::Success => Ok(Response {
                code,
                data: self.data,
                dirty: self.dirty,
            }),
            StatusClass::ClientFault | StatusClass::ServerFault => {
                Err(StatusError::InvalidRequest {
                    code,
                    data: self.data,
                })
            }
            StatusClass::Unclassified => Err(StatusError::Unclassified {
                code,
                data: self.data,
            }),
        }
    }
}
