//! Core protocol types for the NodeManager wire format.
//!
//! Every request is a single JSON object with a `command` and an `action`.
//! What else it carries depends on its shape:
//!
//! ```text
//! scalar:  { command, action, key, value }          config / version / monitor
//! read:    { command, action: "read", match, fields: [..] | null }
//! create:  { command, action: "create", fields: {..} }
//! update:  { command, action: "update", match, fields: {..} }
//! delete:  { command, action: "delete", match }
//! ```
//!
//! [`Request`] models these as a tagged union, so a read carrying a value
//! mapping, or a scalar carrying a `match`, cannot be built. Decoding goes
//! through the same rules and rejects mixed shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// A column → value mapping. Used both as a query qualifier (`match`) and
/// as a write payload (`fields`).
pub type FieldMap = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// What the daemon should do with the named command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The empty action, used by commands that take no verb (`version`,
    /// `monitor`).
    #[default]
    #[serde(rename = "")]
    Probe,
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Probe => "",
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

/// A `{command, action, key, value}` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarCommand {
    pub command: String,
    pub action: Action,
    pub key: String,
    pub value: String,
}

/// A tabular read: `match` filters rows, `fields` projects columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadCommand {
    pub command: String,
    /// Empty means unfiltered.
    pub qualifier: FieldMap,
    /// `None` means every column.
    pub fields: Option<Vec<String>>,
}

/// A tabular write against `command`.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteCommand {
    pub command: String,
    pub op: WriteOp,
}

/// The three write verbs, each with exactly the keys it sends.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create { fields: FieldMap },
    Update { qualifier: FieldMap, fields: FieldMap },
    Delete { qualifier: FieldMap },
}

impl WriteOp {
    pub fn action(&self) -> Action {
        match self {
            Self::Create { .. } => Action::Create,
            Self::Update { .. } => Action::Update,
            Self::Delete { .. } => Action::Delete,
        }
    }
}

/// A request envelope, one variant per wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireRequest", try_from = "WireRequest")]
pub enum Request {
    Scalar(ScalarCommand),
    Read(ReadCommand),
    Write(WriteCommand),
}

impl Request {
    /// Builds a `{command, action, key, value}` request.
    pub fn scalar(
        command: impl Into<String>,
        action: Action,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Scalar(ScalarCommand {
            command: command.into(),
            action,
            key: key.into(),
            value: value.into(),
        })
    }

    /// Builds a versionless probe: empty action, empty key and value.
    pub fn probe(command: impl Into<String>) -> Self {
        Self::scalar(command, Action::Probe, "", "")
    }

    /// Builds a tabular read.
    pub fn read(
        command: impl Into<String>,
        qualifier: FieldMap,
        fields: Option<Vec<String>>,
    ) -> Self {
        Self::Read(ReadCommand {
            command: command.into(),
            qualifier,
            fields,
        })
    }

    pub fn create(command: impl Into<String>, fields: FieldMap) -> Self {
        Self::write(command, WriteOp::Create { fields })
    }

    pub fn update(
        command: impl Into<String>,
        qualifier: FieldMap,
        fields: FieldMap,
    ) -> Self {
        Self::write(command, WriteOp::Update { qualifier, fields })
    }

    pub fn delete(command: impl Into<String>, qualifier: FieldMap) -> Self {
        Self::write(command, WriteOp::Delete { qualifier })
    }

    fn write(command: impl Into<String>, op: WriteOp) -> Self {
        Self::Write(WriteCommand {
            command: command.into(),
            op,
        })
    }

    /// The command (resource or table name) this request addresses.
    pub fn command(&self) -> &str {
        match self {
            Self::Scalar(c) => &c.command,
            Self::Read(c) => &c.command,
            Self::Write(c) => &c.command,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::Scalar(c) => c.action,
            Self::Read(_) => Action::Read,
            Self::Write(c) => c.op.action(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

/// The flat JSON object actually exchanged. Only used as the serde bridge
/// for [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireRequest {
    command: String,
    action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    qualifier: Option<FieldMap>,
    /// `Some(Value::Null)` is written as `null` (read every column).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Value>,
}

impl From<Request> for WireRequest {
    fn from(request: Request) -> Self {
        let mut wire = WireRequest {
            command: request.command().to_string(),
            action: request.action(),
            key: None,
            value: None,
            qualifier: None,
            fields: None,
        };
        match request {
            Request::Scalar(c) => {
                wire.key = Some(c.key);
                wire.value = Some(c.value);
            }
            Request::Read(c) => {
                wire.qualifier = Some(c.qualifier);
                wire.fields = Some(match c.fields {
                    Some(columns) => {
                        Value::Array(columns.into_iter().map(Value::String).collect())
                    }
                    None => Value::Null,
                });
            }
            Request::Write(c) => match c.op {
                WriteOp::Create { fields } => {
                    wire.fields = Some(Value::Object(fields.into_iter().collect()));
                }
                WriteOp::Update { qualifier, fields } => {
                    wire.qualifier = Some(qualifier);
                    wire.fields = Some(Value::Object(fields.into_iter().collect()));
                }
                WriteOp::Delete { qualifier } => {
                    wire.qualifier = Some(qualifier);
                }
            },
        }
        wire
    }
}

impl TryFrom<WireRequest> for Request {
    type Error = ProtocolError;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        let context = format!("{} {:?}", wire.command, wire.action.as_str());
        let invalid = |reason: &str| {
            ProtocolError::InvalidMessage(format!("{context} request: {reason}"))
        };

        if wire.key.is_some() || wire.value.is_some() {
            if wire.qualifier.is_some() || wire.fields.is_some() {
                return Err(invalid("scalar shape mixed with match/fields"));
            }
            let (Some(key), Some(value)) = (wire.key, wire.value) else {
                return Err(invalid("scalar shape needs both key and value"));
            };
            return Ok(Request::scalar(wire.command, wire.action, key, value));
        }

        match wire.action {
            Action::Probe => Err(invalid("missing key and value")),
            Action::Read => {
                let fields = match wire.fields {
                    None => None,
                    Some(value) => Some(
                        serde_json::from_value::<Vec<String>>(value)
                            .map_err(|_| invalid("read fields must be a list of column names"))?,
                    ),
                };
                Ok(Request::read(
                    wire.command,
                    wire.qualifier.unwrap_or_default(),
                    fields,
                ))
            }
            Action::Create => {
                if wire.qualifier.is_some() {
                    return Err(invalid("create takes no match"));
                }
                let fields = value_map(wire.fields)
                    .ok_or_else(|| invalid("create fields must be a value mapping"))?;
                Ok(Request::create(wire.command, fields))
            }
            Action::Update => {
                let Some(qualifier) = wire.qualifier else {
                    return Err(invalid("update needs a match"));
                };
                let fields = value_map(wire.fields)
                    .ok_or_else(|| invalid("update fields must be a value mapping"))?;
                Ok(Request::update(wire.command, qualifier, fields))
            }
            Action::Delete => {
                if wire.fields.is_some() {
                    return Err(invalid("delete takes no fields"));
                }
                let Some(qualifier) = wire.qualifier else {
                    return Err(invalid("delete needs a match"));
                };
                Ok(Request::delete(wire.command, qualifier))
            }
        }
    }
}

fn value_map(fields: Option<Value>) -> Option<FieldMap> {
    match fields? {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// The reply envelope.
///
/// Only `code` is required. A missing `data` decodes as `None` and a
/// missing `dirty` as `0`. Classify it with [`Reply::classify`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "dirty_flag")]
    pub dirty: i64,
}

/// Accepts `dirty` as an integer, a boolean, or `null`.
fn dirty_flag<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Int(i64),
        Bool(bool),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Int(n)) => n,
        Some(Flag::Bool(b)) => i64::from(b),
        None => 0,
    })
}

// =========================================================================
// Tests
// =========================================================================
