//! Subscriber records joined from the SIP and dial-plan tables.
//!
//! The daemon stores a subscriber in two tables with no foreign key
//! between them:
//!
//! ```text
//! sip_buddies:     name (IMSI) | ipaddr | port
//! dialdata_table:  dial (IMSI) | exten (number)
//! ```
//!
//! A [`Subscriber`] is never stored anywhere. It is rebuilt on each query by
//! [`join_by_identity`], an inner equality join of `name` against `dial`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One `sip_buddies` row as projected by subscriber queries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryRow {
    /// The IMSI. By convention a subscriber's SIP name is its IMSI.
    #[serde(deserialize_with = "column_string")]
    pub name: String,
    #[serde(default, deserialize_with = "optional_column_string")]
    pub ipaddr: Option<String>,
    #[serde(default, deserialize_with = "optional_column_string")]
    pub port: Option<String>,
}

/// One `dialdata_table` row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialRow {
    /// The IMSI the number routes to.
    #[serde(deserialize_with = "column_string")]
    pub dial: String,
    /// The number.
    #[serde(deserialize_with = "column_string")]
    pub exten: String,
}

/// A subscriber with every number attached to its IMSI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub name: String,
    pub ipaddr: Option<String>,
    pub port: Option<String>,
    /// In the order the daemon returned the dial rows.
    pub numbers: Vec<String>,
}

/// Joins directory rows with dial rows on IMSI.
///
/// Output follows directory order. Each subscriber's numbers follow dial
/// order. Dial rows whose IMSI has no directory row are dropped.
pub fn join_by_identity(directory: Vec<DirectoryRow>, dial: &[DialRow]) -> Vec<Subscriber> {
    directory
        .into_iter()
        .map(|row| {
            let numbers = dial
                .iter()
                .filter(|d| d.dial == row.name)
                .map(|d| d.exten.clone())
                .collect();
            Subscriber {
                name: row.name,
                ipaddr: row.ipaddr,
                port: row.port,
                numbers,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Column decoding
// ---------------------------------------------------------------------------

// The registry is SQLite-backed and hands back whatever type a column was
// written with, so ports and numbers can arrive as JSON numbers.

pub(crate) fn column_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number column, got {other}"
        ))),
    }
}

fn optional_column_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number column, got {other}"
        ))),
    }
}
