//! Client for SIPAuthServe: the subscriber registry.
//!
//! Two registry tables are reachable through generic read/update
//! operations ([`RegistryTable`]). The subscriber operations build on those
//! two tables, plus the daemon's composite `subscribers` command for
//! creating and deleting directory entries.
//!
//! None of the multi-step operations are atomic. If the second write
//! fails, the first stays committed.

use std::str::FromStr;

use nodemanager_protocol::{Codec, FieldMap, JsonCodec, ProtocolError, Request, Response};
use nodemanager_transport::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::join::{column_string, join_by_identity, DialRow, DirectoryRow, Subscriber};
use crate::{ClientError, Component, ComponentClient, Service};

/// The daemon's composite subscriber command.
const SUBSCRIBERS: &str = "subscribers";

// ---------------------------------------------------------------------------
// RegistryTable
// ---------------------------------------------------------------------------

/// The registry tables that accept generic reads and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryTable {
    /// SIP registrations, keyed by `name` (the IMSI).
    SipBuddies,
    /// Number → IMSI routing, keyed by `dial` (the IMSI).
    DialData,
}

impl RegistryTable {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SipBuddies => "sip_buddies",
            Self::DialData => "dialdata_table",
        }
    }
}

impl FromStr for RegistryTable {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sip_buddies" => Ok(Self::SipBuddies),
            "dialdata_table" => Ok(Self::DialData),
            other => Err(ClientError::Validation(format!(
                "unknown registry table {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for RegistryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Subscriber write payloads
// ---------------------------------------------------------------------------

/// Everything needed to provision a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriber {
    pub imsi: String,
    /// The subscriber's phone number.
    pub msisdn: String,
    /// Address of the subscriber's OpenBTS instance.
    pub ipaddr: String,
    pub port: u16,
    /// Authentication key. With a key OpenBTS uses full auth, without one
    /// it falls back to cache auth.
    pub ki: Option<String>,
}

/// Columns to change on an existing subscriber. `None` leaves a column
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberUpdate {
    pub msisdn: Option<String>,
    pub ipaddr: Option<String>,
    pub port: Option<u16>,
}

impl SubscriberUpdate {
    pub fn is_empty(&self) -> bool {
        self.msisdn.is_none() && self.ipaddr.is_none() && self.port.is_none()
    }
}

// ---------------------------------------------------------------------------
// SubscriberDirectory
// ---------------------------------------------------------------------------

/// Talks to the SIPAuthServe NodeManager socket.
pub struct SubscriberDirectory<T: Transport, C: Codec = JsonCodec> {
    client: ComponentClient<T, C>,
}

impl<T: Transport> SubscriberDirectory<T> {
    /// Wraps a transport already connected to SIPAuthServe.
    pub fn new(transport: T) -> Self {
        Self {
            client: ComponentClient::new(Service::SubscriberDirectory, transport),
        }
    }
}

#[cfg(feature = "websocket")]
impl SubscriberDirectory<nodemanager_transport::WebSocketTransport> {
    /// Connects to SIPAuthServe at the configured address.
    pub async fn connect(config: &crate::ClientConfig) -> Result<Self, ClientError> {
        let transport = nodemanager_transport::WebSocketTransport::connect(
            &config.address,
            config.reply_timeout,
        )
        .await?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport, C: Codec> SubscriberDirectory<T, C> {
    /// Closes the connection.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        self.client.shutdown().await
    }

    // -- Generic registry access --

    /// Reads rows from a registry table.
    ///
    /// `fields` of `None` returns every column. An empty `qualifier`
    /// returns every row. A qualifier that matches nothing fails with 404.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for an unknown table name or an empty
    /// column name, raised before anything is sent.
    pub async fn read_registry(
        &self,
        table: &str,
        fields: Option<&[&str]>,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        let table: RegistryTable = table.parse()?;
        self.read_table(table, fields, qualifier).await
    }

    /// Updates rows in a registry table.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for an unknown table name, an empty
    /// column name, or an empty `fields` mapping, raised before anything is
    /// sent.
    pub async fn update_registry(
        &self,
        table: &str,
        fields: FieldMap,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        let table: RegistryTable = table.parse()?;
        self.update_table(table, fields, qualifier).await
    }

    pub async fn read_sip_buddies(
        &self,
        fields: Option<&[&str]>,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        self.read_table(RegistryTable::SipBuddies, fields, qualifier).await
    }

    pub async fn read_dialdata(
        &self,
        fields: Option<&[&str]>,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        self.read_table(RegistryTable::DialData, fields, qualifier).await
    }

    pub async fn update_sip_buddies(
        &self,
        fields: FieldMap,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        self.update_table(RegistryTable::SipBuddies, fields, qualifier).await
    }

    pub async fn update_dialdata(
        &self,
        fields: FieldMap,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        self.update_table(RegistryTable::DialData, fields, qualifier).await
    }

    async fn read_table(
        &self,
        table: RegistryTable,
        fields: Option<&[&str]>,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        if let Some(columns) = fields {
            check_columns(table, "fields", columns.iter().copied())?;
        }
        check_columns(table, "match", qualifier.keys().map(String::as_str))?;
        let fields = fields.map(|columns| columns.iter().map(|c| c.to_string()).collect());
        let request = Request::read(table.as_str(), qualifier, fields);
        self.client.send_and_receive(&request).await
    }

    async fn update_table(
        &self,
        table: RegistryTable,
        fields: FieldMap,
        qualifier: FieldMap,
    ) -> Result<Response, ClientError> {
        if fields.is_empty() {
            return Err(ClientError::Validation(format!(
                "update of {table} sets no columns"
            )));
        }
        check_columns(table, "fields", fields.keys().map(String::as_str))?;
        check_columns(table, "match", qualifier.keys().map(String::as_str))?;
        let request = Request::update(table.as_str(), qualifier, fields);
        self.client.send_and_receive(&request).await
    }

    // -- Single-column helpers --

    /// The IP address of a subscriber's OpenBTS instance.
    pub async fn get_ipaddr(&self, imsi: &str) -> Result<String, ClientError> {
        self.sip_column(imsi, "ipaddr").await
    }

    /// The port of a subscriber's OpenBTS instance.
    pub async fn get_port(&self, imsi: &str) -> Result<String, ClientError> {
        self.sip_column(imsi, "port").await
    }

    pub async fn update_ipaddr(&self, imsi: &str, ipaddr: &str) -> Result<Response, ClientError> {
        self.update_sip_buddies(field_map([("ipaddr", ipaddr.into())]), by_name(imsi))
            .await
    }

    pub async fn update_port(&self, imsi: &str, port: u16) -> Result<Response, ClientError> {
        self.update_sip_buddies(field_map([("port", port.to_string().into())]), by_name(imsi))
            .await
    }

    async fn sip_column(&self, imsi: &str, column: &str) -> Result<String, ClientError> {
        let response = self.read_sip_buddies(Some(&[column]), by_name(imsi)).await?;
        let rows = rows(response, RegistryTable::SipBuddies)?;
        let value = rows
            .into_iter()
            .next()
            .and_then(|mut row| row.get_mut(column).map(Value::take))
            .ok_or_else(|| {
                ProtocolError::InvalidMessage(format!("no {column} for IMSI {imsi}"))
            })?;
        column_string(value)
            .map_err(|e| ClientError::from(ProtocolError::InvalidMessage(e.to_string())))
    }

    // -- Numbers --

    /// Numbers attached to `imsi`, or every number when `imsi` is `None`
    /// or empty.
    ///
    /// A 404 (no numbers match) is returned as an error, not an empty list.
    pub async fn get_numbers(&self, imsi: Option<&str>) -> Result<Vec<String>, ClientError> {
        let qualifier = imsi_filter(imsi).map(by_dial).unwrap_or_default();
        let response = self.read_dialdata(Some(&["exten"]), qualifier).await?;

        #[derive(serde::Deserialize)]
        struct NumberRow {
            #[serde(deserialize_with = "column_string")]
            exten: String,
        }
        let numbers: Vec<NumberRow> = decode_rows(response, RegistryTable::DialData)?;
        Ok(numbers.into_iter().map(|row| row.exten).collect())
    }

    /// Attaches a number to an IMSI.
    pub async fn add_number(&self, imsi: &str, number: &str) -> Result<Response, ClientError> {
        let fields = field_map([("dial", imsi.into()), ("exten", number.into())]);
        self.client
            .send_and_receive(&Request::create(RegistryTable::DialData.as_str(), fields))
            .await
    }

    /// Detaches a number from an IMSI.
    ///
    /// Reads the IMSI's current numbers first. If `number` is not among
    /// them, fails with [`ClientError::NotAttached`] and sends no delete.
    pub async fn delete_number(&self, imsi: &str, number: &str) -> Result<Response, ClientError> {
        let numbers = self.get_numbers(Some(imsi)).await?;
        if !numbers.iter().any(|n| n == number) {
            return Err(ClientError::NotAttached {
                imsi: imsi.to_string(),
                number: number.to_string(),
            });
        }
        let qualifier = field_map([("dial", imsi.into()), ("exten", number.into())]);
        self.client
            .send_and_receive(&Request::delete(RegistryTable::DialData.as_str(), qualifier))
            .await
    }

    // -- Subscribers --

    /// Subscribers with their numbers, optionally only the one with `imsi`.
    /// An empty `imsi` reads every subscriber.
    ///
    /// Issues two independent reads (`sip_buddies`, then `dialdata_table`)
    /// and joins them client-side. When the directory read reports 404,
    /// the result is empty rather than an error. When the dial read reports
    /// 404, the subscribers simply have no numbers.
    pub async fn get_subscribers(&self, imsi: Option<&str>) -> Result<Vec<Subscriber>, ClientError> {
        let imsi = imsi_filter(imsi);
        let directory = match self
            .read_sip_buddies(
                Some(&["name", "ipaddr", "port"]),
                imsi.map(by_name).unwrap_or_default(),
            )
            .await
        {
            Ok(response) => decode_rows::<DirectoryRow>(response, RegistryTable::SipBuddies)?,
            Err(e) if e.is_not_found() => {
                tracing::debug!(imsi, "no subscribers matched");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let dial = match self
            .read_dialdata(Some(&["dial", "exten"]), imsi.map(by_dial).unwrap_or_default())
            .await
        {
            Ok(response) => decode_rows::<DialRow>(response, RegistryTable::DialData)?,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };

        Ok(join_by_identity(directory, &dial))
    }

    /// Number of subscribers. Zero when the registry reports 404.
    pub async fn count_subscribers(&self) -> Result<usize, ClientError> {
        Ok(self.get_subscribers(None).await?.len())
    }

    /// Provisions a subscriber: a directory entry, then its number.
    ///
    /// The subscriber's SIP name is its IMSI. The composite create carries
    /// the number too; the dial-plan row is written explicitly afterwards.
    /// `ki`, when absent, is sent as an empty string.
    pub async fn create_subscriber(&self, subscriber: &NewSubscriber) -> Result<Response, ClientError> {
        let fields = field_map([
            ("name", subscriber.imsi.as_str().into()),
            ("imsi", subscriber.imsi.as_str().into()),
            ("msisdn", subscriber.msisdn.as_str().into()),
            ("ipaddr", subscriber.ipaddr.as_str().into()),
            ("port", subscriber.port.to_string().into()),
            ("ki", subscriber.ki.as_deref().unwrap_or_default().into()),
        ]);
        self.client
            .send_and_receive(&Request::create(SUBSCRIBERS, fields))
            .await?;
        self.add_number(&subscriber.imsi, &subscriber.msisdn).await
    }

    /// Changes a subscriber's directory columns, then its number.
    ///
    /// Returns the response of the last write performed.
    ///
    /// # Errors
    /// [`ClientError::Validation`] if `update` changes nothing.
    pub async fn update_subscriber(
        &self,
        imsi: &str,
        update: &SubscriberUpdate,
    ) -> Result<Response, ClientError> {
        if update.is_empty() {
            return Err(ClientError::Validation(format!(
                "update of IMSI {imsi} changes nothing"
            )));
        }

        let mut directory = FieldMap::new();
        if let Some(ipaddr) = &update.ipaddr {
            directory.insert("ipaddr".into(), ipaddr.as_str().into());
        }
        if let Some(port) = update.port {
            directory.insert("port".into(), port.to_string().into());
        }

        let mut last = None;
        if !directory.is_empty() {
            last = Some(self.update_sip_buddies(directory, by_name(imsi)).await?);
        }
        if let Some(msisdn) = &update.msisdn {
            let fields = field_map([("exten", msisdn.as_str().into())]);
            last = Some(self.update_dialdata(fields, by_dial(imsi)).await?);
        }
        last.ok_or_else(|| ClientError::Validation(format!("update of IMSI {imsi} changes nothing")))
    }

    /// Removes a subscriber's directory entry, then its numbers.
    ///
    /// A 404 on the number delete means the subscriber had no numbers left;
    /// the directory delete's response is returned in that case.
    pub async fn delete_subscriber(&self, imsi: &str) -> Result<Response, ClientError> {
        let removed = self
            .client
            .send_and_receive(&Request::delete(
                SUBSCRIBERS,
                field_map([("imsi", imsi.into())]),
            ))
            .await?;
        match self
            .client
            .send_and_receive(&Request::delete(RegistryTable::DialData.as_str(), by_dial(imsi)))
            .await
        {
            Err(e) if e.is_not_found() => {
                tracing::debug!(imsi, "no numbers to remove");
                Ok(removed)
            }
            result => result,
        }
    }
}

impl<T: Transport, C: Codec> Component for SubscriberDirectory<T, C> {
    type Transport = T;
    type Codec = C;

    fn client(&self) -> &ComponentClient<T, C> {
        &self.client
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn field_map<const N: usize>(pairs: [(&str, Value); N]) -> FieldMap {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

/// `None` for a missing or empty IMSI, which both mean "no filter".
fn imsi_filter(imsi: Option<&str>) -> Option<&str> {
    imsi.filter(|imsi| !imsi.is_empty())
}

fn by_name(imsi: &str) -> FieldMap {
    field_map([("name", imsi.into())])
}

fn by_dial(imsi: &str) -> FieldMap {
    field_map([("dial", imsi.into())])
}

fn check_columns<'a>(
    table: RegistryTable,
    role: &str,
    mut columns: impl Iterator<Item = &'a str>,
) -> Result<(), ClientError> {
    if columns.any(|c| c.trim().is_empty()) {
        return Err(ClientError::Validation(format!(
            "empty column name in {table} {role}"
        )));
    }
    Ok(())
}

/// The rows of a read reply. A single object counts as one row; a missing
/// payload counts as none.
fn rows(response: Response, table: RegistryTable) -> Result<Vec<serde_json::Map<String, Value>>, ClientError> {
    let rows = match response.data {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(object @ Value::Object(_)) => vec![object],
        Some(other) => {
            return Err(ProtocolError::InvalidMessage(format!(
                "{table} read returned {other} instead of rows"
            ))
            .into());
        }
    };
    rows.into_iter()
        .map(|row| match row {
            Value::Object(map) => Ok(map),
            other => Err(ClientError::from(ProtocolError::InvalidMessage(format!(
                "{table} row is not an object: {other}"
            )))),
        })
        .collect()
}

fn decode_rows<R: DeserializeOwned>(response: Response, table: RegistryTable) -> Result<Vec<R>, ClientError> {
    rows(response, table)?
        .into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row)).map_err(|e| {
                ClientError::from(ProtocolError::InvalidMessage(format!(
                    "malformed {table} row: {e}"
                )))
            })
        })
        .collect()
}
