//! The base request/reply contract shared by every service client.
//!
//! [`ComponentClient`] owns one transport for one daemon and is the only
//! path to the wire. The [`Component`] trait layers the operations every
//! daemon understands (`config`, `version`) on top of it.

use nodemanager_protocol::{Action, Codec, JsonCodec, Reply, Request, Response};
use nodemanager_transport::{Endpoint, Transport, TransportError};
use tokio::sync::Mutex;

use crate::{ClientError, Service};

/// One exclusively owned channel to one daemon.
///
/// The transport sits behind an async mutex held for the whole
/// send/recv pair. Tasks sharing a handle are therefore serialised: the
/// protocol has no request IDs, so a second request must not go out before
/// the first reply is read.
///
/// An exchange that does not finish (send or receive failure, timeout, or
/// a caller dropping the future mid-flight) leaves the channel out of step
/// with the daemon. Every later call on the handle then fails with
/// [`TransportError::ConnectionClosed`] instead of reading a stale reply.
pub struct ComponentClient<T: Transport, C: Codec = JsonCodec> {
    service: Service,
    endpoint: Endpoint,
    channel: Mutex<Channel<T>>,
    codec: C,
}

struct Channel<T> {
    transport: T,
    /// Set while a request is out and its reply has not been read.
    pending: bool,
}

impl<T: Transport> ComponentClient<T> {
    /// Wraps a connected transport using the JSON codec.
    pub fn new(service: Service, transport: T) -> Self {
        Self::with_codec(service, transport, JsonCodec)
    }
}

impl<T: Transport, C: Codec> ComponentClient<T, C> {
    /// Wraps a connected transport with a custom codec.
    pub fn with_codec(service: Service, transport: T, codec: C) -> Self {
        Self {
            service,
            endpoint: transport.endpoint().clone(),
            channel: Mutex::new(Channel {
                transport,
                pending: false,
            }),
            codec,
        }
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sends one request and classifies the one reply.
    ///
    /// Exactly one `send` and one `recv` happen per call. Transport
    /// failures come back as [`ClientError::Transport`] and are never
    /// turned into a status outcome. After one, the handle is unusable.
    pub async fn send_and_receive(
        &self,
        request: &Request,
    ) -> Result<Response, ClientError> {
        let frame = self.codec.encode(request)?;

        let raw = {
            let mut channel = self.channel.lock().await;
            if channel.pending {
                return Err(TransportError::ConnectionClosed(format!(
                    "{} is out of sync after an unfinished exchange",
                    self.endpoint
                ))
                .into());
            }
            tracing::trace!(
                service = %self.service,
                command = request.command(),
                action = %request.action(),
                "sending request"
            );
            channel.pending = true;
            channel.transport.send(&frame).await?;
            let raw = channel.transport.recv().await?.ok_or_else(|| {
                TransportError::ConnectionClosed(format!(
                    "{} closed before replying",
                    self.endpoint
                ))
            })?;
            channel.pending = false;
            raw
        };

        let reply: Reply = self.codec.decode(&raw)?;
        tracing::debug!(
            service = %self.service,
            command = request.command(),
            code = reply.code,
            "received reply"
        );
        Ok(reply.classify()?)
    }

    /// Closes the transport and consumes the client.
    ///
    /// Dropping the client without calling this still releases the
    /// channel; `shutdown` additionally tells the peer.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        tracing::debug!(service = %self.service, endpoint = %self.endpoint, "shutting down");
        let mut channel = self.channel.into_inner();
        channel.transport.close().await?;
        Ok(())
    }
}

/// Operations every managed daemon supports.
///
/// Implementors only provide [`client`](Component::client); the scalar
/// `config` and `version` operations come for free.
pub trait Component {
    type Transport: Transport;
    type Codec: Codec;

    /// The underlying request/reply client.
    fn client(&self) -> &ComponentClient<Self::Transport, Self::Codec>;

    /// Reads a config value.
    ///
    /// Sends `{command: "config", action: "read", key, value: ""}`. A
    /// missing key comes back as a 404 [`ClientError::Status`].
    async fn read_config(&self, key: &str) -> Result<Response, ClientError> {
        let request = Request::scalar("config", Action::Read, key, "");
        self.client().send_and_receive(&request).await
    }

    /// Updates a config value.
    ///
    /// A value outside the allowed range comes back as 406, a storage
    /// failure as 500.
    async fn update_config(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Response, ClientError> {
        let request = Request::scalar("config", Action::Update, key, value);
        self.client().send_and_receive(&request).await
    }

    /// Creating config keys is not supported by NodeManager. Always fails
    /// without sending anything.
    async fn create_config(
        &self,
        key: &str,
        _value: &str,
    ) -> Result<Response, ClientError> {
        Err(ClientError::Validation(format!(
            "{} does not support creating config key {key:?}",
            self.client().service()
        )))
    }

    /// Deleting config keys is not supported by NodeManager. Always fails
    /// without sending anything.
    async fn delete_config(&self, key: &str) -> Result<Response, ClientError> {
        Err(ClientError::Validation(format!(
            "{} does not support deleting config key {key:?}",
            self.client().service()
        )))
    }

    /// Returns the daemon's version string.
    async fn get_version(&self) -> Result<String, ClientError> {
        let response = self
            .client()
            .send_and_receive(&Request::probe("version"))
            .await?;
        match response.data {
            Some(serde_json::Value::String(version)) => Ok(version),
            other => Err(nodemanager_protocol::ProtocolError::InvalidMessage(
                format!("version reply data is not a string: {other:?}"),
            )
            .into()),
        }
    }
}

impl<T: Transport, C: Codec> Component for ComponentClient<T, C> {
    type Transport = T;
    type Codec = C;

    fn client(&self) -> &ComponentClient<T, C> {
        self
    }
}
