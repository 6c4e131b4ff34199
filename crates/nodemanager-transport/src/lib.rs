//! Transport abstraction layer for NodeManager clients.
//!
//! Provides the [`Transport`] trait: an already-connected, exclusively owned
//! request/reply channel to one management endpoint. The client layer above
//! sends exactly one frame and then waits for exactly one frame back.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

use std::fmt;

/// Address of a management endpoint.
///
/// Opaque to everything above the transport: only the [`Transport`]
/// implementation interprets it (for WebSocket, a `ws://host:port` URL).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(String);

impl Endpoint {
    /// Creates a new `Endpoint` from any string-like address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// A connected duplex channel that carries one request and one reply at a
/// time.
///
/// Methods take `&mut self`: the owner is responsible for never having two
/// exchanges in flight on the same channel. The protocol carries no request
/// IDs, so interleaved replies could not be told apart.
pub trait Transport: Send + 'static {
    /// Sends one complete message to the remote peer.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Waits for the next complete message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the channel. Dropping the transport also releases it.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Returns the endpoint this transport is bound to.
    fn endpoint(&self) -> &Endpoint;
}
