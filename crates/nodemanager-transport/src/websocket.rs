//! WebSocket transport implementation using `tokio-tungstenite`.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Endpoint, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A WebSocket-based [`Transport`] connected to one management endpoint.
///
/// Requests go out as text frames. Replies are accepted as text or binary
/// frames; ping/pong frames are skipped.
pub struct WebSocketTransport {
    endpoint: Endpoint,
    ws: WsStream,
    reply_timeout: Option<Duration>,
}

impl WebSocketTransport {
    /// Connects to the endpoint at `address` (a `ws://` or `wss://` URL).
    pub async fn connect(
        address: &str,
        reply_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let (ws, _) =
            tokio_tungstenite::connect_async(address).await.map_err(|e| {
                TransportError::ConnectFailed {
                    endpoint: address.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        e,
                    ),
                }
            })?;
        tracing::debug!(address, "connected WebSocket transport");

        Ok(Self {
            endpoint: Endpoint::new(address),
            ws,
            reply_timeout,
        })
    }

    /// Returns the configured reply timeout, if any.
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout
    }

    async fn next_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        use futures_util::StreamExt;
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }
}

impl Transport for WebSocketTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        use futures_util::SinkExt;
        let text = std::str::from_utf8(data).map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e,
            ))
        })?;
        self.ws
            .send(Message::text(text.to_owned()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(limit) = self.reply_timeout else {
            return self.next_message().await;
        };
        match tokio::time::timeout(limit, self.next_message()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                endpoint: self.endpoint.to_string(),
                timeout_ms: limit.as_millis(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::debug!(endpoint = %self.endpoint, "closing WebSocket transport");
        self.ws.close(None).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
