//! Client for SMQueue, the SMS store-and-forward queue.
//!
//! SMQueue exposes only the operations shared by every daemon, so this is a
//! thin named wrapper over [`ComponentClient`].

use nodemanager_protocol::{Codec, JsonCodec};
use nodemanager_transport::Transport;

use crate::{ClientError, Component, ComponentClient, Service};

/// Talks to the SMQueue NodeManager socket.
pub struct MessageQueue<T: Transport, C: Codec = JsonCodec> {
    client: ComponentClient<T, C>,
}

impl<T: Transport> MessageQueue<T> {
    /// Wraps a transport already connected to SMQueue.
    pub fn new(transport: T) -> Self {
        Self {
            client: ComponentClient::new(Service::MessageQueue, transport),
        }
    }
}

#[cfg(feature = "websocket")]
impl MessageQueue<nodemanager_transport::WebSocketTransport> {
    /// Connects to SMQueue at the configured address.
    pub async fn connect(config: &crate::ClientConfig) -> Result<Self, ClientError> {
        let transport = nodemanager_transport::WebSocketTransport::connect(
            &config.address,
            config.reply_timeout,
        )
        .await?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport, C: Codec> MessageQueue<T, C> {
    /// Closes the connection.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        self.client.shutdown().await
    }
}

impl<T: Transport, C: Codec> Component for MessageQueue<T, C> {
    type Transport = T;
    type Codec = C;

    fn client(&self) -> &ComponentClient<T, C> {
        &self.client
    }
}
