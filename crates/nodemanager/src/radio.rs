//! Client for OpenBTS, the radio access network controller.

use nodemanager_protocol::{Codec, JsonCodec, Request, Response};
use nodemanager_transport::Transport;

use crate::{ClientError, Component, ComponentClient, Service};

/// Talks to the OpenBTS NodeManager socket.
pub struct RadioController<T: Transport, C: Codec = JsonCodec> {
    client: ComponentClient<T, C>,
}

impl<T: Transport> RadioController<T> {
    /// Wraps a transport already connected to OpenBTS.
    pub fn new(transport: T) -> Self {
        Self {
            client: ComponentClient::new(Service::RadioController, transport),
        }
    }
}

#[cfg(feature = "websocket")]
impl RadioController<nodemanager_transport::WebSocketTransport> {
    /// Connects to OpenBTS at the configured address.
    pub async fn connect(config: &crate::ClientConfig) -> Result<Self, ClientError> {
        let transport = nodemanager_transport::WebSocketTransport::connect(
            &config.address,
            config.reply_timeout,
        )
        .await?;
        Ok(Self::new(transport))
    }
}

impl<T: Transport, C: Codec> RadioController<T, C> {
    /// Monitors channel loads, queue sizes and noise levels.
    ///
    /// The returned `data` is the daemon's monitor report, passed through
    /// untouched.
    pub async fn monitor(&self) -> Result<Response, ClientError> {
        self.client.send_and_receive(&Request::probe("monitor")).await
    }

    /// Closes the connection.
    pub async fn shutdown(self) -> Result<(), ClientError> {
        self.client.shutdown().await
    }
}

impl<T: Transport, C: Codec> Component for RadioController<T, C> {
    type Transport = T;
    type Codec = C;

    fn client(&self) -> &ComponentClient<T, C> {
        &self.client
    }
}
