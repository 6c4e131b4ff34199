//! # NodeManager
//!
//! Client for the NodeManager control sockets of an OpenBTS base station:
//! the radio controller (OpenBTS), the subscriber directory
//! (SIPAuthServe), and the SMS queue (SMQueue).
//!
//! Every service speaks the same JSON request/reply convention. A service
//! client builds a [`Request`], the shared [`ComponentClient`] sends it over
//! its [`Transport`] and waits for exactly one reply, and the reply's status
//! code is classified into a [`Response`] or a [`ClientError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nodemanager::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let config = ClientConfig::for_service(Service::SubscriberDirectory);
//! let directory = SubscriberDirectory::connect(&config).await?;
//!
//! println!("SIPAuthServe {}", directory.get_version().await?);
//! for subscriber in directory.get_subscribers(None).await? {
//!     println!("{} {:?}", subscriber.name, subscriber.numbers);
//! }
//! directory.shutdown().await
//! # }
//! ```

#![allow(async_fn_in_trait)]

mod component;
mod config;
mod directory;
mod error;
mod join;
mod queue;
mod radio;

pub use component::{Component, ComponentClient};
pub use config::{ClientConfig, Service};
pub use directory::{NewSubscriber, RegistryTable, SubscriberDirectory, SubscriberUpdate};
pub use error::ClientError;
pub use join::{join_by_identity, DialRow, DirectoryRow, Subscriber};
pub use queue::MessageQueue;
pub use radio::RadioController;

pub use nodemanager_protocol::{
    Action, Codec, FieldMap, JsonCodec, ProtocolError, Reply, Request, Response,
    StatusClass, StatusCode, StatusError,
};
pub use nodemanager_transport::{Endpoint, Transport, TransportError};
#[cfg(feature = "websocket")]
pub use nodemanager_transport::WebSocketTransport;

/// Everything a typical caller needs in one import.
pub mod prelude {
    pub use crate::{
        ClientConfig, ClientError, Component, ComponentClient, FieldMap,
        MessageQueue, NewSubscriber, RadioController, Request, Response,
        Service, StatusClass, StatusCode, Subscriber, SubscriberDirectory,
        SubscriberUpdate, Transport,
    };
}
