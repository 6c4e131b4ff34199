//! Service identities and client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// The three managed daemons, each on its own NodeManager port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    /// OpenBTS, the radio access network controller.
    RadioController,
    /// SMQueue, the SMS store-and-forward queue.
    MessageQueue,
    /// SIPAuthServe, SIP authentication and the subscriber registry.
    SubscriberDirectory,
}

impl Service {
    /// The address the daemon listens on out of the box.
    pub fn default_address(self) -> &'static str {
        match self {
            Self::RadioController => "ws://127.0.0.1:45060",
            Self::MessageQueue => "ws://127.0.0.1:45063",
            Self::SubscriberDirectory => "ws://127.0.0.1:45064",
        }
    }

    /// The daemon's process name.
    pub fn daemon_name(self) -> &'static str {
        match self {
            Self::RadioController => "OpenBTS",
            Self::MessageQueue => "SMQueue",
            Self::SubscriberDirectory => "SIPAuthServe",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.daemon_name())
    }
}

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

/// How to reach one daemon.
///
/// The address is opaque here; the transport interprets it. The reply
/// timeout is handed to the transport as well, since this layer has no
/// timeout of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint address, e.g. `ws://127.0.0.1:45064`.
    pub address: String,

    /// How long to wait for a reply before failing. `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Default reply timeout.
    pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

    /// Configuration pointing at `service`'s default address.
    pub fn for_service(service: Service) -> Self {
        Self {
            address: service.default_address().to_string(),
            reply_timeout: Some(Self::DEFAULT_REPLY_TIMEOUT),
        }
    }

    /// Overrides the endpoint address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Overrides the reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }
}
