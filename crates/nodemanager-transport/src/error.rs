/// Errors that can occur in the transport layer.
///
/// Every variant is fatal to the call that produced it. The client layer
/// never retries or reconnects.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the channel to the endpoint failed.
    #[error("connect to {endpoint} failed: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the channel.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// No reply arrived within the configured reply timeout.
    #[error("no reply from {endpoint} within {timeout_ms} ms")]
    Timeout { endpoint: String, timeout_ms: u128 },
}
