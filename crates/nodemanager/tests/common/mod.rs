//! Shared test doubles for the client integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nodemanager::{Endpoint, Transport, TransportError};
use serde_json::Value;

/// What the scripted peer does on the next `recv`.
enum Step {
    Reply(Vec<u8>),
    Fail,
}

/// Everything the transport observed, shared with the test body after the
/// transport has been moved into a client.
#[derive(Clone, Default)]
pub struct Wire {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<Mutex<bool>>,
}

impl Wire {
    /// Every frame sent so far, parsed as JSON.
    pub fn sent(&self) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|frame| serde_json::from_slice(frame).expect("client sent invalid JSON"))
            .collect()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_sent(&self) -> Value {
        self.sent().pop().expect("nothing was sent")
    }

    pub fn closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

/// An in-memory [`Transport`] that answers each `recv` from a script and
/// records each `send`.
///
/// Once the script runs out, `recv` reports a closed peer.
pub struct ScriptedTransport {
    endpoint: Endpoint,
    script: VecDeque<Step>,
    fail_send: bool,
    wire: Wire,
}

impl ScriptedTransport {
    pub fn new() -> (Self, Wire) {
        let wire = Wire::default();
        let transport = Self {
            endpoint: Endpoint::new("mock://nodemanager"),
            script: VecDeque::new(),
            fail_send: false,
            wire: wire.clone(),
        };
        (transport, wire)
    }

    /// Queues a JSON reply.
    pub fn reply(mut self, reply: Value) -> Self {
        self.script
            .push_back(Step::Reply(serde_json::to_vec(&reply).unwrap()));
        self
    }

    /// Queues raw reply bytes.
    pub fn reply_raw(mut self, bytes: &[u8]) -> Self {
        self.script.push_back(Step::Reply(bytes.to_vec()));
        self
    }

    /// Makes the next `recv` fail as if the connection reset.
    pub fn fail_recv(mut self) -> Self {
        self.script.push_back(Step::Fail);
        self
    }

    /// Makes every `send` fail.
    pub fn fail_send(mut self) -> Self {
        self.fail_send = true;
        self
    }
}

impl Transport for ScriptedTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        self.wire.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.script.pop_front() {
            Some(Step::Reply(bytes)) => Ok(Some(bytes)),
            Some(Step::Fail) => Err(TransportError::ReceiveFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            ))),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.wire.closed.lock().unwrap() = true;
        Ok(())
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}
