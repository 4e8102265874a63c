//! Scripted in-memory hub used by the channel and view tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::client::{HubConnection, HubConnector};
use super::error::HubError;
use super::messages::HubMessage;

const STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Connector that hands out pre-scripted connections in order, then refuses.
#[derive(Debug, Default)]
pub(crate) struct FakeConnector {
    slots: Mutex<VecDeque<FakeConnection>>,
    log: Arc<Mutex<Vec<String>>>,
    attempts: Mutex<usize>,
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues one connection and returns the server end of it.
    pub(crate) fn script(&self) -> FakeRemote {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        self.slots.lock().push_back(FakeConnection {
            id: 0,
            incoming,
            outgoing,
            log: Arc::clone(&self.log),
        });
        FakeRemote {
            to_client: Some(to_client),
            from_client,
        }
    }

    /// Connect, close and release events in order, e.g. `connect#1`.
    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

#[async_trait]
impl HubConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn HubConnection>, HubError> {
        let id = {
            let mut attempts = self.attempts.lock();
            *attempts += 1;
            *attempts
        };
        self.log.lock().push(format!("connect#{}", id));

        match self.slots.lock().pop_front() {
            Some(mut conn) => {
                conn.id = id;
                Ok(Box::new(conn))
            }
            None => Err(HubError::Connection("refused".to_string())),
        }
    }
}

#[derive(Debug)]
pub(crate) struct FakeConnection {
    id: usize,
    incoming: mpsc::UnboundedReceiver<HubMessage>,
    outgoing: mpsc::UnboundedSender<HubMessage>,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl HubConnection for FakeConnection {
    async fn send(&mut self, message: &HubMessage) -> Result<(), HubError> {
        self.outgoing
            .send(message.clone())
            .map_err(|_| HubError::SendFailed("remote gone".to_string()))
    }

    async fn recv(&mut self) -> Option<Result<HubMessage, HubError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.incoming.close();
        self.log.lock().push(format!("close#{}", self.id));
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if self.id > 0 {
            self.log.lock().push(format!("release#{}", self.id));
        }
    }
}

/// Server end of a scripted connection.
#[derive(Debug)]
pub(crate) struct FakeRemote {
    to_client: Option<mpsc::UnboundedSender<HubMessage>>,
    from_client: mpsc::UnboundedReceiver<HubMessage>,
}

impl FakeRemote {
    pub(crate) async fn next_message(&mut self) -> HubMessage {
        tokio::time::timeout(STEP_TIMEOUT, self.from_client.recv())
            .await
            .expect("client message in time")
            .expect("client connection open")
    }

    /// Waits for the next invocation from the client, skipping pings.
    pub(crate) async fn next_invocation(&mut self) -> (String, String, Vec<Value>) {
        loop {
            if let HubMessage::Invocation {
                invocation_id,
                target,
                arguments,
            } = self.next_message().await
            {
                return (invocation_id.unwrap_or_default(), target, arguments);
            }
        }
    }

    /// Acknowledges the join and returns its arguments.
    pub(crate) async fn accept_join(&mut self) -> Vec<Value> {
        let (id, target, arguments) = self.next_invocation().await;
        assert_eq!(target, "JoinAuctionRoom");
        self.push(HubMessage::Completion {
            invocation_id: id,
            result: None,
            error: None,
        });
        arguments
    }

    pub(crate) async fn reject_join(&mut self, reason: &str) {
        let (id, _, _) = self.next_invocation().await;
        self.push(HubMessage::Completion {
            invocation_id: id,
            result: None,
            error: Some(reason.to_string()),
        });
    }

    pub(crate) fn push(&self, message: HubMessage) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(message);
        }
    }

    pub(crate) fn push_bid(&self, auction_id: &str, amount: u64) {
        self.push(HubMessage::event(
            "NewBidPlaced",
            vec![json!({ "auctionId": auction_id, "amount": amount })],
        ));
    }

    pub(crate) fn push_ended(&self) {
        self.push(HubMessage::event("AuctionEnded", vec![]));
    }

    /// Severs the connection from the server side.
    pub(crate) fn drop_connection(&mut self) {
        self.to_client = None;
    }

    /// Waits until the client has released its end.
    pub(crate) async fn closed(&mut self) {
        tokio::time::timeout(STEP_TIMEOUT, async {
            while self.from_client.recv().await.is_some() {}
        })
        .await
        .expect("client released the connection");
    }
}
