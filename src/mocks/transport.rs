//! Mock message transport for testing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::error::{TradeError, TradeResult};
use crate::traits::{DeliveryReceipt, InboundDelivery, MessageTransport};

/// A recorded outbound message for test assertions.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub from: String,
    pub to: String,
    pub payload: Vec<u8>,
    pub retention_days: u32,
    pub msgid: String,
}

/// Mock transport that records sends and can hand them back as inbound
/// deliveries for the counterparty.
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Prefix for generated msgids, so two peers' transports never collide.
    label: String,
    sent: Arc<RwLock<Vec<SentMessage>>>,
    counter: Arc<AtomicU64>,
    fail_sends: Arc<RwLock<bool>>,
}

impl MockTransport {
    /// Create a mock transport. `label` namespaces the msgids it assigns.
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            sent: Arc::new(RwLock::new(Vec::new())),
            counter: Arc::new(AtomicU64::new(0)),
            fail_sends: Arc::new(RwLock::new(false)),
        }
    }

    /// Set whether sends should fail.
    pub async fn set_fail_sends(&self, fail: bool) {
        *self.fail_sends.write().await = fail;
    }

    /// All messages sent so far.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.read().await.clone()
    }

    pub async fn message_count(&self) -> usize {
        self.sent.read().await.len()
    }

    pub async fn clear_messages(&self) {
        self.sent.write().await.clear();
    }

    /// Drain messages addressed to `to` into inbound deliveries, preserving
    /// their transport ids. This is how tests hand one peer's outbox to the
    /// other peer's dispatcher.
    pub async fn drain_deliveries_for(&self, to: &str, received_at: u64) -> Vec<InboundDelivery> {
        let mut sent = self.sent.write().await;
        let (matching, rest): (Vec<_>, Vec<_>) =
            sent.drain(..).partition(|m| m.to == to);
        *sent = rest;
        matching
            .into_iter()
            .map(|m| InboundDelivery {
                msgid: m.msgid,
                from: m.from,
                to: m.to,
                payload: m.payload,
                received_at,
            })
            .collect()
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn send(
        &self,
        from: &str,
        to: &str,
        payload: Vec<u8>,
        retention_days: u32,
    ) -> TradeResult<DeliveryReceipt> {
        if *self.fail_sends.read().await {
            return Err(TradeError::Transport("simulated send failure".into()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let msgid = format!("{}-{n}", self.label);
        self.sent.write().await.push(SentMessage {
            from: from.to_string(),
            to: to.to_string(),
            payload,
            retention_days,
            msgid: msgid.clone(),
        });
        Ok(DeliveryReceipt { msgid })
    }
}
