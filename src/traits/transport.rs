//! Message transport abstraction for the store-and-forward messaging layer.
//!
//! The transport is asynchronous and makes no ordering guarantees: messages
//! may arrive late, out of order, or more than once. The engine derives
//! correctness from the parent-hash chain and idempotent processing, never
//! from arrival order. Retry and resend are owned by the transport itself,
//! not by this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TradeResult;

/// Whether a message was produced locally or arrived from the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Receipt returned by the transport for an accepted outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Transport-assigned message id, used for deduplication on both sides.
    pub msgid: String,
}

/// An inbound message pushed by the transport to the dispatcher.
#[derive(Debug, Clone)]
pub struct InboundDelivery {
    /// Transport-assigned message id.
    pub msgid: String,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Serialized protocol envelope.
    pub payload: Vec<u8>,
    /// Unix timestamp in milliseconds when the transport surfaced the message.
    pub received_at: u64,
}

/// Abstraction over the encrypted store-and-forward messaging layer.
#[async_trait]
pub trait MessageTransport: Send + Sync + Clone {
    /// Hand a serialized envelope to the transport for delivery.
    ///
    /// `retention_days` is how long the transport should retain the message
    /// for a peer that is currently offline.
    async fn send(
        &self,
        from: &str,
        to: &str,
        payload: Vec<u8>,
        retention_days: u32,
    ) -> TradeResult<DeliveryReceipt>;
}
