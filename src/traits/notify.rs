//! Notification sink abstraction.
//!
//! Only the event shape is specified here; the delivery mechanism (a
//! pub/sub socket, a UI bridge) lives outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TradeResult;

/// Payload emitted for every processed inbound action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeNotification {
    pub bid_id: u64,
    pub bid_hash: String,
    pub bidder: String,
    pub listing_item_hash: String,
    pub market: String,
}

/// Abstraction over notification delivery.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Emit an event named after the action's wire name.
    async fn emit(&self, event: &str, payload: TradeNotification) -> TradeResult<()>;
}
