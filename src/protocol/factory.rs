//! Message factories: one constructor per action type.
//!
//! Every constructor populates the message fields from domain inputs and
//! seals the canonical hash as its last step. Replies carry the hash of
//! the message they answer; only BID opens a chain without one.

use crate::error::TradeResult;
use crate::hashing::{self, Extensions};
use crate::marketplace::ListingItem;
use crate::protocol::message::{
    bid_extensions, hash_message, objects, ActionMessage, ActionType, KeyValue,
};
use crate::traits::TimeProvider;

/// Builds outgoing action messages with a pluggable clock.
#[derive(Debug, Clone)]
pub struct MessageFactory<C: TimeProvider> {
    time: C,
}

impl<C: TimeProvider> MessageFactory<C> {
    pub fn new(time: C) -> Self {
        Self { time }
    }

    fn seal(
        &self,
        action: ActionType,
        bid: Option<String>,
        objects: Vec<KeyValue>,
        extensions: &Extensions,
    ) -> TradeResult<ActionMessage> {
        let mut msg = ActionMessage {
            action,
            generated: self.time.now_millis(),
            hash: String::new(),
            bid,
            objects,
        };
        msg.hash = hash_message(&msg, extensions)?;
        Ok(msg)
    }

    /// Open a new chain by bidding on a listing. The order hash is derived
    /// here, by whichever party bids first, and carried so both peers agree
    /// on the order identifier without coordination.
    pub fn bid(
        &self,
        listing: &ListingItem,
        buyer: &str,
        shipping_address: &str,
    ) -> TradeResult<ActionMessage> {
        let generated = self.time.now_millis();
        let order_hash = hashing::order_hash(buyer, &listing.seller, generated)?;

        let mut msg = ActionMessage {
            action: ActionType::Bid,
            generated,
            hash: String::new(),
            bid: None,
            objects: vec![
                KeyValue::new(objects::LISTING_ITEM_HASH, listing.hash.clone()),
                KeyValue::new(objects::ORDER_HASH, order_hash),
                KeyValue::new(objects::SHIPPING_ADDRESS, shipping_address),
            ],
        };
        msg.hash = hash_message(&msg, &bid_extensions(listing, shipping_address))?;
        Ok(msg)
    }

    /// Seller accepts a bid.
    pub fn accept(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Accept,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }

    /// Seller rejects a bid, optionally with a reason.
    pub fn reject(&self, parent_hash: &str, reason: Option<&str>) -> TradeResult<ActionMessage> {
        let objects = reason
            .map(|r| vec![KeyValue::new(objects::REASON, r)])
            .unwrap_or_default();
        self.seal(
            ActionType::Reject,
            Some(parent_hash.to_string()),
            objects,
            &Extensions::new(),
        )
    }

    /// Buyer withdraws a bid.
    pub fn cancel(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Cancel,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }

    /// Buyer locks the escrow. The funding txid is appended by the caller
    /// after broadcast; the settlement field config excludes `objects` so
    /// the sealed hash stays valid.
    pub fn lock(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Lock,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }

    /// Buyer completes the escrow.
    pub fn complete(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Complete,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }

    /// Funds are returned to the buyer.
    pub fn refund(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Refund,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }

    /// Seller ships the item, optionally carrying a tracking reference.
    pub fn ship(&self, parent_hash: &str, tracking: Option<&str>) -> TradeResult<ActionMessage> {
        let objects = tracking
            .map(|t| vec![KeyValue::new(objects::TRACKING, t)])
            .unwrap_or_default();
        self.seal(
            ActionType::Ship,
            Some(parent_hash.to_string()),
            objects,
            &Extensions::new(),
        )
    }

    /// Seller releases the escrowed funds, finishing the trade.
    pub fn release(&self, parent_hash: &str) -> TradeResult<ActionMessage> {
        self.seal(
            ActionType::Release,
            Some(parent_hash.to_string()),
            Vec::new(),
            &Extensions::new(),
        )
    }
}
