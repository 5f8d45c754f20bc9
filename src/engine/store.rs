//! In-memory arena for bids, orders and listings.
//!
//! Bid records are addressed by stable integer id; parent linkage is a
//! foreign-key style index, never an object reference, so chains serialize
//! trivially and cannot form reference cycles. One write guard covers a bid
//! insert together with its order mutation, which is the "same unit of
//! work" the processing pipeline relies on.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{TradeError, TradeResult};
use crate::marketplace::{Bid, ListingItem, Order, OrderItemStatus, OrderStatus};
use crate::protocol::ActionType;

#[derive(Default)]
struct StoreInner {
    next_bid_id: u64,
    bids: HashMap<u64, Bid>,
    bid_by_hash: HashMap<String, u64>,
    bid_by_msgid: HashMap<String, u64>,
    children: HashMap<u64, Vec<u64>>,
    orders: HashMap<String, Order>,
    order_by_root_bid: HashMap<u64, String>,
    listings: HashMap<String, ListingItem>,
}

/// Order-side effect committed atomically with a bid insert.
#[derive(Debug, Clone)]
pub enum OrderMutation {
    /// Status precondition did not match: the bid is the durable fact,
    /// the order is left untouched.
    None,
    /// Root BID: create the order. The single item's `bid_id` is filled
    /// with the freshly assigned bid id at commit time.
    Create(Order),
    /// Advance the statuses of an existing order and its item.
    Transition {
        order_hash: String,
        item_hash: String,
        item_status: OrderItemStatus,
        order_status: OrderStatus,
    },
}

/// Shared handle to the trade state arena.
#[derive(Clone, Default)]
pub struct MarketStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a listing from the catalog collaborator.
    pub async fn put_listing(&self, listing: ListingItem) {
        self.inner
            .write()
            .await
            .listings
            .insert(listing.hash.clone(), listing);
    }

    pub async fn listing_by_hash(&self, hash: &str) -> Option<ListingItem> {
        self.inner.read().await.listings.get(hash).cloned()
    }

    pub async fn bid_by_id(&self, id: u64) -> Option<Bid> {
        self.inner.read().await.bids.get(&id).cloned()
    }

    pub async fn bid_by_hash(&self, hash: &str) -> Option<Bid> {
        let inner = self.inner.read().await;
        inner
            .bid_by_hash
            .get(hash)
            .and_then(|id| inner.bids.get(id))
            .cloned()
    }

    pub async fn bid_by_msgid(&self, msgid: &str) -> Option<Bid> {
        let inner = self.inner.read().await;
        inner
            .bid_by_msgid
            .get(msgid)
            .and_then(|id| inner.bids.get(id))
            .cloned()
    }

    pub async fn children_of(&self, id: u64) -> Vec<Bid> {
        let inner = self.inner.read().await;
        inner
            .children
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|child| inner.bids.get(child))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Action types along the chain from the given bid up to its root,
    /// inclusive.
    pub async fn chain_types(&self, id: u64) -> Vec<ActionType> {
        let inner = self.inner.read().await;
        let mut types = Vec::new();
        let mut cursor = inner.bids.get(&id);
        while let Some(bid) = cursor {
            types.push(bid.action);
            cursor = bid.parent_bid_id.and_then(|pid| inner.bids.get(&pid));
        }
        types
    }

    /// Walk up to the root BID of the chain containing `id`.
    pub async fn chain_root(&self, id: u64) -> Option<Bid> {
        let inner = self.inner.read().await;
        let mut cursor = inner.bids.get(&id)?;
        while let Some(pid) = cursor.parent_bid_id {
            cursor = inner.bids.get(&pid)?;
        }
        Some(cursor.clone())
    }

    pub async fn order_by_hash(&self, hash: &str) -> Option<Order> {
        self.inner.read().await.orders.get(hash).cloned()
    }

    /// The order created by the chain rooted at the given bid id.
    pub async fn order_for_root_bid(&self, root_id: u64) -> Option<Order> {
        let inner = self.inner.read().await;
        inner
            .order_by_root_bid
            .get(&root_id)
            .and_then(|hash| inner.orders.get(hash))
            .cloned()
    }

    /// Persist a bid and apply its order mutation under one write guard.
    ///
    /// The bid's `id` is assigned here. A duplicate message hash is a store
    /// error: chains are singly linked, so two bids sharing a hash would
    /// mean fan-out.
    pub async fn commit(&self, mut bid: Bid, mutation: OrderMutation) -> TradeResult<Bid> {
        let mut inner = self.inner.write().await;

        if inner.bid_by_hash.contains_key(&bid.hash) {
            return Err(TradeError::Store(format!(
                "bid with hash {} already exists",
                bid.hash
            )));
        }
        if inner.bid_by_msgid.contains_key(&bid.msgid) {
            return Err(TradeError::Store(format!(
                "bid with transport id {} already exists",
                bid.msgid
            )));
        }

        inner.next_bid_id += 1;
        bid.id = inner.next_bid_id;

        inner.bid_by_hash.insert(bid.hash.clone(), bid.id);
        inner.bid_by_msgid.insert(bid.msgid.clone(), bid.id);
        if let Some(parent) = bid.parent_bid_id {
            inner.children.entry(parent).or_default().push(bid.id);
        }
        inner.bids.insert(bid.id, bid.clone());

        match mutation {
            OrderMutation::None => {}
            OrderMutation::Create(mut order) => {
                for item in &mut order.items {
                    item.bid_id = bid.id;
                }
                inner.order_by_root_bid.insert(bid.id, order.hash.clone());
                inner.orders.insert(order.hash.clone(), order);
            }
            OrderMutation::Transition {
                order_hash,
                item_hash,
                item_status,
                order_status,
            } => {
                let order = inner.orders.get_mut(&order_hash).ok_or_else(|| {
                    TradeError::Store(format!("order {order_hash} not found for transition"))
                })?;
                let item = order
                    .items
                    .iter_mut()
                    .find(|i| i.item_hash == item_hash)
                    .ok_or_else(|| {
                        TradeError::Store(format!(
                            "order item {item_hash} not found on {order_hash}"
                        ))
                    })?;
                // Transitions never regress; the table guarantees it, the
                // store enforces it.
                if item_status.rank() < item.status.rank()
                    || order_status.rank() < order.status.rank()
                {
                    return Err(TradeError::Store(format!(
                        "refusing status regression on {order_hash}"
                    )));
                }
                item.status = item_status;
                order.status = order_status;
            }
        }

        Ok(bid)
    }

    /// Number of persisted bids, for diagnostics and tests.
    pub async fn bid_count(&self) -> usize {
        self.inner.read().await.bids.len()
    }
}
