//! The action service: builds, sends and processes trade protocol messages.
//!
//! One generic service covers all nine actions; the per-action differences
//! (field configs, escrow steps, transition rows) live in small static
//! tables rather than a service-per-action hierarchy.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::store::{MarketStore, OrderMutation};
use crate::error::{TradeError, TradeResult};
use crate::hashing;
use crate::marketplace::{
    transition_for, Bid, ListingItem, Order, OrderItem, OrderItemStatus, OrderStatus,
};
use crate::protocol::{objects, ActionMessage, ActionType, MessageFactory, ProtocolEnvelope};
use crate::traits::{
    Direction, EscrowBroker, MessageTransport, NotificationSink, SettlementKind, TimeProvider,
    TradeNotification, Wallet,
};

/// A user command to perform one protocol action.
///
/// `bid_hash` on reply variants is the hash of the message being replied
/// to, i.e. the chain node the new action extends.
#[derive(Debug, Clone)]
pub enum ActionRequest {
    Bid {
        listing_item_hash: String,
        shipping_address: String,
    },
    Accept {
        bid_hash: String,
    },
    Reject {
        bid_hash: String,
        reason: Option<String>,
    },
    Cancel {
        bid_hash: String,
    },
    Lock {
        bid_hash: String,
    },
    Complete {
        bid_hash: String,
    },
    Refund {
        bid_hash: String,
    },
    Ship {
        bid_hash: String,
        tracking: Option<String>,
    },
    Release {
        bid_hash: String,
    },
}

/// Transport-level metadata accompanying a message into processing.
#[derive(Debug, Clone)]
pub struct TransportMeta {
    /// Transport message id, the redelivery dedup key.
    pub msgid: String,
    /// Sender address.
    pub from: String,
    /// When the message entered processing, epoch millis.
    pub received_at: u64,
}

/// Outcome of one processing attempt.
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The bid record for this message (created now or found existing).
    Processed(Bid),
    /// A causal predecessor is missing; retry later.
    Waiting,
}

/// Escrow step a message takes before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscrowStep {
    None,
    Funding,
    Settlement(SettlementKind),
}

const fn escrow_step(action: ActionType) -> EscrowStep {
    match action {
        ActionType::Lock => EscrowStep::Funding,
        ActionType::Complete => EscrowStep::Settlement(SettlementKind::Complete),
        ActionType::Release => EscrowStep::Settlement(SettlementKind::Release),
        ActionType::Refund => EscrowStep::Settlement(SettlementKind::Refund),
        _ => EscrowStep::None,
    }
}

/// The trade protocol engine for one local identity.
pub struct TradeService<T, E, W, N, C>
where
    T: MessageTransport,
    E: EscrowBroker,
    W: Wallet,
    N: NotificationSink,
    C: TimeProvider + Clone,
{
    my_address: String,
    store: MarketStore,
    factory: MessageFactory<C>,
    transport: T,
    escrow: E,
    wallet: W,
    notifier: N,
    time: C,
    config: EngineConfig,
}

impl<T, E, W, N, C> TradeService<T, E, W, N, C>
where
    T: MessageTransport,
    E: EscrowBroker,
    W: Wallet,
    N: NotificationSink,
    C: TimeProvider + Clone,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        my_address: &str,
        store: MarketStore,
        transport: T,
        escrow: E,
        wallet: W,
        notifier: N,
        time: C,
        config: EngineConfig,
    ) -> Self {
        Self {
            my_address: my_address.to_string(),
            store,
            factory: MessageFactory::new(time.clone()),
            transport,
            escrow,
            wallet,
            notifier,
            time,
            config,
        }
    }

    pub fn my_address(&self) -> &str {
        &self.my_address
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    /// Execute one protocol action end to end: build the message, run its
    /// escrow step, send it, and process the local echo.
    pub async fn submit(&self, request: ActionRequest) -> TradeResult<Bid> {
        let (mut msg, listing, to) = self.create_message(&request).await?;

        self.before_send(&mut msg, &listing).await?;

        let payload = ProtocolEnvelope::new(msg.clone()).to_bytes()?;
        let receipt = self
            .transport
            .send(&self.my_address, &to, payload, self.config.retention_days)
            .await?;
        info!(action = %msg.action, to, msgid = receipt.msgid, "sent action message");

        let meta = TransportMeta {
            msgid: receipt.msgid,
            from: self.my_address.clone(),
            received_at: self.time.now_millis(),
        };
        match self.process(&msg, Direction::Outgoing, &meta).await? {
            ProcessOutcome::Processed(bid) => Ok(bid),
            // create_message resolved the parent already, so our own echo
            // can never be premature.
            ProcessOutcome::Waiting => Err(TradeError::InvalidState(
                "own message parked as waiting".to_string(),
            )),
        }
    }

    /// Step 1: build the outgoing message and resolve its destination.
    ///
    /// For BID this first recomputes the canonical listing hash and asserts
    /// it matches the stored one, catching a tampered or stale listing
    /// before any money-adjacent message exists.
    async fn create_message(
        &self,
        request: &ActionRequest,
    ) -> TradeResult<(ActionMessage, ListingItem, String)> {
        if let ActionRequest::Bid {
            listing_item_hash,
            shipping_address,
        } = request
        {
            let listing = self
                .store
                .listing_by_hash(listing_item_hash)
                .await
                .ok_or_else(|| {
                    TradeError::NotFound(format!("listing {listing_item_hash} not found"))
                })?;
            listing.verify_hash()?;

            let msg = self
                .factory
                .bid(&listing, &self.my_address, shipping_address)?;
            let to = listing.seller.clone();
            return Ok((msg, listing, to));
        }

        let parent_hash = match request {
            ActionRequest::Bid { .. } => unreachable!("handled above"),
            ActionRequest::Accept { bid_hash }
            | ActionRequest::Reject { bid_hash, .. }
            | ActionRequest::Cancel { bid_hash }
            | ActionRequest::Lock { bid_hash }
            | ActionRequest::Complete { bid_hash }
            | ActionRequest::Refund { bid_hash }
            | ActionRequest::Ship { bid_hash, .. }
            | ActionRequest::Release { bid_hash } => bid_hash.as_str(),
        };

        let parent = self.store.bid_by_hash(parent_hash).await.ok_or_else(|| {
            TradeError::NotFound(format!("no local bid with hash {parent_hash}"))
        })?;
        let listing = self
            .store
            .listing_by_hash(&parent.listing_item_hash)
            .await
            .ok_or_else(|| {
                TradeError::NotFound(format!("listing {} not found", parent.listing_item_hash))
            })?;

        let msg = match request {
            ActionRequest::Accept { .. } => self.factory.accept(parent_hash)?,
            ActionRequest::Reject { reason, .. } => {
                self.factory.reject(parent_hash, reason.as_deref())?
            }
            ActionRequest::Cancel { .. } => self.factory.cancel(parent_hash)?,
            ActionRequest::Lock { .. } => self.factory.lock(parent_hash)?,
            ActionRequest::Complete { .. } => self.factory.complete(parent_hash)?,
            ActionRequest::Refund { .. } => self.factory.refund(parent_hash)?,
            ActionRequest::Ship { tracking, .. } => {
                self.factory.ship(parent_hash, tracking.as_deref())?
            }
            ActionRequest::Release { .. } => self.factory.release(parent_hash)?,
            ActionRequest::Bid { .. } => unreachable!("handled above"),
        };

        // The counterparty: sellers answer the chain's buyer, buyers
        // address the listing's seller.
        let to = if self.my_address == listing.seller {
            parent.bidder.clone()
        } else {
            listing.seller.clone()
        };
        Ok((msg, listing, to))
    }

    /// Step 2: for escrow actions, build and broadcast the transaction and
    /// append its txid so the counterparty learns it atomically with the
    /// protocol message. The settlement field config excludes `objects`,
    /// so the sealed hash stays valid.
    async fn before_send(&self, msg: &mut ActionMessage, listing: &ListingItem) -> TradeResult<()> {
        let chain_ref = msg.bid.clone().unwrap_or_else(|| msg.hash.clone());
        let tx = match escrow_step(msg.action) {
            EscrowStep::None => return Ok(()),
            EscrowStep::Funding => self.escrow.build_funding_tx(listing, &chain_ref).await?,
            EscrowStep::Settlement(kind) => {
                self.escrow
                    .build_settlement_tx(listing, &chain_ref, kind)
                    .await?
            }
        };
        let txid = self.escrow.broadcast(tx).await?;
        info!(action = %msg.action, txid, "broadcast escrow transaction");
        msg.set_object(objects::TXID, txid);
        Ok(())
    }

    /// Steps 4–6: turn a validated message into local state changes.
    ///
    /// Idempotent under both transport redelivery (msgid dedup) and
    /// operator resends under a fresh transport id (hash dedup). The status
    /// transition applies only when the exact precondition matches; a
    /// non-matching precondition is a logged no-op, never an error.
    pub async fn process(
        &self,
        msg: &ActionMessage,
        direction: Direction,
        meta: &TransportMeta,
    ) -> TradeResult<ProcessOutcome> {
        if let Some(existing) = self.store.bid_by_msgid(&meta.msgid).await {
            debug!(msgid = meta.msgid, "transport redelivery, returning existing bid");
            return Ok(ProcessOutcome::Processed(existing));
        }
        if let Some(existing) = self.store.bid_by_hash(&msg.hash).await {
            debug!(hash = msg.hash, "message resend, returning existing bid");
            return Ok(ProcessOutcome::Processed(existing));
        }

        let parent = match msg.bid.as_deref() {
            None => None,
            Some(parent_hash) => match self.store.bid_by_hash(parent_hash).await {
                Some(parent) => Some(parent),
                None => {
                    debug!(action = %msg.action, parent = parent_hash, "parent not arrived yet");
                    return Ok(ProcessOutcome::Waiting);
                }
            },
        };

        let stored = match parent {
            None => self.process_root(msg, direction, meta).await?,
            Some(parent) => self.process_reply(msg, parent, direction, meta).await?,
        };

        if direction == Direction::Incoming {
            self.notify(&stored).await;
        }
        Ok(ProcessOutcome::Processed(stored))
    }

    /// Root BID: verify the carried order hash and create Order/OrderItem.
    async fn process_root(
        &self,
        msg: &ActionMessage,
        direction: Direction,
        meta: &TransportMeta,
    ) -> TradeResult<Bid> {
        let listing_hash = msg
            .object_value(objects::LISTING_ITEM_HASH)
            .ok_or_else(|| TradeError::Validation("BID without listing reference".to_string()))?;
        let listing = self
            .store
            .listing_by_hash(listing_hash)
            .await
            .ok_or_else(|| TradeError::NotFound(format!("listing {listing_hash} not found")))?;

        let bidder = meta.from.clone();
        let carried = msg
            .object_value(objects::ORDER_HASH)
            .ok_or_else(|| TradeError::Validation("BID without order hash".to_string()))?;
        let recomputed = hashing::order_hash(&bidder, &listing.seller, msg.generated)?;
        if carried != recomputed {
            // The two parties disagree about who is negotiating what; the
            // order must not be created.
            return Err(TradeError::Validation(format!(
                "order hash mismatch: message carries {carried}, derived {recomputed}"
            )));
        }

        let bid = Bid {
            id: 0,
            hash: msg.hash.clone(),
            action: msg.action,
            bidder: bidder.clone(),
            msgid: meta.msgid.clone(),
            generated_at: msg.generated,
            parent_bid_id: None,
            listing_item_hash: listing.hash.clone(),
            shipping_address: msg
                .object_value(objects::SHIPPING_ADDRESS)
                .map(str::to_string),
            data: objects_to_map(msg),
        };

        let order = Order {
            hash: carried.to_string(),
            buyer: bidder,
            seller: listing.seller.clone(),
            status: OrderStatus::initial(direction),
            generated_at: msg.generated,
            items: vec![OrderItem {
                item_hash: listing.hash.clone(),
                bid_id: 0,
                status: OrderItemStatus::Bidded,
            }],
        };

        let stored = self.store.commit(bid, OrderMutation::Create(order)).await?;
        info!(
            bid_id = stored.id,
            listing = listing.hash,
            order = carried,
            "opened bid chain"
        );
        Ok(stored)
    }

    /// Non-root action: extend the chain and drive the status machine.
    async fn process_reply(
        &self,
        msg: &ActionMessage,
        parent: Bid,
        _direction: Direction,
        meta: &TransportMeta,
    ) -> TradeResult<Bid> {
        let root = self
            .store
            .chain_root(parent.id)
            .await
            .ok_or_else(|| TradeError::InvalidState("chain without a root".to_string()))?;
        let order = self
            .store
            .order_for_root_bid(root.id)
            .await
            .ok_or_else(|| TradeError::InvalidState(format!("chain {} has no order", root.hash)))?;
        let item = order
            .item_for(&root.listing_item_hash)
            .ok_or_else(|| TradeError::InvalidState("order lost its item".to_string()))?;

        let mutation = match transition_for(msg.action, item.status, order.status) {
            Some((item_status, order_status)) => {
                if matches!(msg.action, ActionType::Cancel | ActionType::Reject) {
                    // Compensating action: give back the outputs reserved
                    // for this chain, in the same logical operation as the
                    // status transition.
                    self.wallet.release_reserved_outputs(&root.hash).await?;
                    info!(chain = root.hash, "released reserved outputs");
                }
                OrderMutation::Transition {
                    order_hash: order.hash.clone(),
                    item_hash: root.listing_item_hash.clone(),
                    item_status,
                    order_status,
                }
            }
            None => {
                debug!(
                    action = %msg.action,
                    item_status = ?item.status,
                    order_status = ?order.status,
                    "status precondition not met, treating as already applied"
                );
                OrderMutation::None
            }
        };

        // Aux data flows down the chain: parent values first, this
        // message's objects overlaid, later values winning.
        let mut data = parent.data.clone();
        for kv in &msg.objects {
            data.insert(kv.key.clone(), kv.value.clone());
        }

        let bid = Bid {
            id: 0,
            hash: msg.hash.clone(),
            action: msg.action,
            bidder: parent.bidder.clone(),
            msgid: meta.msgid.clone(),
            generated_at: msg.generated,
            parent_bid_id: Some(parent.id),
            listing_item_hash: parent.listing_item_hash.clone(),
            shipping_address: None,
            data,
        };

        let stored = self.store.commit(bid, mutation).await?;
        info!(
            bid_id = stored.id,
            action = %msg.action,
            chain = root.hash,
            "extended bid chain"
        );
        Ok(stored)
    }

    /// Step 5: surface an event for an inbound action. Notification
    /// failures are logged, never fatal: the bid is already durable.
    async fn notify(&self, bid: &Bid) {
        let market = self
            .store
            .listing_by_hash(&bid.listing_item_hash)
            .await
            .map(|l| l.market)
            .unwrap_or_default();

        let payload = TradeNotification {
            bid_id: bid.id,
            bid_hash: bid.hash.clone(),
            bidder: bid.bidder.clone(),
            listing_item_hash: bid.listing_item_hash.clone(),
            market,
        };
        if let Err(e) = self.notifier.emit(bid.action.as_str(), payload).await {
            warn!(action = %bid.action, "notification emit failed: {e}");
        }
    }
}

fn objects_to_map(msg: &ActionMessage) -> BTreeMap<String, String> {
    msg.objects
        .iter()
        .map(|kv| (kv.key.clone(), kv.value.clone()))
        .collect()
}
