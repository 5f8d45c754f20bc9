//! Inbound message dispatcher.
//!
//! Decodes, validates and routes arriving messages into the action
//! service, parking premature ones in the waiting pool. Processing is
//! serialized per bid chain: the status machine reads then writes shared
//! order state, so two messages of one chain must never race. Messages of
//! independent chains proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{WAITING_MAX_ATTEMPTS, WAITING_RETRY_DELAY_MS};
use crate::engine::service::{ProcessOutcome, TradeService, TransportMeta};
use crate::engine::waiting::WaitingPool;
use crate::protocol::{
    objects, validate_message, validate_sequence, verify_hash, ActionMessage, ActionType,
    ProtocolEnvelope, SequenceCheck,
};
use crate::traits::{
    Direction, EscrowBroker, InboundDelivery, MessageTransport, NotificationSink, TimeProvider,
    Wallet,
};

/// Resolution of one processing attempt, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Processed,
    /// Parked for replay; treat as "try again later", not as an error.
    Waiting,
    /// Permanent failure: structural/tamper rejection, a hard processing
    /// error, or waiting-pool exhaustion.
    ProcessingFailed,
}

/// Routes inbound deliveries into the trade service.
pub struct InboundDispatcher<T, E, W, N, C>
where
    T: MessageTransport,
    E: EscrowBroker,
    W: Wallet,
    N: NotificationSink,
    C: TimeProvider + Clone,
{
    service: Arc<TradeService<T, E, W, N, C>>,
    waiting: WaitingPool,
    chain_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    time: C,
}

impl<T, E, W, N, C> InboundDispatcher<T, E, W, N, C>
where
    T: MessageTransport,
    E: EscrowBroker,
    W: Wallet,
    N: NotificationSink,
    C: TimeProvider + Clone,
{
    pub fn new(service: Arc<TradeService<T, E, W, N, C>>, time: C) -> Self {
        Self {
            service,
            waiting: WaitingPool::new(),
            chain_locks: Mutex::new(HashMap::new()),
            time,
        }
    }

    pub fn service(&self) -> &Arc<TradeService<T, E, W, N, C>> {
        &self.service
    }

    pub fn waiting(&self) -> &WaitingPool {
        &self.waiting
    }

    /// Handle one inbound delivery.
    pub async fn dispatch(&self, delivery: InboundDelivery) -> ProcessingStatus {
        self.dispatch_attempt(delivery, 1).await
    }

    async fn dispatch_attempt(&self, delivery: InboundDelivery, attempt: u32) -> ProcessingStatus {
        let envelope = match ProtocolEnvelope::from_bytes(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(msgid = delivery.msgid, "rejecting undecodable envelope: {e}");
                return ProcessingStatus::ProcessingFailed;
            }
        };
        let msg = envelope.action;

        if let Err(e) = validate_message(&msg) {
            warn!(msgid = delivery.msgid, action = %msg.action, "structural rejection: {e}");
            return ProcessingStatus::ProcessingFailed;
        }

        // BID hashes fold in the listing's escrow terms, so integrity
        // verification needs our copy of the listing.
        let listing = match msg.action {
            ActionType::Bid => {
                let listing_hash = msg.object_value(objects::LISTING_ITEM_HASH).unwrap_or("");
                match self.service.store().listing_by_hash(listing_hash).await {
                    Some(listing) => Some(listing),
                    None => {
                        warn!(
                            msgid = delivery.msgid,
                            listing = listing_hash,
                            "rejecting BID for unknown listing"
                        );
                        return ProcessingStatus::ProcessingFailed;
                    }
                }
            }
            _ => None,
        };

        if let Err(e) = verify_hash(&msg, listing.as_ref()) {
            warn!(msgid = delivery.msgid, action = %msg.action, "integrity rejection: {e}");
            return ProcessingStatus::ProcessingFailed;
        }

        // Serialize processing per chain.
        let chain_lock = self.chain_lock_for(&msg).await;
        let _guard = chain_lock.lock().await;

        match validate_sequence(&msg, self.service.store()).await {
            Ok(SequenceCheck::Ready) => {}
            Ok(SequenceCheck::AwaitingParent) => {
                return self.park(delivery, attempt).await;
            }
            Err(e) => {
                warn!(msgid = delivery.msgid, action = %msg.action, "sequence rejection: {e}");
                return ProcessingStatus::ProcessingFailed;
            }
        }

        let meta = TransportMeta {
            msgid: delivery.msgid.clone(),
            from: delivery.from.clone(),
            received_at: delivery.received_at,
        };
        match self.service.process(&msg, Direction::Incoming, &meta).await {
            Ok(ProcessOutcome::Processed(bid)) => {
                debug!(msgid = delivery.msgid, bid_id = bid.id, "delivery processed");
                ProcessingStatus::Processed
            }
            Ok(ProcessOutcome::Waiting) => self.park(delivery, attempt).await,
            Err(e) => {
                error!(msgid = delivery.msgid, action = %msg.action, "processing failed: {e}");
                ProcessingStatus::ProcessingFailed
            }
        }
    }

    async fn park(&self, delivery: InboundDelivery, attempt: u32) -> ProcessingStatus {
        if attempt >= WAITING_MAX_ATTEMPTS {
            error!(
                msgid = delivery.msgid,
                attempts = attempt,
                "giving up on delivery: predecessor never arrived"
            );
            return ProcessingStatus::ProcessingFailed;
        }
        debug!(msgid = delivery.msgid, attempt, "parking delivery until its parent arrives");
        self.waiting
            .park(delivery, attempt, self.time.now_millis())
            .await;
        ProcessingStatus::Waiting
    }

    /// Replay entries whose delay has elapsed. Returns one status per
    /// replayed entry, for callers that track progress.
    pub async fn poll_waiting(&self) -> Vec<ProcessingStatus> {
        let due = self.waiting.take_due(self.time.now_millis()).await;
        let mut statuses = Vec::with_capacity(due.len());
        for entry in due {
            statuses.push(
                self.dispatch_attempt(entry.delivery, entry.attempts + 1)
                    .await,
            );
        }
        statuses
    }

    /// Pump deliveries from the transport until cancelled, replaying the
    /// waiting pool between messages.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundDelivery>, cancel: CancellationToken) {
        let mut tick =
            tokio::time::interval(std::time::Duration::from_millis(WAITING_RETRY_DELAY_MS));
        info!("inbound dispatcher running");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("inbound dispatcher shutting down");
                    break;
                }
                delivery = rx.recv() => {
                    match delivery {
                        Some(delivery) => { self.dispatch(delivery).await; }
                        None => {
                            info!("delivery channel closed, dispatcher stopping");
                            break;
                        }
                    }
                }
                _ = tick.tick() => {
                    self.poll_waiting().await;
                }
            }
        }
    }

    /// Per-chain mutual exclusion. Keyed by the chain's root hash when the
    /// parent is resolvable; a message whose parent is unknown keys on the
    /// parent reference itself, which is stable for that message and only
    /// ever leads to a parked outcome.
    async fn chain_lock_for(&self, msg: &ActionMessage) -> Arc<Mutex<()>> {
        let key = match msg.bid.as_deref() {
            None => msg.hash.clone(),
            Some(parent_hash) => match self.service.store().bid_by_hash(parent_hash).await {
                Some(parent) => self
                    .service
                    .store()
                    .chain_root(parent.id)
                    .await
                    .map(|root| root.hash)
                    .unwrap_or_else(|| parent_hash.to_string()),
                None => parent_hash.to_string(),
            },
        };
        let mut locks = self.chain_locks.lock().await;
        locks.entry(key).or_default().clone()
    }
}
