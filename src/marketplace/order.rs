//! Orders, order items, and the status state machine driven by actions.
//!
//! Transitions are monotonic: every status carries a rank and no row of the
//! transition table lowers it. An action whose precondition does not match
//! the current status is a silent no-op, which is what makes redelivery and
//! operator-triggered resends safe.

use serde::{Deserialize, Serialize};

use crate::protocol::ActionType;
use crate::traits::Direction;

/// Status of one order item, advanced one row at a time by actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderItemStatus {
    /// A BID was placed and awaits the seller's decision.
    Bidded,
    /// Buyer withdrew the bid before escrow.
    BidCancelled,
    /// Seller declined the bid.
    BidRejected,
    /// Seller accepted; waiting for the buyer to fund the escrow.
    AwaitingEscrow,
    /// Funding transaction broadcast; escrow holds the funds.
    EscrowLocked,
    /// Buyer completed the escrow; seller may ship.
    EscrowCompleted,
    /// Seller shipped the item.
    Shipping,
    /// Funds released; trade finished.
    Complete,
    /// Escrowed funds returned to the buyer.
    EscrowRefunded,
}

impl OrderItemStatus {
    /// Position in the forward progression. Absorbing states share the top
    /// rank so no transition out of them can ever be monotonic.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Bidded => 0,
            Self::AwaitingEscrow => 1,
            Self::EscrowLocked => 2,
            Self::EscrowCompleted => 3,
            Self::Shipping => 4,
            Self::Complete | Self::BidCancelled | Self::BidRejected | Self::EscrowRefunded => 5,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::BidCancelled | Self::BidRejected | Self::EscrowRefunded
        )
    }
}

/// Status of a whole order, mirroring its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created by the buyer on send.
    Sent,
    /// Created by the seller on receipt.
    Received,
    /// Negotiation/escrow in progress.
    Processing,
    /// Item on its way.
    Shipping,
    /// Trade finished.
    Complete,
    /// Absorbing outcomes.
    Canceled,
    Rejected,
    Refunded,
}

impl OrderStatus {
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Sent | Self::Received => 0,
            Self::Processing => 1,
            Self::Shipping => 2,
            Self::Complete | Self::Canceled | Self::Rejected | Self::Refunded => 3,
        }
    }

    /// Initial status for a freshly created order.
    pub const fn initial(direction: Direction) -> Self {
        match direction {
            Direction::Outgoing => Self::Sent,
            Direction::Incoming => Self::Received,
        }
    }
}

/// One item of an order, bound to the root bid of its action chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Hash of the listing item being purchased.
    pub item_hash: String,
    /// Arena id of the chain's root BID.
    pub bid_id: u64,
    pub status: OrderItemStatus,
}

/// One negotiated purchase between a buyer and a seller.
///
/// The hash is derived deterministically from buyer, seller and the opening
/// BID's generation timestamp, so both parties agree on the identifier
/// without coordination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub hash: String,
    pub buyer: String,
    pub seller: String,
    pub status: OrderStatus,
    /// Generation timestamp of the opening BID, epoch millis.
    pub generated_at: u64,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn item_for(&self, item_hash: &str) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.item_hash == item_hash)
    }
}

/// Look up the transition row for an action against the current statuses.
///
/// Returns `None` when the precondition does not match, which callers must
/// treat as an already-applied resend, never as an error. BID is absent
/// from this table: it creates the order rather than transitioning it.
pub fn transition_for(
    action: ActionType,
    item: OrderItemStatus,
    order: OrderStatus,
) -> Option<(OrderItemStatus, OrderStatus)> {
    use OrderItemStatus as I;
    use OrderStatus as O;

    let next = match (action, item, order) {
        (ActionType::Accept, I::Bidded, O::Sent | O::Received) => {
            (I::AwaitingEscrow, O::Processing)
        }
        (ActionType::Reject, I::Bidded, O::Sent | O::Received) => (I::BidRejected, O::Rejected),
        (ActionType::Cancel, I::Bidded, O::Sent | O::Received) => (I::BidCancelled, O::Canceled),
        (ActionType::Lock, I::AwaitingEscrow, O::Processing) => (I::EscrowLocked, O::Processing),
        (ActionType::Complete, I::EscrowLocked, O::Processing) => {
            (I::EscrowCompleted, O::Processing)
        }
        (ActionType::Ship, I::EscrowCompleted, O::Processing) => (I::Shipping, O::Shipping),
        (ActionType::Release, I::Shipping, O::Shipping) => (I::Complete, O::Complete),
        // Release without shipment confirmation: the seller settles straight
        // from a completed escrow.
        (ActionType::Release, I::EscrowCompleted, O::Processing) => (I::Complete, O::Complete),
        (ActionType::Refund, I::EscrowLocked | I::EscrowCompleted, O::Processing) => {
            (I::EscrowRefunded, O::Refunded)
        }
        _ => return None,
    };

    debug_assert!(next.0.rank() > item.rank() || next.1.rank() > order.rank());
    Some(next)
}
