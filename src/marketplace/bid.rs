//! Bid records: one node of an action chain, addressed by id and hash.
//!
//! Parent linkage is a foreign-key style id, never an object reference, so
//! a chain is a singly-linked list in an arena that serializes trivially.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MAX_RECORD_SIZE;
use crate::error::TradeResult;
use crate::protocol::ActionType;

/// One persisted node in the action chain for a listing item.
///
/// Created exactly once when its message is first successfully processed,
/// by the sender on send or the receiver on receipt. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Arena id, assigned by the store on insert.
    pub id: u64,

    /// Canonical hash of the originating action message.
    pub hash: String,

    /// Action that created this node.
    pub action: ActionType,

    /// Buyer address for the whole chain, copied forward from the root.
    pub bidder: String,

    /// Transport message id, used for redelivery deduplication.
    pub msgid: String,

    /// Sender-side generation timestamp of the message, epoch millis.
    pub generated_at: u64,

    /// Parent node id; `None` only for the root BID of a chain.
    pub parent_bid_id: Option<u64>,

    /// Hash of the listing item this chain negotiates.
    pub listing_item_hash: String,

    /// Present only on the root BID.
    pub shipping_address: Option<String>,

    /// Auxiliary key/value data, copied forward from the parent and
    /// overlaid with this message's objects (later values win).
    pub data: BTreeMap<String, String>,
}

impl Bid {
    /// Whether this node opens its chain.
    pub fn is_root(&self) -> bool {
        self.parent_bid_id.is_none()
    }

    /// Serialize to CBOR for snapshotting.
    pub fn to_cbor(&self) -> TradeResult<Vec<u8>> {
        crate::util::cbor_to_vec(self)
    }

    /// Deserialize from CBOR.
    pub fn from_cbor(data: &[u8]) -> TradeResult<Self> {
        crate::util::cbor_from_limited_reader(data, MAX_RECORD_SIZE)
    }
}
