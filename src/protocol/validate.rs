//! Message validation: structure, integrity, and chain sequencing.
//!
//! Structural validation never touches persisted state. Sequence validation
//! answers only "does a causal predecessor exist"; the finer check against
//! the exact current status belongs to the processing pipeline, where it
//! has to survive resends.

use tracing::debug;

use crate::engine::store::MarketStore;
use crate::error::{TradeError, TradeResult};
use crate::hashing::Extensions;
use crate::marketplace::ListingItem;
use crate::protocol::message::{bid_extensions, hash_message, objects, ActionMessage, ActionType};

/// Outcome of sequence validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// All causal predecessors are present locally.
    Ready,
    /// A predecessor has not arrived yet; retry later.
    AwaitingParent,
}

/// Structural validation: required fields and enum membership only.
pub fn validate_message(msg: &ActionMessage) -> TradeResult<()> {
    if msg.generated == 0 {
        return Err(TradeError::Validation(
            "generated timestamp missing".to_string(),
        ));
    }
    if msg.hash.is_empty() {
        return Err(TradeError::Validation("hash missing".to_string()));
    }

    match (&msg.bid, msg.action.requires_parent()) {
        (Some(parent), true) if parent.is_empty() => {
            return Err(TradeError::Validation(format!(
                "{} carries an empty parent reference",
                msg.action
            )));
        }
        (None, true) => {
            return Err(TradeError::Validation(format!(
                "{} requires a parent reference",
                msg.action
            )));
        }
        (Some(_), false) => {
            return Err(TradeError::Validation(
                "BID must open a new chain, not reference a parent".to_string(),
            ));
        }
        _ => {}
    }

    if msg.action == ActionType::Bid {
        for key in [
            objects::ORDER_HASH,
            objects::LISTING_ITEM_HASH,
            objects::SHIPPING_ADDRESS,
        ] {
            if !msg.object_value(key).is_some_and(|v| !v.is_empty()) {
                return Err(TradeError::Validation(format!(
                    "BID is missing required object {key}"
                )));
            }
        }
    }

    Ok(())
}

/// Integrity check: recompute the canonical hash and compare it against the
/// claimed one. A mismatch is classified as tampering and is permanent.
///
/// For BID the hash folds in the listing's escrow terms, so the locally
/// stored [`ListingItem`] must be supplied; disagreement about the listing
/// surfaces as a mismatch here.
pub fn verify_hash(msg: &ActionMessage, listing: Option<&ListingItem>) -> TradeResult<()> {
    let extensions = if msg.action == ActionType::Bid {
        let listing = listing.ok_or_else(|| {
            TradeError::NotFound(format!(
                "listing {} required to verify BID",
                msg.object_value(objects::LISTING_ITEM_HASH).unwrap_or("?")
            ))
        })?;
        let shipping = msg
            .object_value(objects::SHIPPING_ADDRESS)
            .unwrap_or_default();
        bid_extensions(listing, shipping)
    } else {
        Extensions::new()
    };

    let recomputed = hash_message(msg, &extensions)?;
    if recomputed != msg.hash {
        return Err(TradeError::Tamper(format!(
            "{} message claims {} but hashes to {recomputed}",
            msg.action, msg.hash
        )));
    }
    Ok(())
}

/// Sequence validation: check that the causal predecessors this action
/// requires exist in the local store.
///
/// A missing predecessor yields [`SequenceCheck::AwaitingParent`]: the
/// message may simply have overtaken its parent in transit. A predecessor
/// of the wrong type is a hard sequence error: no honest peer produces it.
pub async fn validate_sequence(
    msg: &ActionMessage,
    store: &MarketStore,
) -> TradeResult<SequenceCheck> {
    let Some(parent_hash) = msg.bid.as_deref() else {
        // BID opens a new chain; nothing to check.
        return Ok(SequenceCheck::Ready);
    };

    let Some(parent) = store.bid_by_hash(parent_hash).await else {
        debug!(action = %msg.action, parent = parent_hash, "parent not found yet");
        return Ok(SequenceCheck::AwaitingParent);
    };

    let ancestry = store.chain_types(parent.id).await;
    let chain_has = |action: ActionType| ancestry.contains(&action);

    let required: &[ActionType] = match msg.action {
        ActionType::Bid => &[],
        ActionType::Accept | ActionType::Reject | ActionType::Cancel => {
            if parent.action != ActionType::Bid {
                return Err(TradeError::Sequence(format!(
                    "{} must reply to a BID, found {}",
                    msg.action, parent.action
                )));
            }
            &[]
        }
        ActionType::Lock => &[ActionType::Accept],
        ActionType::Complete => &[ActionType::Accept, ActionType::Lock],
        ActionType::Ship => &[ActionType::Complete],
        ActionType::Release | ActionType::Refund => &[ActionType::Lock],
    };

    for needed in required {
        if !chain_has(*needed) {
            debug!(
                action = %msg.action,
                missing = %needed,
                "chain predecessor not present yet"
            );
            return Ok(SequenceCheck::AwaitingParent);
        }
    }

    Ok(SequenceCheck::Ready)
}
