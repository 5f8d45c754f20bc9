//! Wallet collaborator abstraction.

use async_trait::async_trait;

use crate::error::TradeResult;

/// Abstraction over the local wallet's output reservations.
///
/// Placing a bid reserves funding outputs for the eventual escrow lock.
/// Cancelling or rejecting the bid must release that reservation in the
/// same logical operation as the status transition, so the reservation is
/// never leaked.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Release any outputs reserved for the given bid chain.
    ///
    /// Must be idempotent: releasing an already-released (or never
    /// reserved) bid is a no-op.
    async fn release_reserved_outputs(&self, bid_hash: &str) -> TradeResult<()>;
}
