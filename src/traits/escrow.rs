//! Escrow/transaction collaborator abstraction.
//!
//! Transaction construction and broadcast are opaque to this crate: the
//! collaborator hands back raw bytes and accepts them for broadcast. The
//! engine only threads the resulting txid into the protocol message so the
//! counterparty learns it atomically with the action itself.

use async_trait::async_trait;

use crate::error::TradeResult;
use crate::marketplace::ListingItem;

/// An opaque raw transaction produced by the escrow collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction(pub Vec<u8>);

/// Which settlement path a settlement transaction serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    /// Buyer completes the escrow after locking.
    Complete,
    /// Seller releases the escrowed funds to finish the trade.
    Release,
    /// Funds are returned to the buyer.
    Refund,
}

/// Abstraction over escrow transaction building and broadcast.
#[async_trait]
pub trait EscrowBroker: Send + Sync {
    /// Build the funding transaction that locks the buyer's funds into
    /// escrow for the given bid chain.
    async fn build_funding_tx(
        &self,
        listing: &ListingItem,
        bid_hash: &str,
    ) -> TradeResult<RawTransaction>;

    /// Build a settlement transaction moving the escrowed funds.
    async fn build_settlement_tx(
        &self,
        listing: &ListingItem,
        bid_hash: &str,
        kind: SettlementKind,
    ) -> TradeResult<RawTransaction>;

    /// Broadcast a raw transaction, returning its txid.
    async fn broadcast(&self, tx: RawTransaction) -> TradeResult<String>;
}
