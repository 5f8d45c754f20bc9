//! Mock escrow/transaction collaborator for testing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::error::{TradeError, TradeResult};
use crate::marketplace::ListingItem;
use crate::traits::{EscrowBroker, RawTransaction, SettlementKind};

/// Mock escrow broker producing deterministic raw transactions and txids.
#[derive(Debug, Clone, Default)]
pub struct MockEscrow {
    broadcasts: Arc<RwLock<Vec<String>>>,
    counter: Arc<AtomicU64>,
    fail: Arc<RwLock<bool>>,
}

impl MockEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether escrow operations should fail.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    /// Txids broadcast so far, in order.
    pub async fn broadcast_txids(&self) -> Vec<String> {
        self.broadcasts.read().await.clone()
    }

    pub async fn broadcast_count(&self) -> usize {
        self.broadcasts.read().await.len()
    }

    async fn guard(&self) -> TradeResult<()> {
        if *self.fail.read().await {
            return Err(TradeError::Escrow("simulated escrow failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EscrowBroker for MockEscrow {
    async fn build_funding_tx(
        &self,
        listing: &ListingItem,
        bid_hash: &str,
    ) -> TradeResult<RawTransaction> {
        self.guard().await?;
        Ok(RawTransaction(
            format!("funding:{}:{bid_hash}", listing.hash).into_bytes(),
        ))
    }

    async fn build_settlement_tx(
        &self,
        listing: &ListingItem,
        bid_hash: &str,
        kind: SettlementKind,
    ) -> TradeResult<RawTransaction> {
        self.guard().await?;
        Ok(RawTransaction(
            format!("settlement:{kind:?}:{}:{bid_hash}", listing.hash).into_bytes(),
        ))
    }

    async fn broadcast(&self, _tx: RawTransaction) -> TradeResult<String> {
        self.guard().await?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let txid = format!("txid-{n}");
        self.broadcasts.write().await.push(txid.clone());
        Ok(txid)
    }
}
