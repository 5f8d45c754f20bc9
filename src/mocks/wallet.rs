//! Mock wallet collaborator for testing.

use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::error::TradeResult;
use crate::traits::Wallet;

/// Mock wallet that records reservation releases.
#[derive(Debug, Clone, Default)]
pub struct MockWallet {
    released: Arc<RwLock<Vec<String>>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bid hashes whose reserved outputs were released, in order.
    pub async fn released_outputs(&self) -> Vec<String> {
        self.released.read().await.clone()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn release_reserved_outputs(&self, bid_hash: &str) -> TradeResult<()> {
        self.released.write().await.push(bid_hash.to_string());
        Ok(())
    }
}
