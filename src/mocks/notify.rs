//! Mock notification sink for testing.

use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::error::TradeResult;
use crate::traits::{NotificationSink, TradeNotification};

/// Mock sink that records every emitted event.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    events: Arc<RwLock<Vec<(String, TradeNotification)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(event, payload)` pairs emitted so far.
    pub async fn events(&self) -> Vec<(String, TradeNotification)> {
        self.events.read().await.clone()
    }

    /// Event names only, in emission order.
    pub async fn event_names(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MockNotifier {
    async fn emit(&self, event: &str, payload: TradeNotification) -> TradeResult<()> {
        self.events
            .write()
            .await
            .push((event.to_string(), payload));
        Ok(())
    }
}
