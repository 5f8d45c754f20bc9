//! Bounded pool of messages waiting for a causal predecessor.
//!
//! A message whose parent has not arrived is parked here and replayed
//! after a delay, up to a maximum attempt count. Exhaustion surfaces as a
//! permanent processing failure; nothing is silently dropped short of the
//! pool cap, and cap evictions are logged loudly.

use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::{WAITING_POOL_CAP, WAITING_RETRY_DELAY_MS};
use crate::traits::InboundDelivery;

/// One parked delivery.
#[derive(Debug, Clone)]
pub struct WaitingEntry {
    pub delivery: InboundDelivery,
    /// Processing attempts so far, including the one that parked it.
    pub attempts: u32,
    /// Epoch millis when the entry becomes due for replay.
    pub due_at: u64,
}

/// FIFO pool of premature deliveries.
#[derive(Default)]
pub struct WaitingPool {
    entries: Mutex<VecDeque<WaitingEntry>>,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a delivery for later replay.
    pub async fn park(&self, delivery: InboundDelivery, attempts: u32, now: u64) {
        let mut entries = self.entries.lock().await;
        if entries.len() >= WAITING_POOL_CAP {
            if let Some(evicted) = entries.pop_front() {
                warn!(
                    msgid = evicted.delivery.msgid,
                    "waiting pool full, evicting oldest entry"
                );
            }
        }
        entries.push_back(WaitingEntry {
            delivery,
            attempts,
            due_at: now + WAITING_RETRY_DELAY_MS,
        });
    }

    /// Remove and return all entries due at `now`.
    pub async fn take_due(&self, now: u64) -> Vec<WaitingEntry> {
        let mut entries = self.entries.lock().await;
        let mut due = Vec::new();
        let mut keep = VecDeque::with_capacity(entries.len());
        while let Some(entry) = entries.pop_front() {
            if entry.due_at <= now {
                due.push(entry);
            } else {
                keep.push_back(entry);
            }
        }
        *entries = keep;
        due
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
