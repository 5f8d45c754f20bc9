//! Configuration constants for the trade protocol engine.
//!
//! This module centralizes magic numbers and configuration values
//! to improve maintainability and enable easier tuning.

/// Protocol version carried in every message envelope. Peers running a
/// different version reject the envelope at decode time.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default message retention period in days, passed to the transport on send.
/// Overridable via [`EngineConfig::retention_days`].
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Maximum size in bytes for a serialized protocol envelope.
pub const MAX_ENVELOPE_SIZE: usize = 64 * 1024;

/// Maximum size in bytes for a stored record snapshot (CBOR).
pub const MAX_RECORD_SIZE: usize = 32 * 1024;

/// Maximum attempts for a message parked in the waiting pool before it is
/// reported as a permanent processing failure. Tuned generously so an
/// operator-triggered resend of a predecessor can still unblock the chain.
pub const WAITING_MAX_ATTEMPTS: u32 = 10;

/// Delay in milliseconds between waiting-pool replay rounds.
pub const WAITING_RETRY_DELAY_MS: u64 = 500;

/// Max entries in the waiting pool before oldest entries are evicted.
pub const WAITING_POOL_CAP: usize = 256;

/// Runtime configuration for a trade engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Message retention period in days, forwarded to the transport.
    pub retention_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Return the current Unix timestamp in milliseconds.
///
/// Convenience wrapper for production code paths. For testable code,
/// prefer accepting a `TimeProvider` parameter instead.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
