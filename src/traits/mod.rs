//! Trait abstractions for external collaborators.
//!
//! The transport, escrow, wallet and notification collaborators are
//! stateless services from this crate's perspective; abstracting them as
//! traits enables unit testing of the protocol engine without a real
//! messaging network or wallet daemon.

pub mod escrow;
pub mod notify;
pub mod time;
pub mod transport;
pub mod wallet;

// Re-export all traits for crate-internal use.
// The public API surface is controlled by lib.rs re-exports.
pub use escrow::{EscrowBroker, RawTransaction, SettlementKind};
pub use notify::{NotificationSink, TradeNotification};
pub use time::TimeProvider;
pub use transport::{DeliveryReceipt, Direction, InboundDelivery, MessageTransport};
pub use wallet::Wallet;

// Re-export default implementations
pub use time::SystemClock;
