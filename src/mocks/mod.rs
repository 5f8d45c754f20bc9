//! Mock implementations for testing.
//!
//! This module provides mock implementations of the collaborator traits
//! that allow unit testing the protocol engine without a real messaging
//! network, wallet daemon or notification bus.

pub mod escrow;
pub mod notify;
pub mod time;
pub mod transport;
pub mod wallet;

pub use escrow::MockEscrow;
pub use notify::MockNotifier;
pub use time::MockClock;
pub use transport::{MockTransport, SentMessage};
pub use wallet::MockWallet;
