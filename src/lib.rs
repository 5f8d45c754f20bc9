//! `bazaar`: the action-message trade protocol engine of a decentralized
//! marketplace.
//!
//! Two parties negotiate and settle an escrowed purchase by exchanging a
//! chain of hashed action messages (BID, ACCEPT, REJECT, CANCEL, LOCK,
//! COMPLETE, SHIP, RELEASE, REFUND) over an asynchronous store-and-forward
//! transport. Delivery order is not guaranteed and duplicates are possible;
//! both peers still converge on identical, tamper-evident state because
//! every message references its predecessor's canonical hash and every
//! status transition is guarded by an exact precondition check.

pub mod config;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod marketplace;
pub mod protocol;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use config::EngineConfig;
pub use engine::dispatcher::{InboundDispatcher, ProcessingStatus};
pub use engine::service::{ActionRequest, ProcessOutcome, TradeService, TransportMeta};
pub use engine::store::MarketStore;
pub use error::{TradeError, TradeResult};
pub use marketplace::{
    Bid, Currency, EscrowType, ListingItem, Order, OrderItem, OrderItemStatus, OrderStatus,
};
pub use protocol::{
    ActionMessage, ActionType, KeyValue, MessageFactory, ProtocolEnvelope, SequenceCheck,
};
pub use traits::{
    DeliveryReceipt, Direction, EscrowBroker, InboundDelivery, MessageTransport, NotificationSink,
    RawTransaction, SettlementKind, SystemClock, TimeProvider, TradeNotification, Wallet,
};
