//! The protocol engine: persistent state arena, action service, inbound
//! dispatcher and the waiting pool for premature messages.

pub mod dispatcher;
pub mod service;
pub mod store;
pub mod waiting;

pub use dispatcher::{InboundDispatcher, ProcessingStatus};
pub use service::{ActionRequest, ProcessOutcome, TradeService, TransportMeta};
pub use store::{MarketStore, OrderMutation};
pub use waiting::WaitingPool;
