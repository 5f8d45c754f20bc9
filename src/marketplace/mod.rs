//! Marketplace domain records: listings, bid chains, orders.

pub mod bid;
pub mod listing;
pub mod order;

pub use bid::Bid;
pub use listing::{Currency, EscrowType, ListingItem};
pub use order::{transition_for, Order, OrderItem, OrderItemStatus, OrderStatus};
