//! The action-message protocol: model, factories, validators.

pub mod factory;
pub mod message;
pub mod validate;

pub use factory::MessageFactory;
pub use message::{
    bid_extensions, hash_message, objects, ActionMessage, ActionType, KeyValue, ProtocolEnvelope,
};
pub use validate::{validate_message, validate_sequence, verify_hash, SequenceCheck};
