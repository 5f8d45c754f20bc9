//! Action message model: the tagged union of protocol actions plus the
//! versioned wire envelope.

use serde::{Deserialize, Serialize};

use crate::config::PROTOCOL_VERSION;
use crate::error::{TradeError, TradeResult};
use crate::hashing::{canonical_hash, Extensions, FieldSpec};
use crate::marketplace::ListingItem;
use crate::util::{bincode_deserialize_limited, bincode_serialize_limited};

/// Well-known keys for the auxiliary `objects` list.
pub mod objects {
    pub const ORDER_HASH: &str = "orderHash";
    pub const LISTING_ITEM_HASH: &str = "listingItemHash";
    pub const SHIPPING_ADDRESS: &str = "shippingAddress";
    pub const TXID: &str = "txid";
    pub const REASON: &str = "reason";
    pub const TRACKING: &str = "tracking";
}

/// One step of the negotiation/escrow chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionType {
    Bid,
    Accept,
    Reject,
    Cancel,
    Lock,
    Complete,
    Refund,
    Ship,
    Release,
}

/// Canonical field selection for the root BID. On top of the message's own
/// fields it folds in the shipping address and the listing's escrow and
/// currency configuration (supplied as call-time extensions), so the hash
/// commits to what is being purchased and how, not only who is bidding.
const BID_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("type", "type"),
    FieldSpec::new("generated", "generated"),
    FieldSpec::new("objects", "objects"),
    FieldSpec::new("shipping", "shipping"),
    FieldSpec::new("escrow", "escrow"),
    FieldSpec::new("currency", "currency"),
];

/// Canonical field selection for chain replies that are sealed complete:
/// the full message including its auxiliary objects.
const REPLY_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("type", "type"),
    FieldSpec::new("generated", "generated"),
    FieldSpec::new("bid", "parent"),
    FieldSpec::new("objects", "objects"),
];

/// Canonical field selection for escrow settlement steps. `objects` is
/// excluded because the settlement txid is appended after the hash is
/// sealed, atomically with the send.
const SETTLEMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("type", "type"),
    FieldSpec::new("generated", "generated"),
    FieldSpec::new("bid", "parent"),
];

impl ActionType {
    /// Wire name, also used as the notification event name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bid => "BID",
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
            Self::Cancel => "CANCEL",
            Self::Lock => "LOCK",
            Self::Complete => "COMPLETE",
            Self::Refund => "REFUND",
            Self::Ship => "SHIP",
            Self::Release => "RELEASE",
        }
    }

    /// Whether messages of this type must reference a parent message.
    pub const fn requires_parent(&self) -> bool {
        !matches!(self, Self::Bid)
    }

    /// The ordered field selection the canonical hash covers for this type.
    pub const fn field_config(&self) -> &'static [FieldSpec] {
        match self {
            Self::Bid => BID_FIELDS,
            Self::Accept | Self::Reject | Self::Cancel | Self::Ship => REPLY_FIELDS,
            Self::Lock | Self::Complete | Self::Refund | Self::Release => SETTLEMENT_FIELDS,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionType {
    type Err = TradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BID" => Ok(Self::Bid),
            "ACCEPT" => Ok(Self::Accept),
            "REJECT" => Ok(Self::Reject),
            "CANCEL" => Ok(Self::Cancel),
            "LOCK" => Ok(Self::Lock),
            "COMPLETE" => Ok(Self::Complete),
            "REFUND" => Ok(Self::Refund),
            "SHIP" => Ok(Self::Ship),
            "RELEASE" => Ok(Self::Release),
            other => Err(TradeError::Validation(format!(
                "unknown action type: {other}"
            ))),
        }
    }
}

/// One auxiliary key/value pair carried on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }
}

/// One action message of the trade protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    /// Action discriminator.
    #[serde(rename = "type")]
    pub action: ActionType,

    /// Sender-side generation timestamp, epoch millis.
    pub generated: u64,

    /// Canonical hash over this type's field selection; sealed last.
    pub hash: String,

    /// Hash of the message being replied to; absent only for the root BID.
    pub bid: Option<String>,

    /// Ordered auxiliary key/value data.
    pub objects: Vec<KeyValue>,
}

impl ActionMessage {
    /// Look up an auxiliary value by key (first match wins).
    pub fn object_value(&self, key: &str) -> Option<&str> {
        self.objects
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }

    /// Insert or replace an auxiliary value.
    pub fn set_object(&mut self, key: &str, value: impl Into<String>) {
        match self.objects.iter_mut().find(|kv| kv.key == key) {
            Some(kv) => kv.value = value.into(),
            None => self.objects.push(KeyValue::new(key, value)),
        }
    }
}

/// Compute the canonical hash of a message under its type's field config.
/// The `hash` field is never part of any config, so sealing is stable.
pub fn hash_message(msg: &ActionMessage, extensions: &Extensions) -> TradeResult<String> {
    let value = serde_json::to_value(msg)
        .map_err(|e| TradeError::Serialization(format!("message to canonical form: {e}")))?;
    canonical_hash(&value, msg.action.field_config(), extensions)
}

/// Extension values folded into a BID hash: the buyer's shipping address
/// and the escrow/currency terms read from the listing being bid on.
pub fn bid_extensions(listing: &ListingItem, shipping_address: &str) -> Extensions {
    let mut ext = Extensions::new();
    ext.insert(
        "shipping".to_string(),
        serde_json::Value::String(shipping_address.to_string()),
    );
    ext.insert(
        "escrow".to_string(),
        serde_json::Value::String(listing.escrow_type.as_str().to_string()),
    );
    ext.insert(
        "currency".to_string(),
        serde_json::Value::String(listing.currency.as_str().to_string()),
    );
    ext
}

/// Versioned wire envelope around an action message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolEnvelope {
    pub version: u32,
    pub action: ActionMessage,
}

impl ProtocolEnvelope {
    pub fn new(action: ActionMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            action,
        }
    }

    /// Serialize for transmission.
    pub fn to_bytes(&self) -> TradeResult<Vec<u8>> {
        bincode_serialize_limited(self)
    }

    /// Deserialize and check the protocol version.
    pub fn from_bytes(data: &[u8]) -> TradeResult<Self> {
        let envelope: Self = bincode_deserialize_limited(data)?;
        if envelope.version != PROTOCOL_VERSION {
            return Err(TradeError::Validation(format!(
                "unsupported protocol version {} (expected {PROTOCOL_VERSION})",
                envelope.version
            )));
        }
        Ok(envelope)
    }
}
