//! Listing items: read-only catalog input to the trade engine.

use serde::{Deserialize, Serialize};

use crate::error::{TradeError, TradeResult};
use crate::hashing::{canonical_hash, Extensions, FieldSpec};
use crate::traits::TimeProvider;

/// Escrow scheme a listing settles under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowType {
    /// Plain multisig escrow between buyer and seller.
    Multisig,
    /// Mutual-assured-destruction deposit scheme: both parties overcommit
    /// and only a cooperative release returns the deposits.
    Mad,
}

impl EscrowType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Multisig => "MULTISIG",
            Self::Mad => "MAD",
        }
    }
}

/// Settlement currency for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Btc,
    Ltc,
}

impl Currency {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Ltc => "LTC",
        }
    }
}

/// Canonical field selection for a listing's identity hash. The hash
/// commits to who sells what, where, and under which escrow terms.
const LISTING_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("seller", "seller"),
    FieldSpec::new("market", "market"),
    FieldSpec::new("title", "title"),
    FieldSpec::new("price", "price"),
    FieldSpec::new("escrow_type", "escrow"),
    FieldSpec::new("currency", "currency"),
    FieldSpec::new("created_at", "created"),
];

/// A published listing item. Owned by the external catalog collaborator;
/// this engine only reads it to build and verify BID messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    /// Canonical hash of the listing, its marketplace-wide identity.
    pub hash: String,

    /// Seller address.
    pub seller: String,

    /// Market identifier the listing was published on.
    pub market: String,

    /// Title of the item.
    pub title: String,

    /// Asking price in atomic units of `currency`.
    pub price: u64,

    /// Escrow scheme bids on this listing must use.
    pub escrow_type: EscrowType,

    /// Settlement currency.
    pub currency: Currency,

    /// Unix timestamp in milliseconds when the listing was published.
    pub created_at: u64,
}

impl ListingItem {
    /// Seller-side constructor: builds the listing and seals its hash.
    pub fn new<C: TimeProvider>(
        seller: &str,
        market: &str,
        title: &str,
        price: u64,
        escrow_type: EscrowType,
        currency: Currency,
        time: &C,
    ) -> TradeResult<Self> {
        let mut listing = Self {
            hash: String::new(),
            seller: seller.to_string(),
            market: market.to_string(),
            title: title.to_string(),
            price,
            escrow_type,
            currency,
            created_at: time.now_millis(),
        };
        listing.hash = listing.canonical_hash()?;
        Ok(listing)
    }

    /// Recompute the canonical hash from the listing's own fields.
    pub fn canonical_hash(&self) -> TradeResult<String> {
        let object = serde_json::json!({
            "seller": self.seller,
            "market": self.market,
            "title": self.title,
            "price": self.price,
            "escrow_type": self.escrow_type.as_str(),
            "currency": self.currency.as_str(),
            "created_at": self.created_at,
        });
        canonical_hash(&object, LISTING_FIELDS, &Extensions::new())
    }

    /// Assert the stored hash still matches the listing's content.
    /// A mismatch means the listing was tampered with or is stale.
    pub fn verify_hash(&self) -> TradeResult<()> {
        let recomputed = self.canonical_hash()?;
        if recomputed != self.hash {
            return Err(TradeError::Tamper(format!(
                "listing hash mismatch for {}: recomputed {recomputed}",
                self.hash
            )));
        }
        Ok(())
    }
}
