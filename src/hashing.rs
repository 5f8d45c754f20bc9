//! Canonical hashing over a configured subset of a message's fields.
//!
//! The canonical hash is the sole identity and integrity mechanism in the
//! protocol: the sender seals a message by hashing a configured, ordered
//! field selection, and the receiver recomputes the same selection to detect
//! tampering. Two logically equal inputs must produce an identical digest
//! regardless of property insertion order, so the canonical form sorts all
//! nested object keys and fixes the top-level field order by configuration.

use std::collections::BTreeMap;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{TradeError, TradeResult};

/// One entry of a hash field configuration: where to read the value from
/// (a dotted path on the source object) and the canonical name it is
/// published under in the hashed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Dotted path resolved against the source object.
    pub source: &'static str,
    /// Canonical field name in the hashed object.
    pub rename: &'static str,
}

impl FieldSpec {
    pub const fn new(source: &'static str, rename: &'static str) -> Self {
        Self { source, rename }
    }
}

/// Call-time extension values keyed by canonical field name.
///
/// Extensions carry computed values that are not present on the source
/// object itself, e.g. a referenced listing's escrow configuration when
/// hashing a BID. An extension always wins over a resolved source path.
pub type Extensions = BTreeMap<String, Value>;

/// Compute the canonical hash of `object` under the given field config.
///
/// The input is deep-copied before resolution so mutation during path
/// walking is impossible. Missing paths canonicalize to `null`, which keeps
/// the digest well-defined for optional fields.
pub fn canonical_hash(
    object: &Value,
    fields: &[FieldSpec],
    extensions: &Extensions,
) -> TradeResult<String> {
    let snapshot = object.clone();

    let mut canonical: Vec<(&'static str, Value)> = Vec::with_capacity(fields.len());
    for spec in fields {
        let value = match extensions.get(spec.rename) {
            Some(ext) => ext.clone(),
            None => resolve_path(&snapshot, spec.source).unwrap_or(Value::Null),
        };
        canonical.push((spec.rename, value));
    }

    let mut buf = String::new();
    buf.push('{');
    for (i, (name, value)) in canonical.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        write_string(&mut buf, name)?;
        buf.push(':');
        write_canonical(&mut buf, value)?;
    }
    buf.push('}');

    let digest = Sha256::digest(buf.as_bytes());
    Ok(hex::encode(digest))
}

/// Resolve a dotted path (`objects.0.value` style segments are not
/// supported; paths address named fields only) against a JSON value.
fn resolve_path(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// Serialize a value deterministically: object keys sorted, arrays in
/// order, scalars through serde_json's stable formatting.
fn write_canonical(out: &mut String, value: &Value) -> TradeResult<()> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key)?;
                out.push(':');
                write_canonical(out, &map[key.as_str()])?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item)?;
            }
            out.push(']');
        }
        scalar => {
            let rendered = serde_json::to_string(scalar).map_err(|e| {
                TradeError::Serialization(format!("canonical scalar encoding failed: {e}"))
            })?;
            out.push_str(&rendered);
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> TradeResult<()> {
    let rendered = serde_json::to_string(s)
        .map_err(|e| TradeError::Serialization(format!("canonical key encoding failed: {e}")))?;
    out.push_str(&rendered);
    Ok(())
}

/// Derive the Order identifier both parties must agree on without
/// coordination: a canonical hash over buyer, seller and the generation
/// timestamp of the opening BID.
pub fn order_hash(buyer: &str, seller: &str, generated_millis: u64) -> TradeResult<String> {
    const ORDER_FIELDS: &[FieldSpec] = &[
        FieldSpec::new("buyer", "buyer"),
        FieldSpec::new("seller", "seller"),
        FieldSpec::new("generated", "generated"),
    ];
    let object = serde_json::json!({
        "buyer": buyer,
        "seller": seller,
        "generated": generated_millis,
    });
    canonical_hash(&object, ORDER_FIELDS, &Extensions::new())
}
