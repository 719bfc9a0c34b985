// this_file: src/value.rs

//! The JSON value wrapper external collaborator.
//!
//! The chunker never inspects a value's semantic shape directly — it only
//! needs canonical bytes to scan. [`CanonicalJson`] is that seam;
//! [`serde_json::Value`] is given the crate's reference implementation.

use serde::Serialize;

use crate::error::{Error, Result};

/// A value that can be marshalled to canonical JSON bytes: no
/// insignificant whitespace, canonical (sorted) key ordering.
pub trait CanonicalJson {
    /// Produce this value's canonical byte serialization.
    fn to_canonical_bytes(&self) -> Result<Vec<u8>>;
}

impl CanonicalJson for serde_json::Value {
    fn to_canonical_bytes(&self) -> Result<Vec<u8>> {
        // serde_json::Map is BTreeMap-backed unless the `preserve_order`
        // feature is enabled (it is not, for this crate), so `to_vec`
        // already emits object keys in sorted order with no extra
        // whitespace.
        serde_json::to_vec(self).map_err(|e| Error::Parse { offset: 0, message: e.to_string() })
    }
}

/// Marshal any `Serialize` value through `serde_json::Value` first, so
/// canonical key ordering applies uniformly regardless of the source
/// type's own field order.
pub fn marshal_canonical<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let as_value = serde_json::to_value(value)
        .map_err(|e| Error::Parse { offset: 0, message: e.to_string() })?;
    as_value.to_canonical_bytes()
}
