// this_file: src/store.rs

//! The node store external collaborator.
//!
//! This crate treats the node store as a generic, shared, append-only
//! blob writer that returns a fixed-width content address. Only its
//! interface is specified here — [`NodeStore`] — plus [`MemoryNodeStore`],
//! a reference in-memory implementation used by this crate's own tests
//! and as a starting point for embedders.

use std::fmt;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// A fixed-width content address: the identity of a node once written.
///
/// The crate does not mandate a specific hash function for addressing —
/// callers may use any content digest wide enough to make collisions
/// practically impossible, typically a cryptographic digest. This newtype
/// wraps 32 bytes, matching common 256-bit digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap a 32-byte digest as an address.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    /// The raw bytes of this address.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// An allocator handle used by node serializers. Out of scope for this
/// crate's own encode/decode routines (which allocate directly), kept as
/// a marker type so embedders swapping in a pooled allocator have a
/// documented seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pool;

/// The generic node store: writes opaque byte blobs and returns their
/// content address; reads them back by address.
///
/// Safe to call from multiple writers provided each targets distinct
/// content; within one chunker's write, calls are sequential.
pub trait NodeStore {
    /// Write an opaque node blob, returning its content address.
    fn write(&self, node: &[u8]) -> Result<Address>;

    /// Read back a previously written node blob by address.
    fn read(&self, address: &Address) -> Result<Vec<u8>>;

    /// An allocator handle for serializers to use.
    fn pool(&self) -> Pool {
        Pool
    }
}

/// An in-memory [`NodeStore`], addressing nodes by an xxh3-based digest of
/// their bytes. Suitable for tests and as a starting point for an
/// embedder's own persistent store.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeStore {
    nodes: Arc<Mutex<FxHashMap<Address, Vec<u8>>>>,
}

impl MemoryNodeStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct nodes currently held.
    pub fn len(&self) -> usize {
        self.nodes.lock().expect("node store mutex poisoned").len()
    }

    /// `true` if no nodes have been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn digest(bytes: &[u8]) -> Address {
    use xxhash_rust::xxh32::xxh32;
    // Fold two differently-salted xxh32 digests into a 32-byte address so
    // that Address stays a fixed 256-bit width regardless of the hash
    // primitive used internally.
    let mut out = [0u8; 32];
    for (i, chunk) in out.chunks_mut(4).enumerate() {
        let h = xxh32(bytes, i as u32 ^ 0xcafe_babe);
        chunk.copy_from_slice(&h.to_be_bytes());
    }
    Address(out)
}

impl NodeStore for MemoryNodeStore {
    fn write(&self, node: &[u8]) -> Result<Address> {
        let address = digest(node);
        self.nodes
            .lock()
            .map_err(|_| Error::Store("node store mutex poisoned".to_string()))?
            .insert(address, node.to_vec());
        Ok(address)
    }

    fn read(&self, address: &Address) -> Result<Vec<u8>> {
        self.nodes
            .lock()
            .map_err(|_| Error::Store("node store mutex poisoned".to_string()))?
            .get(address)
            .cloned()
            .ok_or_else(|| Error::CursorInvalidation { address: address.to_string() })
    }
}
