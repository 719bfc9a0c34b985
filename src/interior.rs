// this_file: src/interior.rs

//! The interior chunker adapter: a generic prolly chunker over
//! `(key, address)` pairs, using the address-map node serializer from
//! [`crate::node`] and the same boundary predicate as leaves, with a
//! higher per-level salt and larger size bounds.
//!
//! Receives pairs in strictly increasing key order (enforced by the
//! caller, [`crate::chunker::JsonChunker`]) and promotes upward — each
//! level's own cuts become `(key, address)` pairs fed to the next level —
//! until [`InteriorChunker::done`] finalizes a single root node.

use crate::boundary::should_cut;
use crate::config::ChunkConfig;
use crate::error::Result;
use crate::node::encode_interior;
use crate::store::{Address, NodeStore};

/// One level of the interior chunker chain. Level `1` receives pairs
/// directly from leaves (level 0); level `n` receives pairs from level
/// `n - 1`'s own cuts.
pub struct InteriorChunker<'a, S: NodeStore> {
    level: u32,
    config: &'a ChunkConfig,
    store: &'a S,
    pending: Vec<(Vec<u8>, Address)>,
    accumulated_len: usize,
    parent: Option<Box<InteriorChunker<'a, S>>>,
}

impl<'a, S: NodeStore> InteriorChunker<'a, S> {
    /// A fresh level-1 interior chunker with no parent yet (one is
    /// created lazily the first time this level itself cuts).
    pub fn new(config: &'a ChunkConfig, store: &'a S) -> Self {
        InteriorChunker { level: 1, config, store, pending: Vec::new(), accumulated_len: 0, parent: None }
    }

    /// Seed an interior chunker so that its `pending` entries are the
    /// left-siblings already written by a previous writer — used when a
    /// splice inherits unchanged left-siblings from the original tree's
    /// parent interior node.
    pub fn from_pending(
        level: u32,
        config: &'a ChunkConfig,
        store: &'a S,
        pending: Vec<(Vec<u8>, Address)>,
    ) -> Self {
        Self::from_pending_with_parent(level, config, store, pending, None)
    }

    /// As [`InteriorChunker::from_pending`], but wiring a pre-built parent
    /// level directly — used by [`crate::cursor::JsonCursor`] to seed an
    /// entire chain of ancestor levels at once, one per tree level between
    /// the splice leaf and the root.
    pub fn from_pending_with_parent(
        level: u32,
        config: &'a ChunkConfig,
        store: &'a S,
        pending: Vec<(Vec<u8>, Address)>,
        parent: Option<Box<InteriorChunker<'a, S>>>,
    ) -> Self {
        let accumulated_len = pending.iter().map(entry_len).sum();
        InteriorChunker { level, config, store, pending, accumulated_len, parent }
    }

    /// The tree level this chunker builds nodes for.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Append a `(key, address)` pair. `key` must strictly increase over
    /// every previous key appended to this chunker; this is enforced by
    /// the caller, not re-checked here.
    pub fn add_pair(&mut self, key: Vec<u8>, address: Address) -> Result<()> {
        self.accumulated_len += entry_len(&(key.clone(), address));
        self.pending.push((key.clone(), address));
        if should_cut(self.config, self.level as usize, &key, self.accumulated_len) {
            self.flush_to_parent()?;
        }
        Ok(())
    }

    /// Append a `(key, address)` pair known to belong at `level`, walking
    /// up the parent chain (creating levels as needed) until it lands at
    /// the right one — used to graft an unchanged subtree of a prior
    /// tree back in after a splice re-synchronizes, without re-reading
    /// any of that subtree's own content.
    pub fn add_pair_at_level(&mut self, level: u32, key: Vec<u8>, address: Address) -> Result<()> {
        use std::cmp::Ordering;
        match level.cmp(&self.level) {
            Ordering::Equal => self.add_pair(key, address),
            Ordering::Greater => self.parent_mut().add_pair_at_level(level, key, address),
            Ordering::Less => Err(crate::error::Error::PreconditionViolation(format!(
                "cannot graft a level-{level} entry below chunker level {}",
                self.level
            ))),
        }
    }

    fn flush_to_parent(&mut self) -> Result<()> {
        let entries = std::mem::take(&mut self.pending);
        self.accumulated_len = 0;
        let last_key = entries
            .last()
            .expect("flush_to_parent called with no pending entries")
            .0
            .clone();
        let blob = encode_interior(self.level, &entries)?;
        let address = self.store.write(&blob)?;
        self.parent_mut().add_pair(last_key, address)
    }

    fn parent_mut(&mut self) -> &mut InteriorChunker<'a, S> {
        if self.parent.is_none() {
            self.parent = Some(Box::new(InteriorChunker::new(self.config, self.store)));
            self.parent.as_mut().unwrap().level = self.level + 1;
        }
        self.parent.as_mut().unwrap()
    }

    /// Finalize the tree: whatever remains pending at this level becomes
    /// its final node, forwarded to the parent level (creating it if this
    /// is the first entry the parent has ever seen) until a single root
    /// node remains.
    pub fn done(mut self) -> Result<Address> {
        if self.pending.is_empty() {
            return match self.parent {
                Some(parent) => parent.done(),
                None => Err(crate::error::Error::PreconditionViolation(
                    "interior chunker finalized with no entries at any level".to_string(),
                )),
            };
        }
        let entries = std::mem::take(&mut self.pending);
        let last_key = entries[entries.len() - 1].0.clone();
        let blob = encode_interior(self.level, &entries)?;
        let address = self.store.write(&blob)?;
        match self.parent {
            None => Ok(address),
            Some(mut parent) => {
                parent.add_pair(last_key, address)?;
                parent.done()
            }
        }
    }
}

fn entry_len(entry: &(Vec<u8>, Address)) -> usize {
    4 + entry.0.len() + 32
}
