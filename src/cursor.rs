// this_file: src/cursor.rs

//! The JSON cursor: a read position into an existing tree, found by
//! descending interior nodes in key order.
//!
//! A cursor's embedded [`Scanner`] is always seeded to the correct
//! structural state for the leaf it currently sits on — its path context
//! at offset zero is recovered by decoding the key of whatever location
//! immediately precedes the leaf ([`JsonCursor`] is the one place inside
//! the crate that relies on that encoding being invertible).
//! [`JsonCursor::seed_interior_chunker`] is the other half of the splice
//! protocol: it hands back a chain of [`InteriorChunker`]s, one per
//! ancestor level, each pre-seeded with that level's unchanged
//! left-sibling entries.

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::interior::InteriorChunker;
use crate::node::{decode_interior, decode_leaf, peek_level};
use crate::path::{JsonPath, Location};
use crate::scanner::{ScanOutcome, Scanner};
use crate::store::{Address, NodeStore};

struct InteriorFrame {
    level: u32,
    entries: Vec<(Vec<u8>, Address)>,
    child_index: usize,
}

/// A cursor positioned on one leaf of an existing tree.
pub struct JsonCursor<'a, S: NodeStore> {
    store: &'a S,
    /// Root-first: `ancestors[0]` is the tree's root node, the last entry
    /// is the leaf's immediate parent.
    ancestors: Vec<InteriorFrame>,
    leaf_bytes: Bytes,
    scanner: Scanner,
    /// The scanner's state immediately before whatever separator, key, or
    /// container-open led up to `scanner`'s own position — identical to
    /// `scanner` for a [`JsonCursor::seek`] cursor or a
    /// [`JsonCursor::seek_value_start`] landing on a container's first
    /// child, but strictly earlier whenever reaching the target consumed
    /// a preceding comma or an object key and its colon. An insert-before
    /// must splice at this point, not at `scanner`'s: it synthesizes its
    /// own leading comma and needs the original one intact ahead of the
    /// sibling that follows, not already consumed into this prefix.
    pre_value_scanner: Scanner,
    /// The scanner's state after `pre_value_scanner`'s leading comma (if
    /// any) is consumed, but before an object member's key and colon —
    /// identical to `pre_value_scanner` for an array element (nothing
    /// sits between a comma and an array's next value) and to `scanner`
    /// for a container's first member (no comma to skip past). A delete
    /// of an object member must splice at this point: unlike insert, it
    /// keeps the existing separator (no new one is synthesized) but must
    /// still drop the member's own key and colon along with its value.
    pre_key_scanner: Scanner,
    valid: bool,
}

impl<'a, S: NodeStore> JsonCursor<'a, S> {
    /// Descend from `root` to the leaf whose key range covers `target`:
    /// the first leaf whose own end-key is `>= target.encode()`. Then
    /// drives the leaf's scanner forward to `target` itself, so the
    /// cursor is left positioned exactly at the splice point rather than
    /// merely somewhere inside the right leaf.
    pub fn seek(store: &'a S, root: Address, target: &Location) -> Result<Self> {
        let target_key = target.encode();
        let mut ancestors = Vec::new();
        let mut address = root;
        let mut preceding_key: Option<Vec<u8>> = None;

        loop {
            let blob = store.read(&address)?;
            if peek_level(&blob)? == 0 {
                let leaf_bytes = Bytes::from(decode_leaf(&blob)?);
                let mut scanner = seed_scanner(leaf_bytes.clone(), preceding_key.as_deref())?;
                advance_scanner_to(&mut scanner, &target_key)?;
                let pre_value_scanner = scanner.clone();
                let pre_key_scanner = scanner.clone();
                return Ok(JsonCursor {
                    store,
                    ancestors,
                    leaf_bytes,
                    scanner,
                    pre_value_scanner,
                    pre_key_scanner,
                    valid: true,
                });
            }
            let (level, entries) = decode_interior(&blob)?;
            let child_index = entries.partition_point(|(key, _)| key.as_slice() < target_key.as_slice());
            let child_index = child_index.min(entries.len().saturating_sub(1));
            preceding_key = if child_index > 0 { Some(entries[child_index - 1].0.clone()) } else { None };
            address = entries[child_index].1;
            ancestors.push(InteriorFrame { level, entries, child_index });
        }
    }

    /// Descend to the leaf containing `target_path`'s value and stop the
    /// cursor's scanner exactly *before* that value's first byte, rather
    /// than after it: a replace or delete needs this, not `seek`'s
    /// after-the-match position, to act on the value rather than append
    /// after it. Separators, keys, and colons leading up to the value are
    /// consumed; the value's own bytes are not.
    ///
    /// A plain [`JsonCursor::seek`] cannot express this: scanner stops
    /// only ever occur at value *completions*, so comparing stop
    /// locations against `target_path`'s own start marker would still
    /// land past the match, one value too late. This walks the leaf
    /// sibling by sibling instead using
    /// [`Scanner::advance_to_next_value_start`]: a value-start whose path
    /// is a strict prefix of `target_path` is a container on the way to
    /// the target, so its opening bracket alone is consumed via
    /// [`Scanner::open_container_for_descent`] (not skipped whole) to
    /// descend into it; any other non-matching value-start is skipped in
    /// full with [`Scanner::advance_to_next_location`].
    pub fn seek_value_start(store: &'a S, root: Address, target_path: &JsonPath) -> Result<Self> {
        let target_key = Location::end_of_value(target_path.clone()).encode();
        let mut ancestors = Vec::new();
        let mut address = root;
        let mut preceding_key: Option<Vec<u8>> = None;

        loop {
            let blob = store.read(&address)?;
            if peek_level(&blob)? == 0 {
                let leaf_bytes = Bytes::from(decode_leaf(&blob)?);
                let mut scanner = seed_scanner(leaf_bytes.clone(), preceding_key.as_deref())?;
                let mut pre_value_scanner;
                let mut pre_key_scanner;
                loop {
                    pre_value_scanner = scanner.clone();
                    scanner.consume_leading_comma_if_pending()?;
                    pre_key_scanner = scanner.clone();
                    if !scanner.advance_to_next_value_start()? {
                        return Err(Error::PreconditionViolation(
                            "seek_value_start: target path not found in its own leaf".to_string(),
                        ));
                    }
                    if scanner.current_path() == target_path {
                        break;
                    }
                    if is_strict_prefix(scanner.current_path(), target_path) {
                        scanner.open_container_for_descent()?;
                    } else {
                        scanner.advance_to_next_location()?;
                    }
                }
                return Ok(JsonCursor {
                    store,
                    ancestors,
                    leaf_bytes,
                    scanner,
                    pre_value_scanner,
                    pre_key_scanner,
                    valid: true,
                });
            }
            let (level, entries) = decode_interior(&blob)?;
            let child_index = entries.partition_point(|(key, _)| key.as_slice() < target_key.as_slice());
            let child_index = child_index.min(entries.len().saturating_sub(1));
            preceding_key = if child_index > 0 { Some(entries[child_index - 1].0.clone()) } else { None };
            address = entries[child_index].1;
            ancestors.push(InteriorFrame { level, entries, child_index });
        }
    }

    /// Advance the embedded scanner past the value it is currently
    /// sitting at the start of (as left by [`JsonCursor::seek_value_start`]),
    /// landing in the state right after it — a replace or delete's view
    /// of "everything past the mutated value".
    pub fn skip_current_value(&mut self) -> Result<()> {
        let start_depth = self.scanner.current_path().steps().len();
        loop {
            match self.scanner.advance_to_next_location()? {
                ScanOutcome::EndOfInput => {
                    return Err(Error::PreconditionViolation(
                        "skip_current_value ran out of leaf bytes before the value closed".to_string(),
                    ))
                }
                ScanOutcome::Stop { .. } => {
                    if self.scanner.current_path().steps().len() <= start_depth {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// The raw bytes of the leaf this cursor currently sits on.
    pub fn current_value(&self) -> &[u8] {
        &self.leaf_bytes
    }

    /// `true` iff this cursor still refers to a live leaf.
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// The embedded scanner, seeded to this leaf's structural context;
    /// its `offset()` marks the splice point once the caller has driven
    /// it forward.
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Mutable access to the embedded scanner, so a splicing chunker can
    /// drive it forward to the exact mutation point.
    pub fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    /// Rewind this cursor's working scanner to the state just before the
    /// comma/key/container-open leading up to its own position — see the
    /// field doc on `pre_value_scanner`. An insert-before needs every
    /// later read of `scanner()`/`current_value()`, not just the
    /// chunker's own seeded buffer, to see the target's separator and key
    /// again, since nothing is being removed in that case: it synthesizes
    /// its own separator ahead of the new content and leaves the existing
    /// one as the boundary after it.
    pub(crate) fn rewind_to_insertion_point(&mut self) {
        self.scanner = self.pre_value_scanner.clone();
    }

    /// A copy of the scanner state just after the target's leading comma
    /// (if any) but before its key — see the field doc on
    /// `pre_key_scanner`. Used to seed a deleting chunker's own buffer so
    /// it keeps the existing separator but never contains the deleted
    /// member's key bytes.
    pub(crate) fn deletion_prefix_scanner(&self) -> Scanner {
        self.pre_key_scanner.clone()
    }

    /// Step to the next leaf in key order. Returns `false` (and marks the
    /// cursor invalid) if there is no next leaf.
    pub fn advance(&mut self) -> Result<bool> {
        loop {
            let Some(frame) = self.ancestors.last_mut() else {
                self.valid = false;
                return Ok(false);
            };
            if frame.child_index + 1 < frame.entries.len() {
                frame.child_index += 1;
                let preceding_key = frame.entries[frame.child_index - 1].0.clone();
                let mut address = frame.entries[frame.child_index].1;
                loop {
                    let blob = self.store.read(&address)?;
                    if peek_level(&blob)? == 0 {
                        self.leaf_bytes = Bytes::from(decode_leaf(&blob)?);
                        self.scanner = seed_scanner(self.leaf_bytes.clone(), Some(&preceding_key))?;
                        self.pre_value_scanner = self.scanner.clone();
                        self.pre_key_scanner = self.scanner.clone();
                        return Ok(true);
                    }
                    let (level, entries) = decode_interior(&blob)?;
                    address = entries[0].1;
                    self.ancestors.push(InteriorFrame { level, entries, child_index: 0 });
                }
            }
            self.ancestors.pop();
        }
    }

    /// Build the chain of [`InteriorChunker`]s a splicing
    /// [`crate::chunker::JsonChunker`] resumes from: one per ancestor
    /// level, root-most first, each pre-loaded with that level's
    /// left-sibling `(key, address)` entries. Returns the innermost
    /// (level 1) chunker, the one a chunker appends
    /// new leaf entries to directly. Does not consume the cursor: the
    /// splice still needs to read forward through it afterward.
    pub fn seed_interior_chunker(&self, config: &'a crate::config::ChunkConfig) -> InteriorChunker<'a, S> {
        let mut built: Option<InteriorChunker<'a, S>> = None;
        for frame in &self.ancestors {
            let pending = frame.entries[..frame.child_index].to_vec();
            built = Some(InteriorChunker::from_pending_with_parent(
                frame.level,
                config,
                self.store,
                pending,
                built.map(Box::new),
            ));
        }
        built.unwrap_or_else(|| InteriorChunker::from_pending(1, config, self.store, Vec::new()))
    }

    /// Graft every entry from the cursor's current position to the
    /// document's end directly into `interior`, one `add_pair` per
    /// untouched sibling subtree at its own level — never re-reading a
    /// grafted subtree's own leaf content, since splice
    /// re-synchronization guarantees it is byte-identical to the
    /// original. Consumes the cursor: nothing is read from it afterward.
    pub fn graft_remainder(self, interior: &mut InteriorChunker<'a, S>) -> Result<()> {
        let mut inherited_from_below = false;
        for frame in self.ancestors.into_iter().rev() {
            let start = if inherited_from_below { frame.child_index + 1 } else { frame.child_index };
            for (key, address) in &frame.entries[start..] {
                interior.add_pair_at_level(frame.level, key.clone(), *address)?;
            }
            inherited_from_below = true;
        }
        Ok(())
    }
}

/// Drive `scanner` forward through its leaf until it reports a stop at
/// or past `target_key`, or exhausts the leaf. Leaves the scanner's
/// offset exactly past the matched location, ready for a splice.
fn advance_scanner_to(scanner: &mut Scanner, target_key: &[u8]) -> Result<()> {
    loop {
        match scanner.advance_to_next_location()? {
            ScanOutcome::EndOfInput => return Ok(()),
            ScanOutcome::Stop { location, .. } => {
                if location.encode().as_slice() >= target_key {
                    return Ok(());
                }
            }
        }
    }
}

/// `true` iff `path` names a proper ancestor container of `target` —
/// strictly shorter, and every step it has matches `target`'s
/// corresponding step. Used by [`JsonCursor::seek_value_start`] to tell
/// "this value-start is a container on the way to the target, descend
/// into it" apart from "this is an unrelated sibling, skip it whole".
fn is_strict_prefix(path: &JsonPath, target: &JsonPath) -> bool {
    let path_steps = path.steps();
    let target_steps = target.steps();
    path_steps.len() < target_steps.len() && path_steps == &target_steps[..path_steps.len()]
}

fn seed_scanner(leaf_bytes: Bytes, preceding_key: Option<&[u8]>) -> Result<Scanner> {
    match preceding_key {
        None => Ok(Scanner::from_beginning(leaf_bytes)),
        Some(key) => {
            let previous = Location::decode(key)
                .map_err(|message| Error::Store(format!("corrupt interior key: {message}")))?;
            Ok(Scanner::from_middle(leaf_bytes, previous.path().clone()))
        }
    }
}
