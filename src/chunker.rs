// this_file: src/chunker.rs

//! The JSON chunker: the writer. Owns an append buffer (inside its
//! [`Scanner`]) and a level-1 [`InteriorChunker`]; consumes bytes, emits
//! leaf blobs at predicate-chosen boundaries, and forwards
//! `(boundary-key, leaf-address)` pairs upward.
//!
//! Construction paths mirror the two ways a tree gets written: `new` for
//! a full rewrite (empty scanner, fresh interior chunker), and
//! `from_cursor`/`from_cursor_for_replace`/`from_cursor_for_delete` for a
//! splice (scanner seeded with the cursor's already-scanned prefix,
//! interior chunker seeded with the cursor's unchanged left-siblings at
//! every ancestor level).

use bytes::Bytes;

use crate::boundary::should_cut;
use crate::config::ChunkConfig;
use crate::cursor::JsonCursor;
use crate::error::Result;
use crate::interior::InteriorChunker;
use crate::node::encode_leaf;
use crate::path::Location;
use crate::scanner::{ScanOutcome, Scanner};
use crate::store::{Address, NodeStore};
use crate::value::CanonicalJson;

/// How a splice changes the document at the cursor's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceMode {
    /// Insert a new member/element before the cursor's current position.
    Insert,
    /// Replace the value the cursor currently sits on.
    Replace,
    /// Remove the value the cursor currently sits on.
    Delete,
}

/// The writer: owns an append buffer and a level-1 [`InteriorChunker`],
/// emitting leaf blobs at predicate-chosen boundaries as bytes accumulate.
pub struct JsonChunker<'a, S: NodeStore> {
    config: &'a ChunkConfig,
    store: &'a S,
    scanner: Scanner,
    interior: InteriorChunker<'a, S>,
    /// `Some` only while a splice is in progress; consumed in [`JsonChunker::done`].
    cursor: Option<JsonCursor<'a, S>>,
    /// `true` only for [`JsonChunker::from_cursor_for_delete`]: `done`
    /// must reconcile a now-dangling separator instead of writing new
    /// content, the one respect in which deletion differs from insert
    /// and replace.
    delete_mode: bool,
}

impl<'a, S: NodeStore> JsonChunker<'a, S> {
    /// A fresh chunker for a full document rewrite.
    pub fn new(config: &'a ChunkConfig, store: &'a S) -> Self {
        JsonChunker {
            config,
            store,
            scanner: Scanner::from_beginning(Bytes::new()),
            interior: InteriorChunker::new(config, store),
            cursor: None,
            delete_mode: false,
        }
    }

    /// A chunker seeded from an existing tree position, for inserting new
    /// content before the cursor's current position. Takes ownership of
    /// `cursor`: a splice is a one-shot hand-off between cursor and
    /// chunker, not a repeatable operation. The cursor should come from
    /// [`JsonCursor::seek_value_start`] (insert before an existing
    /// sibling) or [`JsonCursor::seek`] targeting a reference sibling's
    /// end (insert after it, or at the document's end).
    ///
    /// The cursor is rewound to its insertion point first: for a
    /// `seek_value_start` cursor that landed on a non-first sibling, the
    /// walk to get there has already consumed that sibling's own leading
    /// comma (and, for an object member, its key and colon) — bytes that
    /// belong to the *existing* sibling, not to the gap being inserted
    /// into. Rewinding puts both this chunker's seeded buffer and the
    /// cursor's own later reads (the tail `finish_splice` appends) back
    /// before that separator, so `write_key` can decide the comma/key
    /// itself without anything already duplicated ahead of it.
    pub fn from_cursor(config: &'a ChunkConfig, store: &'a S, mut cursor: JsonCursor<'a, S>) -> Self {
        cursor.rewind_to_insertion_point();
        let interior = cursor.seed_interior_chunker(config);
        let mut scanner = cursor.scanner().clone();
        scanner.truncate_to_offset();
        JsonChunker { config, store, scanner, interior, cursor: Some(cursor), delete_mode: false }
    }

    /// A chunker seeded for replacing the value `cursor` sits on (from
    /// [`JsonCursor::seek_value_start`]): the new chunker's own scanner is
    /// seeded *before* the old value, ready to parse whatever the caller
    /// appends in its place via [`JsonChunker::append_json_to_buffer`];
    /// `cursor` itself is advanced past the old value here, so the bytes
    /// that follow it are what gets grafted back in afterward.
    pub fn from_cursor_for_replace(config: &'a ChunkConfig, store: &'a S, mut cursor: JsonCursor<'a, S>) -> Result<Self> {
        let interior = cursor.seed_interior_chunker(config);
        let mut scanner = cursor.scanner().clone();
        scanner.truncate_to_offset();
        cursor.skip_current_value()?;
        Ok(JsonChunker { config, store, scanner, interior, cursor: Some(cursor), delete_mode: false })
    }

    /// A chunker seeded for deleting the value `cursor` sits on. Otherwise
    /// similar to [`JsonChunker::from_cursor_for_replace`]; no new value
    /// is ever appended before [`JsonChunker::done`], which instead
    /// reconciles whichever separator the removal left dangling.
    ///
    /// Unlike replace, a delete must not keep an object member's own key
    /// in the seeded buffer: that key is being removed along with its
    /// value, not kept and given a new value. The buffer is seeded from
    /// [`JsonCursor::deletion_prefix_scanner`] (after the member's leading
    /// comma, if any, but before its key) rather than `cursor.scanner()`
    /// (after the key too) for this reason — the existing comma is kept,
    /// unlike insert, since no new separator is synthesized here; `cursor`
    /// itself still advances past the value from its own, unrewound
    /// position, since `skip_current_value` needs to start *after* the
    /// key to skip only the value.
    pub fn from_cursor_for_delete(config: &'a ChunkConfig, store: &'a S, mut cursor: JsonCursor<'a, S>) -> Result<Self> {
        let interior = cursor.seed_interior_chunker(config);
        let mut scanner = cursor.deletion_prefix_scanner();
        scanner.truncate_to_offset();
        cursor.skip_current_value()?;
        Ok(JsonChunker { config, store, scanner, interior, cursor: Some(cursor), delete_mode: true })
    }

    /// At a mutation insertion point: append `,` if this is not the
    /// first element of its parent container, then `"key":` if the
    /// enclosing container is an object. `key` is `None` for array
    /// elements. The injected bytes are added without re-scanning; a key
    /// inconsistent with the scanner's current container surfaces as
    /// [`crate::error::Error::PreconditionViolation`] rather than
    /// emitting malformed JSON silently.
    pub fn write_key(&mut self, key: Option<&str>) -> Result<()> {
        let mut injected = Vec::new();
        let need_comma = !self.scanner.first_element_or_end_of_empty_value();
        if need_comma {
            injected.push(b',');
        }
        if let Some(k) = key {
            let quoted = serde_json::to_string(k).expect("string serialization cannot fail");
            injected.extend_from_slice(quoted.as_bytes());
            injected.push(b':');
        }
        self.append_raw(&injected);
        self.scanner.skip_bytes(injected.len());
        if need_comma {
            self.scanner.note_comma_inserted()?;
        }
        if let Some(k) = key {
            self.scanner.note_key_inserted(k.to_string())?;
        }
        Ok(())
    }

    /// Append a value's canonical bytes to the buffer without scanning
    /// them yet.
    pub fn append_json_to_buffer(&mut self, value: &impl CanonicalJson) -> Result<()> {
        let bytes = value.to_canonical_bytes()?;
        self.append_raw(&bytes);
        Ok(())
    }

    fn append_raw(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut combined = Vec::with_capacity(self.scanner.full_buffer().len() + bytes.len());
        combined.extend_from_slice(self.scanner.full_buffer());
        combined.extend_from_slice(bytes);
        self.scanner.set_buffer(Bytes::from(combined));
    }

    /// Run the scanner forward, cutting a new leaf at every boundary the
    /// predicate accepts. Returns `true` iff the buffer ended up
    /// completely empty — the re-synchronization signal a splice's
    /// [`JsonChunker::done`] watches for.
    pub fn process_buffer(&mut self) -> Result<bool> {
        loop {
            match self.scanner.advance_to_next_location()? {
                ScanOutcome::EndOfInput => return Ok(self.scanner.full_buffer().is_empty()),
                ScanOutcome::Stop { location, offset } => {
                    let key = location.encode();
                    if should_cut(self.config, 0, &key, offset) {
                        self.cut_leaf(offset, key, location.path().clone())?;
                    }
                }
            }
        }
    }

    fn cut_leaf(&mut self, offset: usize, key: Vec<u8>, resume_path: crate::path::JsonPath) -> Result<()> {
        let leaf_bytes = &self.scanner.full_buffer()[..offset];
        let blob = encode_leaf(leaf_bytes);
        let address = self.store.write(&blob)?;
        self.interior.add_pair(key, address)?;
        let remaining = Bytes::copy_from_slice(&self.scanner.full_buffer()[offset..]);
        self.scanner = Scanner::from_middle(remaining, resume_path);
        Ok(())
    }

    /// Finalize the tree and return its root address.
    pub fn done(mut self) -> Result<Address> {
        let delete_mode = self.delete_mode;
        match self.cursor.take() {
            None => self.finish_full_write(),
            Some(cursor) if delete_mode => self.finish_delete(cursor),
            Some(cursor) => self.finish_splice(cursor),
        }
    }

    fn finish_full_write(mut self) -> Result<Address> {
        let remaining = self.scanner.full_buffer().to_vec();
        if !remaining.is_empty() {
            let blob = encode_leaf(&remaining);
            let address = self.store.write(&blob)?;
            self.interior.add_pair(Location::end_of_document().encode(), address)?;
        }
        self.interior.done()
    }

    fn finish_splice(mut self, mut cursor: JsonCursor<'a, S>) -> Result<Address> {
        let splice_offset = cursor.scanner().offset();
        let needs_comma = match cursor.current_value().get(splice_offset) {
            Some(b'}' | b']' | b',') => false,
            Some(_) => true,
            None => false,
        };
        if needs_comma {
            self.append_raw(b",");
        }

        loop {
            let leaf_tail = cursor.current_value()[cursor.scanner().offset()..].to_vec();
            self.append_raw(&leaf_tail);
            let resynced = self.process_buffer()?;
            if resynced {
                if cursor.advance()? {
                    cursor.graft_remainder(&mut self.interior)?;
                }
                return self.interior.done();
            }
            if !cursor.advance()? {
                break;
            }
        }

        self.finish_full_write()
    }

    /// As [`JsonChunker::finish_splice`], but for a deletion: no new
    /// content was written in the removed value's place, so the leading
    /// separator the removal leaves dangling must be reconciled instead
    /// of the usual "insert a comma if one is missing" check — deleting
    /// the last element, in particular, must not leave a trailing comma.
    /// If the bytes right after the removed value are another
    /// comma, that comma belonged to the *next* sibling and is dropped in
    /// favor of whatever separator already precedes the removed value in
    /// the buffer; otherwise, if the buffer itself ends in a comma (the
    /// removed value had no following sibling), that trailing comma is
    /// dropped instead.
    fn finish_delete(mut self, mut cursor: JsonCursor<'a, S>) -> Result<Address> {
        let mut tail_start = cursor.scanner().offset();
        if cursor.current_value().get(tail_start) == Some(&b',') {
            tail_start += 1;
        } else {
            let buf = self.scanner.full_buffer();
            if buf.last() == Some(&b',') {
                let trimmed = buf[..buf.len() - 1].to_vec();
                self.scanner.set_buffer(Bytes::from(trimmed));
            }
        }

        loop {
            let leaf_tail = cursor.current_value()[tail_start..].to_vec();
            self.append_raw(&leaf_tail);
            let resynced = self.process_buffer()?;
            if resynced {
                if cursor.advance()? {
                    cursor.graft_remainder(&mut self.interior)?;
                }
                return self.interior.done();
            }
            if !cursor.advance()? {
                break;
            }
            tail_start = 0;
        }

        self.finish_full_write()
    }

    /// Convenience for a full, non-incremental write: serialize `value`
    /// to canonical bytes, scan and cut it, and finalize in one call —
    /// the core of [`crate::api::serialize_json_to_addr`].
    pub fn write(config: &'a ChunkConfig, store: &'a S, value: &impl CanonicalJson) -> Result<Address> {
        let mut chunker = JsonChunker::new(config, store);
        chunker.append_json_to_buffer(value)?;
        chunker.process_buffer()?;
        chunker.done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::JsonPath;
    use crate::store::MemoryNodeStore;
    use serde_json::json;

    fn small_config() -> ChunkConfig {
        ChunkConfig { min_chunk_size: 8, max_chunk_size: 64, target_chunk_size: 24, ..ChunkConfig::default() }
    }

    fn reassemble(store: &MemoryNodeStore, root: Address) -> Vec<u8> {
        let mut path = JsonPath::root();
        path.push_index(0);
        let start = if let Ok(mut cursor) = JsonCursor::seek(store, root, &Location::start_of_value(path)) {
            let mut out = Vec::new();
            loop {
                out.extend_from_slice(cursor.current_value());
                if !cursor.advance().unwrap() {
                    break;
                }
            }
            Some(out)
        } else {
            None
        };
        start.unwrap_or_default()
    }

    #[test]
    fn empty_object_round_trips_through_a_single_leaf() {
        let config = ChunkConfig::default();
        let store = MemoryNodeStore::new();
        let root = JsonChunker::write(&config, &store, &json!({})).unwrap();
        let (level, entries) = crate::node::decode_interior(&store.read(&root).unwrap()).unwrap();
        assert_eq!(level, 1);
        assert_eq!(entries.len(), 1);
        let leaf = store.read(&entries[0].1).unwrap();
        assert_eq!(crate::node::decode_leaf(&leaf).unwrap(), b"{}");
    }

    #[test]
    fn large_array_reassembles_byte_identical_and_honors_bounds() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..10_000).collect::<Vec<u32>>());
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let reassembled = reassemble(&store, root);
        assert_eq!(reassembled, value.to_canonical_bytes().unwrap());

        fn check_leaf_lengths(store: &MemoryNodeStore, addr: &Address, cfg: &ChunkConfig, is_last_path: &mut bool) {
            let blob = store.read(addr).unwrap();
            if crate::node::peek_level(&blob).unwrap() == 0 {
                let len = crate::node::decode_leaf(&blob).unwrap().len();
                assert!(len <= cfg.max_chunk_size);
                return;
            }
            let (_, entries) = crate::node::decode_interior(&blob).unwrap();
            for (i, (_, child)) in entries.iter().enumerate() {
                let mut last = i + 1 == entries.len();
                check_leaf_lengths(store, child, cfg, &mut last);
            }
            let _ = is_last_path;
        }
        let mut last = true;
        check_leaf_lengths(&store, &root, &config, &mut last);
    }

    #[test]
    fn determinism_same_input_same_root() {
        let config = small_config();
        let store_a = MemoryNodeStore::new();
        let store_b = MemoryNodeStore::new();
        let value = json!({"users": (0..500).map(|i| json!({"id": i, "name": format!("user-{i}")})).collect::<Vec<_>>()});
        let root_a = JsonChunker::write(&config, &store_a, &value).unwrap();
        let root_b = JsonChunker::write(&config, &store_b, &value).unwrap();
        assert_eq!(root_a, root_b);
    }

    #[test]
    fn splicing_a_leaf_value_changes_only_a_bounded_number_of_addresses() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let original = json!((0..2_000u32).map(|i| json!({"id": i})).collect::<Vec<_>>());
        let original_root = JsonChunker::write(&config, &store, &original).unwrap();

        fn collect_leaf_addresses(store: &MemoryNodeStore, addr: &Address, out: &mut std::collections::HashSet<Address>) {
            let blob = store.read(addr).unwrap();
            if crate::node::peek_level(&blob).unwrap() == 0 {
                out.insert(*addr);
                return;
            }
            let (_, entries) = crate::node::decode_interior(&blob).unwrap();
            for (_, child) in &entries {
                collect_leaf_addresses(store, child, out);
            }
        }
        let mut before = std::collections::HashSet::new();
        collect_leaf_addresses(&store, &original_root, &mut before);

        let mut target_path = JsonPath::root();
        target_path.push_index(1_000);
        target_path.push_key_placeholder();
        target_path.set_last_key("id".to_string());
        let cursor = JsonCursor::seek_value_start(&store, original_root, &target_path).unwrap();

        let mut chunker = JsonChunker::from_cursor_for_replace(&config, &store, cursor).unwrap();
        chunker.append_json_to_buffer(&json!(999_999)).unwrap();
        let new_root = chunker.done().unwrap();

        let mut after = std::collections::HashSet::new();
        collect_leaf_addresses(&store, &new_root, &mut after);

        assert_ne!(new_root, original_root);
        let unchanged = before.intersection(&after).count();
        assert!(unchanged > 0, "expected most leaves to survive the splice unchanged");
        assert!(before.len() - unchanged < 10, "splice touched too many leaves: {} of {}", before.len() - unchanged, before.len());
    }

    #[test]
    fn deleting_a_middle_element_removes_it_without_double_comma() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..50u32).collect::<Vec<u32>>());
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_index(25);
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let chunker = JsonChunker::from_cursor_for_delete(&config, &store, cursor).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        let mut expected: Vec<u32> = (0..50u32).collect();
        expected.remove(25);
        assert_eq!(reassembled, serde_json::to_vec(&expected).unwrap());
        assert!(!reassembled.windows(2).any(|w| w == b",,"));
    }

    #[test]
    fn deleting_the_last_element_leaves_no_trailing_comma() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..10u32).collect::<Vec<u32>>());
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_index(9);
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let chunker = JsonChunker::from_cursor_for_delete(&config, &store, cursor).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        let expected: Vec<u32> = (0..9u32).collect();
        assert_eq!(reassembled, serde_json::to_vec(&expected).unwrap());
        assert!(!reassembled.windows(2).any(|w| w == b",]"));
    }

    #[test]
    fn deleting_an_object_member_removes_its_key_and_value() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!({"b": 1, "c": 2});
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_key_placeholder();
        target_path.set_last_key("b".to_string());
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let chunker = JsonChunker::from_cursor_for_delete(&config, &store, cursor).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        assert_eq!(reassembled, json!({"c": 2}).to_canonical_bytes().unwrap());
    }

    #[test]
    fn deleting_the_last_object_member_leaves_no_trailing_comma() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!({"b": 1, "c": 2});
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_key_placeholder();
        target_path.set_last_key("c".to_string());
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let chunker = JsonChunker::from_cursor_for_delete(&config, &store, cursor).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        assert_eq!(reassembled, json!({"b": 1}).to_canonical_bytes().unwrap());
        assert!(!reassembled.windows(2).any(|w| w == b",}"));
    }

    #[test]
    fn inserting_before_a_non_first_object_member_keeps_both_siblings() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!({"b": 1, "c": 2});
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_key_placeholder();
        target_path.set_last_key("c".to_string());
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let mut chunker = JsonChunker::from_cursor(&config, &store, cursor);
        chunker.write_key(Some("x")).unwrap();
        chunker.append_json_to_buffer(&json!(9)).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        assert_eq!(reassembled, json!({"b": 1, "x": 9, "c": 2}).to_canonical_bytes().unwrap());
    }

    #[test]
    fn inserting_a_new_first_element_shifts_existing_siblings() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((1..20u32).collect::<Vec<u32>>());
        let root = JsonChunker::write(&config, &store, &value).unwrap();

        let mut target_path = JsonPath::root();
        target_path.push_index(0);
        let cursor = JsonCursor::seek_value_start(&store, root, &target_path).unwrap();
        let mut chunker = JsonChunker::from_cursor(&config, &store, cursor);
        chunker.append_json_to_buffer(&json!(0)).unwrap();
        let new_root = chunker.done().unwrap();

        let reassembled = reassemble(&store, new_root);
        let expected: Vec<u32> = (0..20u32).collect();
        assert_eq!(reassembled, serde_json::to_vec(&expected).unwrap());
    }
}
