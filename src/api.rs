// this_file: src/api.rs

//! The public entry points: the three calls an embedder actually makes.
//! Everything else in this crate — the scanner, the boundary predicate,
//! the cursor, the two chunker levels — exists to make these three calls
//! correct and cheap.
//!
//! The higher-level document API that decides *where* a splice targets
//! (looking up a path, applying a patch) is explicitly out of scope
//! here: [`splice_json`] takes an already-positioned
//! [`JsonCursor`], which a caller builds with [`JsonCursor::seek_value_start`]
//! (replace, delete, or insert-before-an-existing-sibling) or
//! [`JsonCursor::seek`] (insert after a reference sibling, or at the
//! document's end).

use crate::chunker::{JsonChunker, SpliceMode};
use crate::config::ChunkConfig;
use crate::cursor::JsonCursor;
use crate::error::{Error, Result};
use crate::path::{JsonPath, Location};
use crate::store::{Address, NodeStore};
use crate::value::CanonicalJson;

/// Full write: serialize `value` to canonical bytes and chunk it from
/// scratch, with no reference to any prior tree.
pub fn serialize_json_to_addr<S: NodeStore>(
    config: &ChunkConfig,
    store: &S,
    value: &impl CanonicalJson,
) -> Result<Address> {
    JsonChunker::write(config, store, value)
}

/// Incremental write: insert, replace, or delete a single value at
/// `cursor`'s position. Consumes `cursor`, since a splice is a one-shot
/// hand-off between cursor and chunker.
///
/// `key` is only consulted for [`SpliceMode::Insert`] into an object
/// (`None` for an array element or a replace/delete). `new_value` is
/// required for [`SpliceMode::Insert`] and [`SpliceMode::Replace`], and
/// ignored for [`SpliceMode::Delete`].
pub fn splice_json<'a, S: NodeStore>(
    config: &'a ChunkConfig,
    store: &'a S,
    cursor: JsonCursor<'a, S>,
    mode: SpliceMode,
    key: Option<&str>,
    new_value: Option<&dyn CanonicalJson>,
) -> Result<Address> {
    match mode {
        SpliceMode::Insert => {
            let value = new_value.ok_or_else(|| {
                Error::PreconditionViolation("SpliceMode::Insert requires a new value".to_string())
            })?;
            let mut chunker = JsonChunker::from_cursor(config, store, cursor);
            chunker.write_key(key)?;
            chunker.append_json_to_buffer(value)?;
            chunker.done()
        }
        SpliceMode::Replace => {
            let value = new_value.ok_or_else(|| {
                Error::PreconditionViolation("SpliceMode::Replace requires a new value".to_string())
            })?;
            let mut chunker = JsonChunker::from_cursor_for_replace(config, store, cursor)?;
            chunker.append_json_to_buffer(value)?;
            chunker.done()
        }
        SpliceMode::Delete => {
            let chunker = JsonChunker::from_cursor_for_delete(config, store, cursor)?;
            chunker.done()
        }
    }
}

/// Walk every leaf of the tree rooted at `root`, in document order, and
/// concatenate their bytes back into the canonical document they encode:
/// `reassemble(serialize_json_to_addr(v)) == v.to_canonical_bytes()`.
/// Exists primarily to make that property testable; embedders reading a
/// whole document back out would typically do the same walk themselves.
pub fn reassemble<S: NodeStore>(store: &S, root: Address) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut cursor = JsonCursor::seek(store, root, &Location::start_of_value(JsonPath::root()))?;
    loop {
        out.extend_from_slice(cursor.current_value());
        if !cursor.advance()? {
            break;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryNodeStore;
    use serde_json::json;

    fn small_config() -> ChunkConfig {
        ChunkConfig { min_chunk_size: 8, max_chunk_size: 64, target_chunk_size: 24, ..ChunkConfig::default() }
    }

    #[test]
    fn reassemble_inverts_a_full_write() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!({"users": (0..200).map(|i| json!({"id": i})).collect::<Vec<_>>()});
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();

        let reassembled = reassemble(&store, root).unwrap();
        assert_eq!(reassembled, value.to_canonical_bytes().unwrap());
    }

    #[test]
    fn splice_json_replace_changes_a_single_scalar() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..500u32).map(|i| json!({"id": i})).collect::<Vec<_>>());
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();

        let mut target = JsonPath::root();
        target.push_index(250);
        target.push_key_placeholder();
        target.set_last_key("id".to_string());
        let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
        let replacement = json!(999_999);
        let new_root =
            splice_json(&config, &store, cursor, SpliceMode::Replace, None, Some(&replacement)).unwrap();

        let reassembled = reassemble(&store, new_root).unwrap();
        let mut expected: Vec<serde_json::Value> =
            (0..500u32).map(|i| json!({"id": i})).collect();
        expected[250] = json!({"id": 999_999});
        assert_eq!(reassembled, json!(expected).to_canonical_bytes().unwrap());
    }

    #[test]
    fn splice_json_delete_removes_one_element() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..100u32).collect::<Vec<u32>>());
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();

        let mut target = JsonPath::root();
        target.push_index(40);
        let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
        let new_root = splice_json(&config, &store, cursor, SpliceMode::Delete, None, None).unwrap();

        let reassembled = reassemble(&store, new_root).unwrap();
        let mut expected: Vec<u32> = (0..100u32).collect();
        expected.remove(40);
        assert_eq!(reassembled, serde_json::to_vec(&expected).unwrap());
    }

    #[test]
    fn splice_json_insert_requires_a_value() {
        let config = small_config();
        let store = MemoryNodeStore::new();
        let value = json!((0..10u32).collect::<Vec<u32>>());
        let root = serialize_json_to_addr(&config, &store, &value).unwrap();

        let mut target = JsonPath::root();
        target.push_index(0);
        let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
        let err = splice_json(&config, &store, cursor, SpliceMode::Insert, None, None).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::PreconditionViolation);
    }
}
