// this_file: tests/splice_and_reassemble.rs

use prolly_json::{
    reassemble, serialize_json_to_addr, splice_json, Address, ChunkConfig, JsonCursor, JsonPath,
    MemoryNodeStore, NodeStore, SpliceMode,
};
use serde_json::{json, Value};

fn small_config() -> ChunkConfig {
    ChunkConfig { min_chunk_size: 8, max_chunk_size: 64, target_chunk_size: 24, ..ChunkConfig::default() }
}

fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[test]
fn empty_object_reassembles_to_itself() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!({});
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();
    assert_eq!(reassemble(&store, root).unwrap(), canonical_bytes(&value));
}

#[test]
fn large_array_reassembles_byte_identical() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!((0..10_000u32).collect::<Vec<u32>>());
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();
    assert_eq!(reassemble(&store, root).unwrap(), canonical_bytes(&value));
}

#[test]
fn replace_at_a_deep_path_in_a_large_document() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!({
        "users": (0..5_000u32).map(|i| json!({"id": i, "tags": ["a", "b"]})).collect::<Vec<_>>(),
    });
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();

    let mut target = JsonPath::root();
    target.push_key_placeholder();
    target.set_last_key("users".to_string());
    target.push_index(2_500);
    target.push_key_placeholder();
    target.set_last_key("tags".to_string());
    target.push_index(1);

    let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
    let replacement = json!("z");
    let new_root =
        splice_json(&config, &store, cursor, SpliceMode::Replace, None, Some(&replacement)).unwrap();

    let mut expected = value;
    expected["users"][2_500]["tags"][1] = json!("z");
    assert_eq!(reassemble(&store, new_root).unwrap(), canonical_bytes(&expected));
}

#[test]
fn insert_a_new_first_member_of_an_object() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!({"b": 1, "c": 2});
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();

    let mut target = JsonPath::root();
    target.push_key_placeholder();
    target.set_last_key("b".to_string());
    let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
    let new_value = json!(0);
    let new_root = splice_json(
        &config,
        &store,
        cursor,
        SpliceMode::Insert,
        Some("a"),
        Some(&new_value),
    )
    .unwrap();

    let expected = json!({"a": 0, "b": 1, "c": 2});
    assert_eq!(reassemble(&store, new_root).unwrap(), canonical_bytes(&expected));
}

#[test]
fn delete_an_object_member_removes_its_key_and_value() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!({"a": 0, "b": 1, "c": 2});
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();

    let mut target = JsonPath::root();
    target.push_key_placeholder();
    target.set_last_key("b".to_string());
    let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
    let new_root = splice_json(&config, &store, cursor, SpliceMode::Delete, None, None).unwrap();

    let expected = json!({"a": 0, "c": 2});
    assert_eq!(reassemble(&store, new_root).unwrap(), canonical_bytes(&expected));
}

#[test]
fn delete_the_last_element_leaves_no_trailing_comma() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!((0..200u32).collect::<Vec<u32>>());
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();

    let mut target = JsonPath::root();
    target.push_index(199);
    let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
    let new_root = splice_json(&config, &store, cursor, SpliceMode::Delete, None, None).unwrap();

    let bytes = reassemble(&store, new_root).unwrap();
    assert!(!bytes.windows(2).any(|w| w == b",]"));
    let expected: Vec<u32> = (0..199u32).collect();
    assert_eq!(bytes, canonical_bytes(&json!(expected)));
}

#[test]
fn nested_splice_leaves_untouched_subtrees_byte_identical() {
    let config = small_config();
    let store = MemoryNodeStore::new();
    let value = json!({
        "a": (0..1_000u32).collect::<Vec<u32>>(),
        "b": (0..1_000u32).map(|i| json!({"id": i})).collect::<Vec<_>>(),
    });
    let root = serialize_json_to_addr(&config, &store, &value).unwrap();

    fn collect_leaves(store: &MemoryNodeStore, addr: &Address, out: &mut std::collections::HashSet<Address>) {
        let blob = store.read(addr).unwrap();
        if prolly_json::node::peek_level(&blob).unwrap() == 0 {
            out.insert(*addr);
            return;
        }
        let (_, entries) = prolly_json::node::decode_interior(&blob).unwrap();
        for (_, child) in &entries {
            collect_leaves(store, child, out);
        }
    }
    let mut before = std::collections::HashSet::new();
    collect_leaves(&store, &root, &mut before);

    let mut target = JsonPath::root();
    target.push_key_placeholder();
    target.set_last_key("b".to_string());
    target.push_index(500);
    target.push_key_placeholder();
    target.set_last_key("id".to_string());
    let cursor = JsonCursor::seek_value_start(&store, root, &target).unwrap();
    let replacement = json!(-1);
    let new_root =
        splice_json(&config, &store, cursor, SpliceMode::Replace, None, Some(&replacement)).unwrap();

    let mut after = std::collections::HashSet::new();
    collect_leaves(&store, &new_root, &mut after);

    let untouched = before.intersection(&after).count();
    assert!(untouched > 0, "expected the \"a\" subtree's leaves to survive the splice under \"b\" unchanged");

    let mut expected = value;
    expected["b"][500]["id"] = json!(-1);
    assert_eq!(reassemble(&store, new_root).unwrap(), canonical_bytes(&expected));
}
