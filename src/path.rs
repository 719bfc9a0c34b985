// this_file: src/path.rs

//! Canonical encoding of JSON structural paths as comparable byte keys.
//!
//! A [`JsonPath`] names a position inside a JSON document: an ordered
//! sequence of object-key or array-index steps. A [`Location`] pairs a
//! path with a marker for whether it names the start of a value, the end
//! of a value, or the end of the whole document. The encoded form of a
//! `Location` is the key used to index tree leaves; see [`Location::encode`]
//! for the ordering properties the encoding must preserve.

use std::cmp::Ordering;

/// One step in a JSON structural path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// An object member, named by its key.
    Key(String),
    /// An array element, named by its index.
    Index(u32),
}

impl PathStep {
    /// `true` if this step names an object member.
    pub fn is_key(&self) -> bool {
        matches!(self, PathStep::Key(_))
    }
}

/// An ordered sequence of [`PathStep`]s, possibly empty (the document
/// root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPath {
    steps: Vec<PathStep>,
}

impl JsonPath {
    /// The empty path, naming the document root.
    pub fn root() -> Self {
        JsonPath { steps: Vec::new() }
    }

    /// The path's steps, outermost first.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// `true` if this path names the document root.
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Push an object-key step, descending into a freshly opened object.
    pub fn push_key_placeholder(&mut self) {
        self.steps.push(PathStep::Key(String::new()));
    }

    /// Push an array-index step, descending into a freshly opened array.
    pub fn push_index(&mut self, index: u32) {
        self.steps.push(PathStep::Index(index));
    }

    /// Pop the last step, ascending out of the container it named.
    pub fn pop(&mut self) -> Option<PathStep> {
        self.steps.pop()
    }

    /// Replace the key of the last step (must be a `Key` step).
    pub fn set_last_key(&mut self, key: String) {
        if let Some(PathStep::Key(slot)) = self.steps.last_mut() {
            *slot = key;
        }
    }

    /// Increment the index of the last step (must be an `Index` step).
    pub fn increment_last_index(&mut self) {
        if let Some(PathStep::Index(slot)) = self.steps.last_mut() {
            *slot += 1;
        }
    }

    /// The container kind the last step descends into, if any: `true` for
    /// an object, `false` for an array.
    pub fn last_is_key(&self) -> bool {
        matches!(self.steps.last(), Some(PathStep::Key(_)))
    }
}

/// Whether a [`Location`] marks the start of a value, the end of a value,
/// or the end of the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Marker {
    /// The location just before a value's first byte.
    StartOfValue,
    /// The location just past a value's last byte.
    EndOfValue,
    /// The sentinel location past the final byte of the document.
    EndOfDocument,
}

/// A path together with a marker: the key used to index tree leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    path: JsonPath,
    marker: Marker,
}

impl Location {
    /// A location naming the start of the value at `path`.
    pub fn start_of_value(path: JsonPath) -> Self {
        Location { path, marker: Marker::StartOfValue }
    }

    /// A location naming the end of the value at `path`.
    pub fn end_of_value(path: JsonPath) -> Self {
        Location { path, marker: Marker::EndOfValue }
    }

    /// The sentinel end-of-document location, which sorts after every
    /// real path.
    pub fn end_of_document() -> Self {
        Location { path: JsonPath::root(), marker: Marker::EndOfDocument }
    }

    /// The path this location names.
    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    /// The marker for this location.
    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// Encode this location as a comparable byte string.
    ///
    /// Three properties hold over the result:
    /// 1. Lexicographic byte comparison matches document order.
    /// 2. The end-of-value marker for a path sorts strictly after every
    ///    start-of-value marker of any descendant, and strictly before the
    ///    next sibling's start-of-value.
    /// 3. `end_of_document()` sorts after every real path.
    ///
    /// Object keys are encoded with their raw UTF-8 bytes (so plain byte
    /// comparison already matches lexicographic order), any embedded
    /// `0x00` byte escaped as `0x00 0xff`, and terminated by `0x00 0x00` —
    /// a naive length prefix would break property 1 (e.g. key `"b"` would
    /// sort before key `"aa"`, which is wrong), so the key's content comes
    /// before its length is ever implied. Array indices are fixed-width
    /// big-endian so numeric order matches byte order, needing no
    /// terminator. Only the three ordering properties above are
    /// contractual; the exact byte layout is private to this crate.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.path.steps.len() * 8);
        if self.marker == Marker::EndOfDocument {
            out.push(0xff);
            return out;
        }
        for step in &self.path.steps {
            match step {
                PathStep::Key(k) => {
                    out.push(0x01);
                    for &b in k.as_bytes() {
                        if b == 0x00 {
                            out.push(0x00);
                            out.push(0xff);
                        } else {
                            out.push(b);
                        }
                    }
                    out.push(0x00);
                    out.push(0x00);
                }
                PathStep::Index(i) => {
                    out.push(0x02);
                    out.extend_from_slice(&i.to_be_bytes());
                }
            }
        }
        match self.marker {
            Marker::StartOfValue => out.push(0x00),
            Marker::EndOfValue => out.push(0xfe),
            Marker::EndOfDocument => unreachable!("handled above"),
        }
        out
    }

    /// Decode a [`Location::encode`]d byte string back into a `Location`.
    ///
    /// This inverse is private to the storage layer: only
    /// [`crate::cursor::JsonCursor`] uses it, to recover a child's
    /// structural path while descending an interior node whose on-disk
    /// entries carry nothing but these bytes. External callers of this
    /// crate never see encoded keys at all.
    pub(crate) fn decode(bytes: &[u8]) -> std::result::Result<Location, String> {
        if bytes == [0xff] {
            return Ok(Location::end_of_document());
        }
        let mut path = JsonPath::root();
        let mut i = 0;
        loop {
            match bytes.get(i) {
                Some(0x01) => {
                    i += 1;
                    let mut key = Vec::new();
                    loop {
                        match bytes.get(i) {
                            Some(0x00) => match bytes.get(i + 1) {
                                Some(0x00) => {
                                    i += 2;
                                    break;
                                }
                                Some(0xff) => {
                                    key.push(0x00);
                                    i += 2;
                                }
                                _ => return Err("truncated key escape in encoded location".to_string()),
                            },
                            Some(&b) => {
                                key.push(b);
                                i += 1;
                            }
                            None => return Err("unterminated key in encoded location".to_string()),
                        }
                    }
                    let s = String::from_utf8(key)
                        .map_err(|_| "invalid utf-8 key in encoded location".to_string())?;
                    path.push_key_placeholder();
                    path.set_last_key(s);
                }
                Some(0x02) => {
                    i += 1;
                    let Some(slice) = bytes.get(i..i + 4) else {
                        return Err("truncated index in encoded location".to_string());
                    };
                    let idx = u32::from_be_bytes(slice.try_into().unwrap());
                    path.push_index(idx);
                    i += 4;
                }
                Some(0x00) => return Ok(Location::start_of_value(path)),
                Some(0xfe) => return Ok(Location::end_of_value(path)),
                Some(other) => return Err(format!("unexpected tag byte {other:#x} in encoded location")),
                None => return Err("encoded location ended without a marker byte".to_string()),
            }
        }
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Location {}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encode().cmp(&other.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_path(keys: &[&str]) -> JsonPath {
        let mut p = JsonPath::root();
        for k in keys {
            p.push_key_placeholder();
            p.set_last_key((*k).to_string());
        }
        p
    }

    #[test]
    fn end_of_document_sorts_last() {
        let a = Location::end_of_value(key_path(&["zzzz"]));
        let eod = Location::end_of_document();
        assert!(a.encode() < eod.encode());
    }

    #[test]
    fn sibling_keys_sort_lexicographically() {
        let a = Location::end_of_value(key_path(&["a"]));
        let b = Location::end_of_value(key_path(&["b"]));
        assert!(a.encode() < b.encode());
    }

    #[test]
    fn keys_sort_lexicographically_not_by_length() {
        // "aa" < "b" lexicographically even though "b" is shorter; a naive
        // length-prefix encoding would get this backwards.
        let aa = Location::end_of_value(key_path(&["aa"]));
        let b = Location::end_of_value(key_path(&["b"]));
        assert!(aa.encode() < b.encode());
    }

    #[test]
    fn shorter_prefix_key_sorts_before_longer_extension() {
        let a = Location::end_of_value(key_path(&["a"]));
        let ab = Location::end_of_value(key_path(&["ab"]));
        assert!(a.encode() < ab.encode());
    }

    #[test]
    fn array_indices_sort_numerically() {
        let mut p9 = JsonPath::root();
        p9.push_index(9);
        let mut p10 = JsonPath::root();
        p10.push_index(10);
        let a = Location::end_of_value(p9);
        let b = Location::end_of_value(p10);
        assert!(a.encode() < b.encode());
    }

    #[test]
    fn end_of_value_sorts_after_descendant_start_of_value() {
        let parent_end = Location::end_of_value(key_path(&["a"]));

        let mut child_path = key_path(&["a"]);
        child_path.push_key_placeholder();
        child_path.set_last_key("b".to_string());
        let child_start = Location::start_of_value(child_path);

        assert!(child_start.encode() < parent_end.encode());
    }

    #[test]
    fn end_of_value_sorts_before_next_sibling_start() {
        let a_end = Location::end_of_value(key_path(&["a"]));
        let b_start = Location::start_of_value(key_path(&["b"]));
        assert!(a_end.encode() < b_start.encode());
    }

    #[test]
    fn decode_inverts_encode_for_mixed_paths() {
        let mut p = key_path(&["a\x00b", "c"]);
        p.push_index(7);
        for original in [
            Location::start_of_value(p.clone()),
            Location::end_of_value(p.clone()),
            Location::end_of_document(),
        ] {
            let decoded = Location::decode(&original.encode()).unwrap();
            assert_eq!(decoded, original);
        }
    }
}
