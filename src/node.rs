// this_file: src/node.rs

//! Leaf and interior node wire formats.
//!
//! Bit-exact layout:
//!
//! - **Leaf blob**: magic/version byte, one value segment, an offset
//!   table of a single entry (the segment's length), and a trailing
//!   address-list length of zero (leaves have no children).
//! - **Interior address-map**: magic/version byte, sorted keys as
//!   length-prefixed blobs, addresses as a fixed-width array, and the
//!   tree level (>= 1).

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Error, Result};
use crate::store::Address;

const MAGIC: u8 = 0xa5;
const VERSION: u8 = 1;
const KIND_LEAF: u8 = 0;
const KIND_INTERIOR: u8 = 1;

fn check_header(buf: &mut impl Buf, expected_kind: u8) -> Result<()> {
    if buf.remaining() < 3 {
        return Err(Error::Store("node blob too short for header".to_string()));
    }
    let magic = buf.get_u8();
    let version = buf.get_u8();
    let kind = buf.get_u8();
    if magic != MAGIC {
        return Err(Error::Store(format!("bad node magic byte {magic:#x}")));
    }
    if version != VERSION {
        return Err(Error::Store(format!("unsupported node version {version}")));
    }
    if kind != expected_kind {
        return Err(Error::Store(format!(
            "expected node kind {expected_kind}, found {kind}"
        )));
    }
    Ok(())
}

/// Encode a leaf blob: the raw bytes of one chunk of the serialized
/// document.
pub fn encode_leaf(bytes: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(3 + 8 + bytes.len() + 4);
    buf.put_u8(MAGIC);
    buf.put_u8(VERSION);
    buf.put_u8(KIND_LEAF);
    buf.put_u64(bytes.len() as u64); // offset table: single entry, segment length
    buf.put_slice(bytes);
    buf.put_u32(0); // address-list length: always zero for leaves
    buf.to_vec()
}

/// Decode a leaf blob back into its raw document bytes.
pub fn decode_leaf(blob: &[u8]) -> Result<Vec<u8>> {
    let mut buf = blob;
    check_header(&mut buf, KIND_LEAF)?;
    if buf.remaining() < 8 {
        return Err(Error::Store("leaf blob missing offset table".to_string()));
    }
    let len = buf.get_u64() as usize;
    if buf.remaining() < len {
        return Err(Error::Store("leaf blob shorter than declared length".to_string()));
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    if buf.remaining() < 4 {
        return Err(Error::Store("leaf blob missing address-list length".to_string()));
    }
    let addr_list_len = buf.get_u32();
    if addr_list_len != 0 {
        return Err(Error::Store("leaf blob declares non-zero children".to_string()));
    }
    Ok(bytes)
}

/// Encode an interior address-map node: `level` (>= 1) together with
/// sorted `(key, address)` pairs.
pub fn encode_interior(level: u32, entries: &[(Vec<u8>, Address)]) -> Result<Vec<u8>> {
    if level == 0 {
        return Err(Error::Store("interior node must have level >= 1".to_string()));
    }
    let mut buf = BytesMut::new();
    buf.put_u8(MAGIC);
    buf.put_u8(VERSION);
    buf.put_u8(KIND_INTERIOR);
    buf.put_u32(level);
    buf.put_u32(entries.len() as u32);
    for (key, _) in entries {
        buf.put_u32(key.len() as u32);
        buf.put_slice(key);
    }
    for (_, addr) in entries {
        buf.put_slice(addr.as_bytes());
    }
    Ok(buf.to_vec())
}

/// Decode an interior address-map node into its level and sorted
/// `(key, address)` pairs.
pub fn decode_interior(blob: &[u8]) -> Result<(u32, Vec<(Vec<u8>, Address)>)> {
    let mut buf = blob;
    check_header(&mut buf, KIND_INTERIOR)?;
    if buf.remaining() < 8 {
        return Err(Error::Store("interior node missing level/count".to_string()));
    }
    let level = buf.get_u32();
    let count = buf.get_u32() as usize;

    let mut keys = Vec::with_capacity(count);
    for _ in 0..count {
        if buf.remaining() < 4 {
            return Err(Error::Store("interior node truncated key length".to_string()));
        }
        let klen = buf.get_u32() as usize;
        if buf.remaining() < klen {
            return Err(Error::Store("interior node truncated key bytes".to_string()));
        }
        keys.push(buf[..klen].to_vec());
        buf.advance(klen);
    }

    let mut entries = Vec::with_capacity(count);
    for key in keys {
        if buf.remaining() < 32 {
            return Err(Error::Store("interior node truncated address".to_string()));
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(&buf[..32]);
        buf.advance(32);
        entries.push((key, Address::from_bytes(raw)));
    }
    Ok((level, entries))
}

/// The tree level encoded in a node blob, without fully decoding it:
/// `0` for leaves, `>= 1` for interior nodes.
pub fn peek_level(blob: &[u8]) -> Result<u32> {
    if blob.len() < 3 {
        return Err(Error::Store("node blob too short".to_string()));
    }
    match blob[2] {
        KIND_LEAF => Ok(0),
        KIND_INTERIOR => {
            if blob.len() < 7 {
                return Err(Error::Store("interior node blob too short".to_string()));
            }
            Ok(u32::from_be_bytes([blob[3], blob[4], blob[5], blob[6]]))
        }
        other => Err(Error::Store(format!("unknown node kind {other}"))),
    }
}
