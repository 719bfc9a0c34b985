// this_file: src/lib.rs
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

//! `prolly_json`: a streaming chunker that serializes JSON documents into
//! a content-addressed, probabilistically-balanced prolly tree.
//!
//! The chunker scans canonical JSON byte-by-byte while maintaining a
//! structural path cursor, splits the document into variable-sized leaf
//! blobs at stable, content-derived boundaries, and — when editing an
//! existing document — splices new bytes into the middle of the stream
//! while re-using unchanged chunks from the original tree. See
//! [`api::serialize_json_to_addr`] and [`api::splice_json`] for the two
//! entry points most callers need.

/// Error types and result type alias for the chunker.
pub mod error;

/// Process-wide tunables: size bounds and per-level hash salts.
pub mod config;

/// Canonical encoding of JSON structural paths as comparable byte keys.
pub mod path;

/// The byte-level streaming JSON scanner.
pub mod scanner;

/// The chunk-boundary predicate.
pub mod boundary;

/// The generic node store interface and an in-memory reference impl.
pub mod store;

/// Leaf and interior node wire formats.
pub mod node;

/// The read cursor into an existing tree.
pub mod cursor;

/// The interior (address-map) chunker adapter.
pub mod interior;

/// The JSON chunker: the writer state machine.
pub mod chunker;

/// The JSON value wrapper external collaborator.
pub mod value;

/// The public entry points.
pub mod api;

pub use api::{reassemble, serialize_json_to_addr, splice_json};
pub use chunker::{JsonChunker, SpliceMode};
pub use config::ChunkConfig;
pub use cursor::JsonCursor;
pub use error::{Error, ErrorCode, Result};
pub use path::{JsonPath, Location, Marker, PathStep};
pub use store::{Address, MemoryNodeStore, NodeStore, Pool};
pub use value::{marshal_canonical, CanonicalJson};
