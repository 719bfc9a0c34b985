// this_file: src/error.rs

//! Error types for the prolly-json chunker.
//!
//! Every failure the crate can surface maps to one variant here, ordered
//! roughly from most to least local per the error kinds in the design
//! (parse error, store error, cursor invalidation, precondition violation).

use thiserror::Error;

/// Structured error codes, for embedders that want to match on a stable
/// identifier rather than the variant shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// J1001: malformed JSON encountered while scanning.
    ParseError,
    /// J1002: the backing node store rejected a write or read.
    StoreError,
    /// J1003: a cursor's backing tree no longer exists.
    CursorInvalidation,
    /// J1004: a structural precondition was violated by the caller.
    PreconditionViolation,
}

impl ErrorCode {
    /// The stable string identifier for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "J1001",
            ErrorCode::StoreError => "J1002",
            ErrorCode::CursorInvalidation => "J1003",
            ErrorCode::PreconditionViolation => "J1004",
        }
    }
}

/// The crate's error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed JSON was encountered while scanning. Carries the byte
    /// offset at which the scanner gave up.
    #[error("malformed JSON at byte offset {offset}: {message}")]
    Parse {
        /// Byte offset into the buffer being scanned.
        offset: usize,
        /// Human-readable description of what the scanner expected.
        message: String,
    },

    /// The node store rejected a write or read.
    #[error("node store error: {0}")]
    Store(String),

    /// The address a cursor or chunker expected to read no longer
    /// resolves in the backing store.
    #[error("cursor invalidated: address {address} not found in store")]
    CursorInvalidation {
        /// Hex form of the missing address.
        address: String,
    },

    /// A caller violated a structural precondition, e.g. called
    /// `write_key` with a path inconsistent with the scanner's current
    /// container context. Not recoverable by retrying.
    #[error("precondition violation: {0}")]
    PreconditionViolation(String),
}

impl Error {
    /// The structured [`ErrorCode`] for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Parse { .. } => ErrorCode::ParseError,
            Error::Store(_) => ErrorCode::StoreError,
            Error::CursorInvalidation { .. } => ErrorCode::CursorInvalidation,
            Error::PreconditionViolation(_) => ErrorCode::PreconditionViolation,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
