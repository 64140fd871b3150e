//! Error types for the fallible internals.
//!
//! None of these cross a public boundary: the worker handler, the share-link
//! decoder and storage hydration all convert them to empty/default results
//! and log them.

use thiserror::Error;

/// Failures while decoding a share-link token.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("token is {len} bytes, limit is {limit}")]
    TokenTooLong { len: usize, limit: usize },
    #[error("decoded payload exceeds {limit} bytes")]
    DecodedTooLong { limit: usize },
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("compression stream error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not an array of team entries")]
    NotAnArray,
    #[error("team entry {index} is malformed: {reason}")]
    MalformedEntry { index: usize, reason: &'static str },
    #[error("team entry references unknown catalog id {0}")]
    UnknownId(u32),
}

/// Failures talking to the durable storage primitive.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("could not serialize persisted state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a worker request is rejected before any computation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("missing or invalid requestId")]
    InvalidRequestId,
    #[error("invalid sortDirection")]
    InvalidDirection,
    #[error("invalid {0} field")]
    InvalidField(&'static str),
    #[error("{field} has {len} entries, limit is {limit}")]
    Oversized {
        field: &'static str,
        len: usize,
        limit: usize,
    },
    #[error("no catalog has been received yet")]
    NoCatalog,
}

/// Failures from the external regional-rank lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("unknown region {0}")]
    UnknownRegion(String),
    #[error("rank lookup failed: {0}")]
    Failed(String),
}
