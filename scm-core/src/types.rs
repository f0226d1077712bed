//! Shared types and the error enum for scm-core.

use thiserror::Error;

/// Fatal errors produced by the SCM pipeline.
///
/// A block simply failing to yield a decoded packet (straddling preamble,
/// preamble mismatch, uncorrectable syndrome) is not represented here —
/// the receiver loop recovers from those locally and never escalates them
/// to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sample source returned {actual} bytes, expected {expected}")]
    SourceExhausted { expected: usize, actual: usize },
    #[error("tuner protocol error: {0}")]
    SourceProtocol(String),
    #[error("malformed frame: expected {expected} bits, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
    #[error("sink write failed: {0}")]
    SinkWrite(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
