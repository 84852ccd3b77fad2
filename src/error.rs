//! Error taxonomy for the data availability share layer.
//!
//! One enum covers every fallible operation in the crate: share
//! (de)serialization, NMT construction/verification, erasure coding, block
//! store access, and the shrex/nd wire protocol. Variants are plain and
//! carry enough context to log and to map onto `shrex.nd.StatusCode` on the
//! wire (see `protocol::wire`).

use crate::nmt::types::NamespaceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A share did not decode to the configured `ShareSize`.
    #[error("invalid share size: expected {expected}, got {actual}")]
    InvalidShareSize { expected: usize, actual: usize },

    /// Requested namespace falls entirely outside a root's `[min_ns, max_ns]`
    /// range — the root proves the namespace cannot be present.
    #[error("namespace {0:?} is outside the root's namespace range")]
    NamespaceOutsideRange(NamespaceId),

    /// Requested namespace falls within a root's range but no leaf in the
    /// tree actually carries it — the absence must be proven.
    #[error("namespace {0:?} not found under root")]
    NamespaceNotFound(NamespaceId),

    /// Leaf index or proof path does not correspond to the tree shape.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// Block store has no entry for the given CID.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reed-Solomon reconstruction could not recover the square: more than
    /// `k` shards missing on some row or column.
    #[error("failed to solve: insufficient shards on {axis} {index} (have {have}, need {need})")]
    FailedToSolve {
        axis: Axis,
        index: usize,
        have: usize,
        need: usize,
    },

    /// A row or column reconstructed during repair does not hash to the
    /// commitment it was reconstructed against.
    #[error("reconstructed {axis} {index} does not match its published root")]
    RootMismatch { axis: Axis, index: usize },

    /// A peer's response did not parse, had the wrong shape, or failed to
    /// verify against the requested root.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// An operation exceeded its deadline or was cancelled via its token.
    #[error("timeout or cancellation")]
    Canceled,

    /// Erasure coding backend error (shard size mismatch, bad parameters).
    #[error("erasure coding error: {0}")]
    Codec(#[from] reed_solomon_erasure::Error),

    /// Content-addressing / multihash failure.
    #[error("cid error: {0}")]
    Cid(String),

    /// Wire (de)serialization failure.
    #[error("wire decode error: {0}")]
    WireDecode(#[from] prost::DecodeError),

    /// Wire (de)serialization failure on the encode side.
    #[error("wire encode error: {0}")]
    WireEncode(#[from] prost::EncodeError),

    /// I/O failure on a protocol stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Col,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Col => write!(f, "col"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
