//! Namespaced Merkle Tree core types: [`NamespaceId`], [`Leaf`], and [`Proof`].

use crate::hash::Digest32;
use serde::{Deserialize, Serialize};

/// Width (in bytes) of a namespace identifier.
pub const NAMESPACE_BYTES: usize = 8;

/// 8-byte namespace identifier, big-endian, lexicographically ordered.
pub type NamespaceId = [u8; NAMESPACE_BYTES];

/// Reserved sentinel namespace assigned to parity shares produced by the
/// erasure coder. It sorts after every namespace a user can pick, so parity
/// leaves always land at the tail of a row/column tree.
pub const PARITY_SHARE_NAMESPACE: NamespaceId = [0xff; NAMESPACE_BYTES];

#[inline]
pub const fn ns_from_u64(x: u64) -> NamespaceId {
    x.to_be_bytes()
}

#[inline]
pub fn ns_try_from_slice(bytes: &[u8]) -> Option<NamespaceId> {
    if bytes.len() == NAMESPACE_BYTES {
        let mut out = [0u8; NAMESPACE_BYTES];
        out.copy_from_slice(bytes);
        Some(out)
    } else {
        None
    }
}

/// A single NMT leaf: a namespace and its payload (an encoded share).
///
/// The payload is hashed with namespace-aware domain separation by the tree
/// builder (see `hashers::leaf`); this type carries the raw bytes only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub ns: NamespaceId,
    pub data: Vec<u8>,
}

impl Leaf {
    #[inline]
    pub fn new(ns: NamespaceId, data: impl Into<Vec<u8>>) -> Self {
        Self { ns, data: data.into() }
    }

    /// A leaf produced by the erasure coder: always namespaced to the
    /// parity sentinel.
    #[inline]
    pub fn parity(data: impl Into<Vec<u8>>) -> Self {
        Self::new(PARITY_SHARE_NAMESPACE, data)
    }
}

/// A sibling node included in a Merkle path.
///
/// `is_left` indicates the sibling sits to the **left** of the running hash
/// (the target is the right child at this level).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofNode {
    pub is_left: bool,
    pub min_ns: NamespaceId,
    pub max_ns: NamespaceId,
    #[serde(with = "serde_bytes")]
    pub hash: Digest32,
}

/// Membership (inclusion) or absence proof from one or more leaves to a root.
///
/// `is_max_namespace_id_ignored` mirrors the flag on the wire (see
/// `protocol::wire::Proof`): it must match the mode the tree was built with
/// for the proof to verify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub start: usize,
    pub end: usize,
    pub path: Vec<ProofNode>,
    pub is_max_namespace_id_ignored: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_helpers() {
        let a = ns_from_u64(0x0102_0304_0506_0708);
        assert_eq!(a, [1, 2, 3, 4, 5, 6, 7, 8]);

        let b = ns_try_from_slice(&[9, 8, 7, 6, 5, 4, 3, 2]).unwrap();
        assert_eq!(b, [9, 8, 7, 6, 5, 4, 3, 2]);

        assert!(ns_try_from_slice(&[0u8; 7]).is_none());
        assert!(ns_try_from_slice(&[0u8; 9]).is_none());
    }

    #[test]
    fn parity_leaf_uses_sentinel_namespace() {
        let lf = Leaf::parity(vec![1, 2, 3]);
        assert_eq!(lf.ns, PARITY_SHARE_NAMESPACE);
    }
}
