//! Namespace-aware hash combiners for the Namespaced Merkle Tree.
//!
//! Domain-separated SHA-256, following the hash function mandated for
//! consensus-critical digests:
//! - Leaf:   `SHA256(0x00 || ns || ns || SHA256(payload))`
//! - Parent: `SHA256(0x01 || min_ns || max_ns || left_hash || right_hash)`
//!
//! ### ignore-max-namespace
//! Parity shares produced by the erasure coder all carry
//! [`PARITY_SHARE_NAMESPACE`], the maximal namespace value. Without special
//! handling, any row/column tree that mixes real and parity leaves would
//! report `max_ns == PARITY_SHARE_NAMESPACE` for its root, which would make
//! every namespace query "inside range" and defeat range pruning.
//!
//! When `ignore_max_ns` is set (the mode this crate always builds trees
//! with), a parent's `max_ns` ignores a right child's namespace range when
//! that child is *purely* parity: the parent reports the left child's `max`
//! instead. A subtree that is itself entirely parity still reports the
//! sentinel, so the root correctly still spans it when every leaf is parity.

use super::types::{NamespaceId, PARITY_SHARE_NAMESPACE};
use crate::hash::Digest32;

const DS_LEAF: u8 = 0x00;
const DS_NODE: u8 = 0x01;

#[inline]
fn hash_with_domain(domain: u8, parts: &[&[u8]]) -> Digest32 {
    use sha2::{Digest as _, Sha256};
    let mut h = Sha256::new();
    h.update([domain]);
    for p in parts {
        h.update(p);
    }
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    o
}

/// Leaf digest. Returns `(min_ns, max_ns, hash)` with `min_ns == max_ns == ns`.
#[inline]
pub fn leaf(ns: NamespaceId, data: &[u8]) -> (NamespaceId, NamespaceId, Digest32) {
    let payload_h = hash_with_domain(DS_LEAF, &[data]);
    let digest = hash_with_domain(DS_LEAF, &[&ns, &ns, &payload_h]);
    (ns, ns, digest)
}

#[inline]
fn ns_min(a: NamespaceId, b: NamespaceId) -> NamespaceId {
    if a <= b { a } else { b }
}

#[inline]
fn effective_max(left_max: NamespaceId, right_max: NamespaceId, ignore_max_ns: bool) -> NamespaceId {
    if ignore_max_ns && right_max == PARITY_SHARE_NAMESPACE && left_max != PARITY_SHARE_NAMESPACE {
        left_max
    } else if left_max >= right_max {
        left_max
    } else {
        right_max
    }
}

/// Combine two children into a parent `(min_ns, max_ns, hash)`.
///
/// `ignore_max_ns` selects the mode described above; the crate always
/// constructs trees with it enabled, but verification needs the flag
/// threaded explicitly so a proof can declare which mode it was built under.
#[inline]
pub fn parent(
    left_min: NamespaceId,
    left_max: NamespaceId,
    left_hash: &Digest32,
    right_min: NamespaceId,
    right_max: NamespaceId,
    right_hash: &Digest32,
    ignore_max_ns: bool,
) -> (NamespaceId, NamespaceId, Digest32) {
    let min_ns = ns_min(left_min, right_min);
    let max_ns = effective_max(left_max, right_max, ignore_max_ns);

    let digest = hash_with_domain(
        DS_NODE,
        &[&left_min, &left_max, left_hash, &right_min, &right_max, right_hash],
    );
    (min_ns, max_ns, digest)
}
