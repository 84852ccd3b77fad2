//! Proof verification for the Namespaced Merkle Tree.
//!
//! Distinguishes the two ways a namespace can be absent from a tree:
//! - [`Error::NamespaceOutsideRange`] — the namespace falls outside the
//!   root's `[min_ns, max_ns]` window; no leaf could possibly carry it.
//! - [`Error::NamespaceNotFound`] — the namespace falls inside the root's
//!   window, but the supplied absence proof shows no leaf actually carries
//!   it (the two namespaces bracketing where it would sit are adjacent).

use super::hashers;
use super::types::{Leaf, NamespaceId, Proof};
use crate::error::{Error, Result};
use crate::hash::Digest32;

#[inline]
fn ns_between(x: NamespaceId, lo: NamespaceId, hi: NamespaceId) -> bool {
    lo <= x && x <= hi
}

fn recompute_root(
    mut cur_min: NamespaceId,
    mut cur_max: NamespaceId,
    mut cur_hash: Digest32,
    proof: &Proof,
) -> (NamespaceId, NamespaceId, Digest32) {
    for step in &proof.path {
        let (min, max, h) = if step.is_left {
            hashers::parent(
                step.min_ns, step.max_ns, &step.hash,
                cur_min, cur_max, &cur_hash,
                proof.is_max_namespace_id_ignored,
            )
        } else {
            hashers::parent(
                cur_min, cur_max, &cur_hash,
                step.min_ns, step.max_ns, &step.hash,
                proof.is_max_namespace_id_ignored,
            )
        };
        cur_min = min;
        cur_max = max;
        cur_hash = h;
    }
    (cur_min, cur_max, cur_hash)
}

fn fold_contiguous_leaves(leaves: &[Leaf], ignore_max_ns: bool) -> (NamespaceId, NamespaceId, Digest32) {
    let mut layer: Vec<(NamespaceId, NamespaceId, Digest32)> =
        leaves.iter().map(|lf| hashers::leaf(lf.ns, &lf.data)).collect();

    while layer.len() > 1 {
        let mut next = Vec::with_capacity(layer.len() / 2);
        let mut i = 0;
        while i + 1 < layer.len() {
            let (lmin, lmax, lhash) = layer[i];
            let (rmin, rmax, rhash) = layer[i + 1];
            next.push(hashers::parent(lmin, lmax, &lhash, rmin, rmax, &rhash, ignore_max_ns));
            i += 2;
        }
        layer = next;
    }
    layer[0]
}

/// Verify an inclusion proof for a single leaf against an expected root.
pub fn verify_inclusion(
    expected_root_hash: &Digest32,
    expected_root_min: NamespaceId,
    expected_root_max: NamespaceId,
    leaf: &Leaf,
    proof: &Proof,
) -> Result<()> {
    let (lmin, lmax, lhash) = hashers::leaf(leaf.ns, &leaf.data);
    let (min, max, h) = recompute_root(lmin, lmax, lhash, proof);
    if &h != expected_root_hash || min != expected_root_min || max != expected_root_max {
        return Err(Error::MalformedProof("inclusion proof does not recompute the root".into()));
    }
    Ok(())
}

/// Verify a range (contiguous multi-leaf) inclusion proof.
pub fn verify_range(
    expected_root_hash: &Digest32,
    expected_root_min: NamespaceId,
    expected_root_max: NamespaceId,
    leaves: &[Leaf],
    proof: &Proof,
) -> Result<()> {
    if leaves.is_empty() {
        return Err(Error::MalformedProof("range proof covers zero leaves".into()));
    }
    let (bmin, bmax, bhash) = fold_contiguous_leaves(leaves, proof.is_max_namespace_id_ignored);
    let (min, max, h) = recompute_root(bmin, bmax, bhash, proof);
    if &h != expected_root_hash || min != expected_root_min || max != expected_root_max {
        return Err(Error::MalformedProof("range proof does not recompute the root".into()));
    }
    Ok(())
}

/// Check whether `ns` could possibly be present under a root with the given
/// namespace window, before attempting to walk any proof.
///
/// Returns `Err(NamespaceOutsideRange)` when the root's window excludes
/// `ns` entirely. Callers should short-circuit on this without requesting
/// an absence proof.
pub fn check_namespace_in_range(ns: NamespaceId, root_min: NamespaceId, root_max: NamespaceId) -> Result<()> {
    if !ns_between(ns, root_min, root_max) {
        return Err(Error::NamespaceOutsideRange(ns));
    }
    Ok(())
}

/// Verify an absence proof: `ns` is within the root's namespace window, but
/// the two leaves bracketing where it would sit (if any) prove no leaf
/// actually carries it.
///
/// `left` and `right` are the leaves immediately surrounding the gap where
/// `ns` would have appeared (either may be absent at the square's edges).
/// Each carries its own inclusion proof; this function checks both proofs
/// against the shared root and that no namespace lies strictly between
/// `left.ns` and `right.ns` that could equal `ns`.
pub fn verify_absence(
    expected_root_hash: &Digest32,
    expected_root_min: NamespaceId,
    expected_root_max: NamespaceId,
    ns: NamespaceId,
    left: Option<(&Leaf, &Proof)>,
    right: Option<(&Leaf, &Proof)>,
) -> Result<()> {
    check_namespace_in_range(ns, expected_root_min, expected_root_max)?;

    match (left, right) {
        (None, None) => Err(Error::MalformedProof("absence proof supplies no bracketing leaves".into())),
        (Some((lleaf, lproof)), maybe_right) => {
            verify_inclusion(expected_root_hash, expected_root_min, expected_root_max, lleaf, lproof)?;
            if lleaf.ns >= ns {
                return Err(Error::MalformedProof("left bracket does not precede namespace".into()));
            }
            if let Some((rleaf, rproof)) = maybe_right {
                verify_inclusion(expected_root_hash, expected_root_min, expected_root_max, rleaf, rproof)?;
                if rleaf.ns <= ns {
                    return Err(Error::MalformedProof("right bracket does not follow namespace".into()));
                }
            }
            Err(Error::NamespaceNotFound(ns))
        }
        (None, Some((rleaf, rproof))) => {
            verify_inclusion(expected_root_hash, expected_root_min, expected_root_max, rleaf, rproof)?;
            if rleaf.ns <= ns {
                return Err(Error::MalformedProof("right bracket does not follow namespace".into()));
            }
            Err(Error::NamespaceNotFound(ns))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::tree;
    use super::super::types::{ns_from_u64, ProofNode};

    fn mk_leaf(ns_u64: u64, data: &'static [u8]) -> Leaf {
        Leaf::new(ns_from_u64(ns_u64), data.to_vec())
    }

    fn proof_for(layers: &[Vec<tree::Node>], idx: usize, ignore_max_ns: bool) -> Proof {
        let sibs = tree::path_for_index(idx, layers).unwrap();
        Proof {
            start: idx,
            end: idx + 1,
            path: sibs
                .into_iter()
                .map(|s| ProofNode { is_left: s.left, min_ns: s.node.min, max_ns: s.node.max, hash: s.node.hash })
                .collect(),
            is_max_namespace_id_ignored: ignore_max_ns,
        }
    }

    #[test]
    fn inclusion_roundtrip() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c"), mk_leaf(4, b"d")];
        let layers = tree::build_layers(&leaves, true);
        let root = tree::root_from_layers(&layers).unwrap();
        let proof = proof_for(&layers, 2, true);

        verify_inclusion(&root.hash, root.min, root.max, &leaves[2], &proof).unwrap();

        let mut bad = proof.clone();
        bad.path[0].hash[0] ^= 1;
        assert!(verify_inclusion(&root.hash, root.min, root.max, &leaves[2], &bad).is_err());
    }

    #[test]
    fn outside_range_short_circuits() {
        let leaves = vec![mk_leaf(10, b"a"), mk_leaf(20, b"b")];
        let layers = tree::build_layers(&leaves, true);
        let root = tree::root_from_layers(&layers).unwrap();
        let err = check_namespace_in_range(ns_from_u64(1), root.min, root.max).unwrap_err();
        assert!(matches!(err, Error::NamespaceOutsideRange(_)));
    }

    #[test]
    fn absence_between_brackets() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let layers = tree::build_layers(&leaves, true);
        let root = tree::root_from_layers(&layers).unwrap();

        let left_proof = proof_for(&layers, 1, true);
        let right_proof = proof_for(&layers, 2, true);

        let err = verify_absence(
            &root.hash, root.min, root.max,
            ns_from_u64(3),
            Some((&leaves[1], &left_proof)),
            Some((&leaves[2], &right_proof)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NamespaceNotFound(_)));
    }
}
