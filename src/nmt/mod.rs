//! Namespaced Merkle Tree (NMT).
//!
//! Builds a tree over `(namespace, payload)` leaves, committing to both the
//! payload and the lexicographic namespace range `[min_ns, max_ns]` covered
//! by every subtree, so a verifier can reject or accept a namespace's
//! presence without inspecting the whole tree. Always built with
//! "ignore-max-namespace" inner hashing (see `hashers`) so mixing in parity
//! shares from the erasure coder does not poison namespace-range pruning.

mod hashers;
mod parallel;
mod tree;
pub mod types;
pub mod verify;

pub use types::{
    ns_from_u64, ns_try_from_slice, Leaf, NamespaceId, Proof, ProofNode, NAMESPACE_BYTES, PARITY_SHARE_NAMESPACE,
};

use crate::hash::Digest32;

/// Root commitment of an NMT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Root {
    pub min_ns: NamespaceId,
    pub max_ns: NamespaceId,
    pub hash: Digest32,
}

/// One node of a tree's content-addressed DAG, ready to be keyed by its CID
/// and written to the block store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DagNode {
    pub min_ns: NamespaceId,
    pub max_ns: NamespaceId,
    pub hash: Digest32,
    pub is_leaf: bool,
    pub payload: Vec<u8>,
}

/// A fully built tree, retaining every layer so proofs can be produced for
/// any leaf index without rebuilding.
pub struct Nmt {
    leaves: Vec<Leaf>,
    layers: Vec<Vec<tree::Node>>,
}

impl Nmt {
    /// Build a tree over `leaves`. `leaves.len()` must be a power of two
    /// (enforced by every caller in this crate: EDS rows/columns are always
    /// power-of-two wide).
    pub fn build(leaves: Vec<Leaf>) -> Option<Self> {
        if leaves.is_empty() || !leaves.len().is_power_of_two() {
            return None;
        }
        let layers = tree::build_layers(&leaves, true);
        Some(Self { leaves, layers })
    }

    pub fn root(&self) -> Root {
        let n = tree::root_from_layers(&self.layers).expect("non-empty tree always has a root");
        Root { min_ns: n.min, max_ns: n.max, hash: n.hash }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf(&self, index: usize) -> Option<&Leaf> {
        self.leaves.get(index)
    }

    /// Every node in the tree (leaves, then inner nodes bottom-up), with the
    /// serialized payload a block store would hold for it: a leaf's tagged
    /// bytes, or an inner node's `left_digest || right_digest` where
    /// `digest = min_ns || max_ns || hash`.
    pub fn dag_nodes(&self) -> Vec<DagNode> {
        let mut out = Vec::with_capacity(2 * self.leaves.len());
        for leaf in &self.leaves {
            let (min, max, hash) = hashers::leaf(leaf.ns, &leaf.data);
            out.push(DagNode { min_ns: min, max_ns: max, hash, is_leaf: true, payload: leaf.data.clone() });
        }
        for layer_idx in 1..self.layers.len() {
            let parent_layer = &self.layers[layer_idx];
            let child_layer = &self.layers[layer_idx - 1];
            for (i, parent) in parent_layer.iter().enumerate() {
                let l = child_layer[2 * i];
                let r = child_layer[2 * i + 1];
                let mut payload = Vec::with_capacity(2 * (2 * NAMESPACE_BYTES + 32));
                payload.extend_from_slice(&l.min);
                payload.extend_from_slice(&l.max);
                payload.extend_from_slice(&l.hash);
                payload.extend_from_slice(&r.min);
                payload.extend_from_slice(&r.max);
                payload.extend_from_slice(&r.hash);
                out.push(DagNode { min_ns: parent.min, max_ns: parent.max, hash: parent.hash, is_leaf: false, payload });
            }
        }
        out
    }

    /// Produce an inclusion proof for the leaf at `index`.
    pub fn prove_inclusion(&self, index: usize) -> Option<Proof> {
        let sibs = tree::path_for_index(index, &self.layers)?;
        Some(Proof {
            start: index,
            end: index + 1,
            path: sibs
                .into_iter()
                .map(|s| ProofNode { is_left: s.left, min_ns: s.node.min, max_ns: s.node.max, hash: s.node.hash })
                .collect(),
            is_max_namespace_id_ignored: true,
        })
    }

    /// Locate the namespace `ns` among the tree's leaves.
    ///
    /// Returns `Ok(range)` of contiguous leaf indices carrying `ns`, after
    /// first checking the root's window so an out-of-range query is
    /// rejected without a linear scan.
    pub fn find_namespace_range(&self, ns: NamespaceId) -> crate::error::Result<std::ops::Range<usize>> {
        let root = self.root();
        verify::check_namespace_in_range(ns, root.min_ns, root.max_ns)?;

        let start = self.leaves.partition_point(|lf| lf.ns < ns);
        let end = self.leaves[start..].partition_point(|lf| lf.ns <= ns) + start;
        if start == end {
            return Err(crate::error::Error::NamespaceNotFound(ns));
        }
        Ok(start..end)
    }

    /// Produce an inclusion proof covering the contiguous range `start..end`.
    pub fn prove_range(&self, start: usize, end: usize) -> Option<Proof> {
        if start >= end || end > self.leaves.len() {
            return None;
        }
        // Frontier siblings: walk both edges up together, collecting any
        // sibling whose subtree falls entirely outside [start, end).
        let mut path = Vec::new();
        let (mut lo, mut hi) = (start, end);
        for layer in self.layers.iter().take(self.layers.len().saturating_sub(1)) {
            if lo % 2 == 1 {
                let sib = layer[lo - 1];
                path.push(ProofNode { is_left: true, min_ns: sib.min, max_ns: sib.max, hash: sib.hash });
            }
            if hi % 2 == 1 {
                let sib = layer[hi];
                path.push(ProofNode { is_left: false, min_ns: sib.min, max_ns: sib.max, hash: sib.hash });
            }
            lo /= 2;
            hi = (hi + 1) / 2;
        }
        Some(Proof { start, end, path, is_max_namespace_id_ignored: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_leaf(ns: u64, data: &'static [u8]) -> Leaf {
        Leaf::new(ns_from_u64(ns), data.to_vec())
    }

    #[test]
    fn build_rejects_non_pow2() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c")];
        assert!(Nmt::build(leaves).is_none());
    }

    #[test]
    fn inclusion_proof_roundtrip() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c"), mk_leaf(4, b"d")];
        let tree = Nmt::build(leaves.clone()).unwrap();
        let root = tree.root();
        for i in 0..leaves.len() {
            let proof = tree.prove_inclusion(i).unwrap();
            verify::verify_inclusion(&root.hash, root.min_ns, root.max_ns, &leaves[i], &proof).unwrap();
        }
    }

    #[test]
    fn find_namespace_range_locates_contiguous_run() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(5, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let tree = Nmt::build(leaves).unwrap();
        let range = tree.find_namespace_range(ns_from_u64(5)).unwrap();
        assert_eq!(range, 1..3);
    }

    #[test]
    fn dag_nodes_count_matches_leaves_plus_inner() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c"), mk_leaf(4, b"d")];
        let tree = Nmt::build(leaves.clone()).unwrap();
        let nodes = tree.dag_nodes();
        // 4 leaves + 2 inner + 1 root = 2*4 - 1
        assert_eq!(nodes.len(), 2 * leaves.len() - 1);
        assert_eq!(nodes.last().unwrap().hash, tree.root().hash);
    }

    #[test]
    fn find_namespace_outside_range_errors() {
        let leaves = vec![mk_leaf(10, b"a"), mk_leaf(20, b"b"), mk_leaf(30, b"c"), mk_leaf(40, b"d")];
        let tree = Nmt::build(leaves).unwrap();
        let err = tree.find_namespace_range(ns_from_u64(1)).unwrap_err();
        assert!(matches!(err, crate::error::Error::NamespaceOutsideRange(_)));
    }

    #[test]
    fn find_namespace_not_found_inside_range() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(8, b"c"), mk_leaf(9, b"d")];
        let tree = Nmt::build(leaves).unwrap();
        let err = tree.find_namespace_range(ns_from_u64(5)).unwrap_err();
        assert!(matches!(err, crate::error::Error::NamespaceNotFound(_)));
    }

    #[test]
    fn range_proof_roundtrip() {
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(5, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let tree = Nmt::build(leaves.clone()).unwrap();
        let root = tree.root();
        let range = tree.find_namespace_range(ns_from_u64(5)).unwrap();
        let proof = tree.prove_range(range.start, range.end).unwrap();
        verify::verify_range(&root.hash, root.min_ns, root.max_ns, &leaves[range], &proof).unwrap();
    }
}
