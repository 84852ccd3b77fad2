//! Iterative, bottom-up Namespaced Merkle Tree construction.
//!
//! Every tree built by this crate has a power-of-two leaf count: EDS rows
//! and columns are always a power of two wide (§4.4), so unlike a general
//! NMT there is no odd-tail carry to handle.

use super::hashers;
use super::types::{Leaf, NamespaceId};
use crate::hash::Digest32;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Node {
    pub min: NamespaceId,
    pub max: NamespaceId,
    pub hash: Digest32,
}

impl Node {
    #[inline]
    pub fn new(min: NamespaceId, max: NamespaceId, hash: Digest32) -> Self {
        Self { min, max, hash }
    }
}

#[inline]
pub(crate) fn hash_leaves(leaves: &[Leaf]) -> Vec<Node> {
    #[cfg(feature = "rayon")]
    {
        leaves
            .par_iter()
            .map(|lf| {
                let (min, max, h) = hashers::leaf(lf.ns, &lf.data);
                Node::new(min, max, h)
            })
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        leaves
            .iter()
            .map(|lf| {
                let (min, max, h) = hashers::leaf(lf.ns, &lf.data);
                Node::new(min, max, h)
            })
            .collect()
    }
}

#[inline]
fn next_layer(curr: &[Node], ignore_max_ns: bool) -> Vec<Node> {
    debug_assert!(curr.len() % 2 == 0 || curr.len() == 1);
    let mut out = Vec::with_capacity(curr.len() / 2);
    let mut i = 0;
    while i + 1 < curr.len() {
        let l = curr[i];
        let r = curr[i + 1];
        let (min, max, h) = hashers::parent(l.min, l.max, &l.hash, r.min, r.max, &r.hash, ignore_max_ns);
        out.push(Node::new(min, max, h));
        i += 2;
    }
    out
}

/// Build all layers bottom-up. `layers[0]` is the hashed leaf layer,
/// `layers.last()` is the root layer (length 1). Empty input yields `vec![]`.
pub(crate) fn build_layers(leaves: &[Leaf], ignore_max_ns: bool) -> Vec<Vec<Node>> {
    let mut layers = Vec::new();
    let curr = hash_leaves(leaves);
    if curr.is_empty() {
        return layers;
    }
    layers.push(curr);

    loop {
        let top = layers.last().unwrap();
        if top.len() == 1 {
            break;
        }
        let next = next_layer(top, ignore_max_ns);
        layers.push(next);
    }
    layers
}

#[inline]
pub(crate) fn root_from_layers(layers: &[Vec<Node>]) -> Option<Node> {
    layers.last().and_then(|top| top.first().copied())
}

/// Sibling along a path. `left == true` means the sibling sits to the left
/// of the target (the target is the right child at that level).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Sibling {
    pub left: bool,
    pub node: Node,
}

/// Compute the path of siblings for `index` from `layers[0]` to the root.
pub(crate) fn path_for_index(index: usize, layers: &[Vec<Node>]) -> Option<Vec<Sibling>> {
    if layers.is_empty() || layers[0].is_empty() || index >= layers[0].len() {
        return None;
    }
    let mut idx = index;
    let mut out = Vec::new();

    for layer in layers.iter().take(layers.len().saturating_sub(1)) {
        let sib_idx = if idx % 2 == 0 { idx + 1 } else { idx - 1 };
        out.push(Sibling {
            left: idx % 2 == 1,
            node: layer[sib_idx],
        });
        idx /= 2;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::ns_from_u64;

    fn mk_leaf(ns_u64: u64, data: &'static [u8]) -> Leaf {
        Leaf::new(ns_from_u64(ns_u64), data.to_vec())
    }

    #[test]
    fn empty_returns_no_layers() {
        let layers = build_layers(&[], true);
        assert!(layers.is_empty());
    }

    #[test]
    fn single_leaf_root_is_leaf_digest() {
        let leaves = vec![mk_leaf(7, b"hello")];
        let layers = build_layers(&leaves, true);
        let root = root_from_layers(&layers).unwrap();
        assert_eq!(root.min, ns_from_u64(7));
        assert_eq!(root.max, ns_from_u64(7));
    }

    #[test]
    fn deterministic_root_four_leaves() {
        let leaves = vec![
            mk_leaf(1, b"a"),
            mk_leaf(3, b"b"),
            mk_leaf(5, b"c"),
            mk_leaf(9, b"d"),
        ];
        let l1 = build_layers(&leaves, true);
        let l2 = build_layers(&leaves, true);
        let r1 = root_from_layers(&l1).unwrap();
        let r2 = root_from_layers(&l2).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.min, ns_from_u64(1));
        assert_eq!(r1.max, ns_from_u64(9));
    }

    #[test]
    fn path_has_expected_length() {
        let leaves = vec![
            mk_leaf(1, b"a"),
            mk_leaf(2, b"b"),
            mk_leaf(3, b"c"),
            mk_leaf(4, b"d"),
        ];
        let layers = build_layers(&leaves, true);
        let path = path_for_index(3, &layers).expect("path");
        assert_eq!(path.len(), 2);
    }
}
