//! Namespace-aware, range-pruned descent over a row or column NMT held in
//! the block store.
//!
//! Every node fetched from the store carries its own `(min_ns, max_ns)`
//! window (already computed under the "ignore-max-namespace" rule, see
//! `nmt::hashers`), so pruning a subtree is just a window check — no
//! separate "ignore" bookkeeping is needed here. Proof construction walks
//! the same bottom-up frontier `nmt::Nmt::prove_range`/`prove_inclusion`
//! use, just fetching each sibling by CID instead of indexing an in-memory
//! layer.

use crate::cid::{node_cid, Cid};
use crate::error::{Error, Result};
use crate::hash::Digest32;
use crate::nmt::types::{NamespaceId, NAMESPACE_BYTES};
use crate::nmt::{Leaf, Proof, ProofNode};
use crate::store::{decode_value, BlockStore};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Result of a namespace-filtered descent: every leaf carrying the queried
/// namespace, keyed by in-order leaf index so a retrieval failure partway
/// through still leaves earlier positions intact (partial results are
/// informational only — see callers in `protocol::server`).
#[derive(Debug, Default)]
pub struct NamespaceData {
    pub leaves: Vec<(usize, Leaf)>,
}

type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

fn split_inner_payload(payload: &[u8]) -> Option<(NamespaceId, NamespaceId, Digest32, NamespaceId, NamespaceId, Digest32)> {
    const DIGEST: usize = 2 * NAMESPACE_BYTES + 32;
    if payload.len() != 2 * DIGEST {
        return None;
    }
    let mut l_min = [0u8; NAMESPACE_BYTES];
    let mut l_max = [0u8; NAMESPACE_BYTES];
    let mut l_hash = [0u8; 32];
    let mut r_min = [0u8; NAMESPACE_BYTES];
    let mut r_max = [0u8; NAMESPACE_BYTES];
    let mut r_hash = [0u8; 32];
    l_min.copy_from_slice(&payload[0..NAMESPACE_BYTES]);
    l_max.copy_from_slice(&payload[NAMESPACE_BYTES..2 * NAMESPACE_BYTES]);
    l_hash.copy_from_slice(&payload[2 * NAMESPACE_BYTES..DIGEST]);
    r_min.copy_from_slice(&payload[DIGEST..DIGEST + NAMESPACE_BYTES]);
    r_max.copy_from_slice(&payload[DIGEST + NAMESPACE_BYTES..DIGEST + 2 * NAMESPACE_BYTES]);
    r_hash.copy_from_slice(&payload[DIGEST + 2 * NAMESPACE_BYTES..]);
    Some((l_min, l_max, l_hash, r_min, r_max, r_hash))
}

fn node_hash_of(cid: &Cid) -> Result<Digest32> {
    crate::cid::node_cid_parts(cid).map(|(_, _, h)| h)
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Canceled)
    } else {
        Ok(())
    }
}

/// Fetch one leaf by in-order `index`, given the root of a tree with
/// `total_leaves` leaves (always a power of two in this crate).
pub async fn get_share(store: &dyn BlockStore, root_cid: Cid, index: usize, total_leaves: usize, cancel: &CancellationToken) -> Result<Leaf> {
    if index >= total_leaves {
        return Err(Error::NotFound(format!("leaf index {index} out of range")));
    }
    get_share_rec(store, root_cid, 0, total_leaves, index, cancel).await
}

fn get_share_rec<'a>(store: &'a dyn BlockStore, cid: Cid, lo: usize, hi: usize, index: usize, cancel: &'a CancellationToken) -> BoxFut<'a, Result<Leaf>> {
    Box::pin(async move {
        check_cancel(cancel)?;
        let bytes = store.get(&cid).await?;
        let (min, _max, is_leaf, payload) = decode_value(&bytes)?;
        if is_leaf {
            return Ok(Leaf::new(min, payload.to_vec()));
        }
        let (l_min, l_max, l_hash, r_min, r_max, r_hash) =
            split_inner_payload(payload).ok_or_else(|| Error::MalformedProof("inner node payload has the wrong length".into()))?;
        let mid = (lo + hi) / 2;
        if index < mid {
            get_share_rec(store, node_cid(l_min, l_max, &l_hash)?, lo, mid, index, cancel).await
        } else {
            get_share_rec(store, node_cid(r_min, r_max, &r_hash)?, mid, hi, index, cancel).await
        }
    })
}

/// Descend a tree of `total_leaves` leaves rooted at `root_cid`, collecting
/// every leaf namespaced `nid`. Checks the root's window first so an
/// out-of-range query short-circuits as `NamespaceOutsideRange` without
/// touching the store.
///
/// A mid-walk retrieval failure does not discard what was already found:
/// the error is returned alongside the `NamespaceData` accumulated up to
/// that point, in-order and indexable by position, with a hole at the
/// leaf that couldn't be reached.
pub async fn collect_by_namespace(
    store: &dyn BlockStore,
    root_cid: Cid,
    nid: NamespaceId,
    total_leaves: usize,
    cancel: &CancellationToken,
) -> std::result::Result<NamespaceData, (Error, NamespaceData)> {
    let root_bytes = store.get(&root_cid).await.map_err(|e| (e, NamespaceData::default()))?;
    let (root_min, root_max, _is_leaf, _payload) = decode_value(&root_bytes).map_err(|e| (e, NamespaceData::default()))?;
    crate::nmt::verify::check_namespace_in_range(nid, root_min, root_max).map_err(|e| (e, NamespaceData::default()))?;

    let mut leaves = Vec::new();
    match descend(store, root_cid, 0, total_leaves, nid, &mut leaves, cancel).await {
        Ok(()) => Ok(NamespaceData { leaves }),
        Err(e) => Err((e, NamespaceData { leaves })),
    }
}

fn descend<'a>(
    store: &'a dyn BlockStore,
    cid: Cid,
    lo: usize,
    hi: usize,
    nid: NamespaceId,
    out: &'a mut Vec<(usize, Leaf)>,
    cancel: &'a CancellationToken,
) -> BoxFut<'a, Result<()>> {
    Box::pin(async move {
        check_cancel(cancel)?;
        let bytes = store.get(&cid).await?;
        let (min, max, is_leaf, payload) = decode_value(&bytes)?;

        if nid < min || nid > max {
            return Ok(());
        }
        if is_leaf {
            out.push((lo, Leaf::new(min, payload.to_vec())));
            return Ok(());
        }

        let (l_min, l_max, l_hash, r_min, r_max, r_hash) =
            split_inner_payload(payload).ok_or_else(|| Error::MalformedProof("inner node payload has the wrong length".into()))?;
        let mid = (lo + hi) / 2;
        descend(store, node_cid(l_min, l_max, &l_hash)?, lo, mid, nid, out, cancel).await?;
        descend(store, node_cid(r_min, r_max, &r_hash)?, mid, hi, nid, out, cancel).await?;
        Ok(())
    })
}

/// Fetch the `(min_ns, max_ns, hash)` of the unique node spanning the exact
/// leaf-index window `[target_lo, target_hi)`, descending from the root.
fn node_window<'a>(
    store: &'a dyn BlockStore,
    cid: Cid,
    lo: usize,
    hi: usize,
    target_lo: usize,
    target_hi: usize,
    cancel: &'a CancellationToken,
) -> BoxFut<'a, Result<(NamespaceId, NamespaceId, Digest32)>> {
    Box::pin(async move {
        check_cancel(cancel)?;
        if lo == target_lo && hi == target_hi {
            let bytes = store.get(&cid).await?;
            let (min, max, _is_leaf, _payload) = decode_value(&bytes)?;
            return Ok((min, max, node_hash_of(&cid)?));
        }
        let bytes = store.get(&cid).await?;
        let (_min, _max, is_leaf, payload) = decode_value(&bytes)?;
        if is_leaf {
            return Err(Error::MalformedProof("expected inner node while locating proof sibling".into()));
        }
        let (l_min, l_max, l_hash, r_min, r_max, r_hash) =
            split_inner_payload(payload).ok_or_else(|| Error::MalformedProof("inner node payload has the wrong length".into()))?;
        let mid = (lo + hi) / 2;
        if target_hi <= mid {
            node_window(store, node_cid(l_min, l_max, &l_hash)?, lo, mid, target_lo, target_hi, cancel).await
        } else {
            node_window(store, node_cid(r_min, r_max, &r_hash)?, mid, hi, target_lo, target_hi, cancel).await
        }
    })
}

/// Build an inclusion proof for the contiguous leaf range `[start, end)`,
/// mirroring `Nmt::prove_range`'s frontier walk but fetching each sibling
/// from the store instead of an in-memory layer.
pub async fn prove_range(store: &dyn BlockStore, root_cid: Cid, total_leaves: usize, start: usize, end: usize, cancel: &CancellationToken) -> Result<Proof> {
    if start >= end || end > total_leaves {
        return Err(Error::MalformedProof(format!("invalid range {start}..{end} for {total_leaves} leaves")));
    }
    let mut path = Vec::new();
    let (mut lo, mut hi) = (start, end);
    let mut span = 1usize;
    while span < total_leaves {
        if lo % 2 == 1 {
            let (min, max, hash) = node_window(store, root_cid, 0, total_leaves, (lo - 1) * span, lo * span, cancel).await?;
            path.push(ProofNode { is_left: true, min_ns: min, max_ns: max, hash });
        }
        if hi % 2 == 1 {
            let (min, max, hash) = node_window(store, root_cid, 0, total_leaves, hi * span, (hi + 1) * span, cancel).await?;
            path.push(ProofNode { is_left: false, min_ns: min, max_ns: max, hash });
        }
        lo /= 2;
        hi = (hi + 1) / 2;
        span *= 2;
    }
    Ok(Proof { start, end, path, is_max_namespace_id_ignored: true })
}

/// Build an inclusion proof for a single leaf, mirroring `Nmt::prove_inclusion`.
pub async fn prove_inclusion(store: &dyn BlockStore, root_cid: Cid, total_leaves: usize, index: usize, cancel: &CancellationToken) -> Result<(Leaf, Proof)> {
    if index >= total_leaves {
        return Err(Error::NotFound(format!("leaf index {index} out of range")));
    }
    prove_inclusion_rec(store, root_cid, 0, total_leaves, index, cancel).await
}

fn prove_inclusion_rec<'a>(store: &'a dyn BlockStore, cid: Cid, lo: usize, hi: usize, index: usize, cancel: &'a CancellationToken) -> BoxFut<'a, Result<(Leaf, Proof)>> {
    Box::pin(async move {
        check_cancel(cancel)?;
        let bytes = store.get(&cid).await?;
        let (min, _max, is_leaf, payload) = decode_value(&bytes)?;
        if is_leaf {
            return Ok((Leaf::new(min, payload.to_vec()), Proof { start: index, end: index + 1, path: Vec::new(), is_max_namespace_id_ignored: true }));
        }
        let (l_min, l_max, l_hash, r_min, r_max, r_hash) =
            split_inner_payload(payload).ok_or_else(|| Error::MalformedProof("inner node payload has the wrong length".into()))?;
        let mid = (lo + hi) / 2;
        if index < mid {
            let (leaf, mut proof) = prove_inclusion_rec(store, node_cid(l_min, l_max, &l_hash)?, lo, mid, index, cancel).await?;
            proof.path.push(ProofNode { is_left: false, min_ns: r_min, max_ns: r_max, hash: r_hash });
            Ok((leaf, proof))
        } else {
            let (leaf, mut proof) = prove_inclusion_rec(store, node_cid(r_min, r_max, &r_hash)?, mid, hi, index, cancel).await?;
            proof.path.push(ProofNode { is_left: true, min_ns: l_min, max_ns: l_max, hash: l_hash });
            Ok((leaf, proof))
        }
    })
}

/// The two leaf indices bracketing where `nid` would sit, found by
/// descending until a node's children straddle `nid` without either
/// containing it.
async fn locate_gap(store: &dyn BlockStore, root_cid: Cid, total_leaves: usize, nid: NamespaceId, cancel: &CancellationToken) -> Result<(Option<usize>, Option<usize>)> {
    locate_gap_rec(store, root_cid, 0, total_leaves, nid, cancel).await
}

fn locate_gap_rec<'a>(
    store: &'a dyn BlockStore,
    cid: Cid,
    lo: usize,
    hi: usize,
    nid: NamespaceId,
    cancel: &'a CancellationToken,
) -> BoxFut<'a, Result<(Option<usize>, Option<usize>)>> {
    Box::pin(async move {
        check_cancel(cancel)?;
        let bytes = store.get(&cid).await?;
        let (min, _max, is_leaf, payload) = decode_value(&bytes)?;
        if is_leaf {
            return if nid < min { Ok((None, Some(lo))) } else { Ok((Some(lo), None)) };
        }
        let (l_min, l_max, l_hash, r_min, r_max, r_hash) =
            split_inner_payload(payload).ok_or_else(|| Error::MalformedProof("inner node payload has the wrong length".into()))?;
        let mid = (lo + hi) / 2;
        if nid >= l_min && nid <= l_max {
            locate_gap_rec(store, node_cid(l_min, l_max, &l_hash)?, lo, mid, nid, cancel).await
        } else if nid >= r_min && nid <= r_max {
            locate_gap_rec(store, node_cid(r_min, r_max, &r_hash)?, mid, hi, nid, cancel).await
        } else if nid < l_min {
            Ok((None, Some(lo)))
        } else if nid > r_max {
            Ok((Some(hi - 1), None))
        } else {
            // nid sits strictly between the two children's ranges.
            Ok((Some(mid - 1), Some(mid)))
        }
    })
}

/// An absence proof: inclusion proofs for the leaves immediately bracketing
/// where the queried namespace would sit, if it were present.
pub struct AbsenceProof {
    pub left: Option<(Leaf, Proof)>,
    pub right: Option<(Leaf, Proof)>,
}

/// Build an absence proof for `nid`, which the caller has already confirmed
/// is within the root's namespace window but carried by no leaf.
pub async fn prove_absence(store: &dyn BlockStore, root_cid: Cid, total_leaves: usize, nid: NamespaceId, cancel: &CancellationToken) -> Result<AbsenceProof> {
    let (left_idx, right_idx) = locate_gap(store, root_cid, total_leaves, nid, cancel).await?;
    let left = match left_idx {
        Some(i) => Some(prove_inclusion(store, root_cid, total_leaves, i, cancel).await?),
        None => None,
    };
    let right = match right_idx {
        Some(i) => Some(prove_inclusion(store, root_cid, total_leaves, i, cancel).await?),
        None => None,
    };
    Ok(AbsenceProof { left, right })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmt::types::ns_from_u64;
    use crate::nmt::verify;
    use crate::nmt::Nmt;
    use crate::store::{encode_value, MemoryBlockStore};

    async fn seed_tree(store: &MemoryBlockStore, leaves: Vec<Leaf>) -> (Cid, crate::nmt::Root) {
        let tree = Nmt::build(leaves).unwrap();
        let mut entries = Vec::new();
        for node in tree.dag_nodes() {
            let cid = node_cid(node.min_ns, node.max_ns, &node.hash).unwrap();
            entries.push((cid, encode_value(node.min_ns, node.max_ns, node.is_leaf, &node.payload)));
        }
        store.put_many(entries).await.unwrap();
        let root = tree.root();
        (node_cid(root.min_ns, root.max_ns, &root.hash).unwrap(), root)
    }

    fn mk_leaf(ns: u64, data: &'static [u8]) -> Leaf {
        Leaf::new(ns_from_u64(ns), data.to_vec())
    }

    #[tokio::test]
    async fn get_share_returns_expected_leaf() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c"), mk_leaf(4, b"d")];
        let (root, _) = seed_tree(&store, leaves.clone()).await;

        let token = CancellationToken::new();
        for (i, leaf) in leaves.iter().enumerate() {
            let got = get_share(&store, root, i, leaves.len(), &token).await.unwrap();
            assert_eq!(&got, leaf);
        }
    }

    #[tokio::test]
    async fn collect_by_namespace_finds_every_matching_leaf() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(5, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let (root, _) = seed_tree(&store, leaves.clone()).await;

        let token = CancellationToken::new();
        let data = collect_by_namespace(&store, root, ns_from_u64(5), leaves.len(), &token).await.unwrap();

        assert_eq!(data.leaves.len(), 2);
        assert_eq!(data.leaves[0].0, 1);
        assert_eq!(data.leaves[1].0, 2);
    }

    #[tokio::test]
    async fn collect_by_namespace_outside_range_errors() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(10, b"a"), mk_leaf(20, b"b"), mk_leaf(30, b"c"), mk_leaf(40, b"d")];
        let (root, _) = seed_tree(&store, leaves.clone()).await;

        let token = CancellationToken::new();
        let (err, partial) = collect_by_namespace(&store, root, ns_from_u64(1), leaves.len(), &token).await.unwrap_err();
        assert!(matches!(err, Error::NamespaceOutsideRange(_)));
        assert!(partial.leaves.is_empty());
    }

    #[tokio::test]
    async fn partial_fetch_preserves_leaves_collected_before_the_hole() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(1, b"b"), mk_leaf(1, b"c"), mk_leaf(1, b"d")];
        let tree = Nmt::build(leaves.clone()).unwrap();

        let mut entries = Vec::new();
        for node in tree.dag_nodes() {
            let cid = node_cid(node.min_ns, node.max_ns, &node.hash).unwrap();
            entries.push((cid, encode_value(node.min_ns, node.max_ns, node.is_leaf, &node.payload)));
        }
        store.put_many(entries).await.unwrap();
        let root = node_cid(tree.root().min_ns, tree.root().max_ns, &tree.root().hash).unwrap();

        // dag_nodes order: leaves[0..4), then inner layer (2 nodes), then root.
        // Delete the inner node covering the right half, [2, 4).
        let nodes = tree.dag_nodes();
        let right_inner = &nodes[5];
        let right_cid = node_cid(right_inner.min_ns, right_inner.max_ns, &right_inner.hash).unwrap();
        store.delete(&right_cid).await.unwrap();

        let token = CancellationToken::new();
        let (err, partial) = collect_by_namespace(&store, root, ns_from_u64(1), leaves.len(), &token).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(partial.leaves.len(), 2);
        assert_eq!(partial.leaves[0], (0, leaves[0].clone()));
        assert_eq!(partial.leaves[1], (1, leaves[1].clone()));
    }

    #[tokio::test]
    async fn prove_range_verifies_against_root() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(5, b"b"), mk_leaf(5, b"c"), mk_leaf(5, b"d"), mk_leaf(9, b"e"), mk_leaf(9, b"f"), mk_leaf(12, b"g"), mk_leaf(20, b"h")];
        let (root_cid, root) = seed_tree(&store, leaves.clone()).await;

        let token = CancellationToken::new();
        let data = collect_by_namespace(&store, root_cid, ns_from_u64(5), leaves.len(), &token).await.unwrap();
        let start = data.leaves.first().unwrap().0;
        let end = data.leaves.last().unwrap().0 + 1;

        let proof = prove_range(&store, root_cid, leaves.len(), start, end, &token).await.unwrap();
        let range_leaves: Vec<Leaf> = data.leaves.into_iter().map(|(_, l)| l).collect();
        verify::verify_range(&root.hash, root.min_ns, root.max_ns, &range_leaves, &proof).unwrap();
    }

    #[tokio::test]
    async fn prove_inclusion_matches_direct_tree_proof() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(3, b"c"), mk_leaf(4, b"d")];
        let tree = Nmt::build(leaves.clone()).unwrap();
        let direct_proof = tree.prove_inclusion(2).unwrap();

        let (root_cid, root) = seed_tree(&store, leaves.clone()).await;
        let token = CancellationToken::new();
        let (leaf, proof) = prove_inclusion(&store, root_cid, leaves.len(), 2, &token).await.unwrap();

        assert_eq!(leaf, leaves[2]);
        assert_eq!(proof, direct_proof);
        verify::verify_inclusion(&root.hash, root.min_ns, root.max_ns, &leaf, &proof).unwrap();
    }

    #[tokio::test]
    async fn prove_absence_verifies_the_gap() {
        let store = MemoryBlockStore::new();
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(2, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let (root_cid, root) = seed_tree(&store, leaves.clone()).await;

        let token = CancellationToken::new();
        let nid = ns_from_u64(3);
        verify::check_namespace_in_range(nid, root.min_ns, root.max_ns).unwrap();

        let got = collect_by_namespace(&store, root_cid, nid, leaves.len(), &token).await.unwrap();
        assert!(got.leaves.is_empty());

        let absence = prove_absence(&store, root_cid, leaves.len(), nid, &token).await.unwrap();
        let left = absence.left.as_ref().map(|(l, p)| (l, p));
        let right = absence.right.as_ref().map(|(l, p)| (l, p));
        let err = verify::verify_absence(&root.hash, root.min_ns, root.max_ns, nid, left, right).unwrap_err();
        assert!(matches!(err, Error::NamespaceNotFound(_)));
    }
}
