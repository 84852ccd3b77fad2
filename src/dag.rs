//! Share DAG Put: commit an Extended Data Square as `2 * width` row/column
//! NMTs into the block store, in one atomic batch.

use crate::cid::node_cid;
use crate::eds::{run_axis, Eds};
use crate::error::Result;
use crate::nmt::{Leaf, Nmt, Root};
use crate::share::leaf_for_share;
use crate::store::{encode_value, BlockStore};

/// Roots produced by committing an EDS; one per row, one per column, in
/// index order.
pub struct DagPutResult {
    pub row_roots: Vec<Root>,
    pub col_roots: Vec<Root>,
}

fn build_row(eds: &Eds, row: usize) -> Nmt {
    let leaves: Vec<Leaf> = (0..eds.width())
        .map(|c| leaf_for_share(eds.get(row, c).expect("committed eds has every cell"), eds.is_parity_position(row, c)))
        .collect();
    Nmt::build(leaves).expect("row width is always a power of two")
}

fn build_col(eds: &Eds, col: usize) -> Nmt {
    let leaves: Vec<Leaf> = (0..eds.width())
        .map(|r| leaf_for_share(eds.get(r, col).expect("committed eds has every cell"), eds.is_parity_position(r, col)))
        .collect();
    Nmt::build(leaves).expect("column width is always a power of two")
}

/// Build every row and column NMT over `eds`, collect every resulting node
/// (leaf and inner) into one batch, and write it to `store` atomically.
/// Returns the row and column roots.
///
/// Batch size is `2 * width * (2 * width - 1)` keys (every leaf plus every
/// inner node, `2 * width - 1` nodes per tree, across `2 * width` trees).
pub async fn put_eds(store: &dyn BlockStore, eds: &Eds) -> Result<DagPutResult> {
    let width = eds.width();

    let row_trees = run_axis(0..width, |r| build_row(eds, r));
    let col_trees = run_axis(0..width, |c| build_col(eds, c));

    let mut entries = Vec::with_capacity(2 * width * (2 * width - 1));
    let mut row_roots = Vec::with_capacity(width);
    for tree in &row_trees {
        row_roots.push(tree.root());
        for node in tree.dag_nodes() {
            let cid = node_cid(node.min_ns, node.max_ns, &node.hash)?;
            entries.push((cid, encode_value(node.min_ns, node.max_ns, node.is_leaf, &node.payload)));
        }
    }

    let mut col_roots = Vec::with_capacity(width);
    for tree in &col_trees {
        col_roots.push(tree.root());
        for node in tree.dag_nodes() {
            let cid = node_cid(node.min_ns, node.max_ns, &node.hash)?;
            entries.push((cid, encode_value(node.min_ns, node.max_ns, node.is_leaf, &node.payload)));
        }
    }

    store.put_many(entries).await?;
    Ok(DagPutResult { row_roots, col_roots })
}

/// Expected key count in the block store after a single `put_eds` call over
/// an EDS of the given extended `width`, assuming no CID collisions.
///
/// Each of the `2 * width` row/column NMTs has `2 * width - 1` nodes (leaves
/// plus inner), so the raw total is `2 * width * (2 * width - 1)`. Content
/// addressing means identical `(min_ns, max_ns, hash)` triples across
/// different trees collapse to one key; the store's actual `len()` after a
/// `put_eds` is this value *or less*, never more.
pub fn max_batch_size(width: usize) -> usize {
    2 * width * (2 * width - 1)
}
