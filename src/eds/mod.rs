//! 2D Reed-Solomon Extended Data Square (EDS).
//!
//! Original shares occupy the top-left `k x k` quadrant (Q0). `Extend` runs a
//! systematic RS(2k, k) code first along each of the `k` original rows
//! (producing Q1, the row-parity quadrant on columns `k..2k`), then along
//! each of the `2k` columns (producing Q2 and Q3, the column parity over
//! both Q0|Q1). The result is a `2k x 2k` square addressed row-major.

pub mod codec;

use crate::error::{Axis, Error, Result};
use crate::nmt::{Leaf, Nmt, Root};
use crate::share::{leaf_for_share, Share};
use codec::RsParams;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A `width x width` square of shares, `width` always even (`width = 2k`).
/// Missing positions (not yet recovered) are `None`.
pub struct Eds {
    width: usize,
    share_size: usize,
    cells: Vec<Option<Share>>,
}

impl Eds {
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn original_width(&self) -> usize {
        self.width / 2
    }

    #[inline]
    fn idx(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Share> {
        self.cells.get(self.idx(row, col))?.as_ref()
    }

    fn row_shards(&self, row: usize) -> Vec<Option<Vec<u8>>> {
        (0..self.width)
            .map(|c| self.get(row, c).map(|s| s.as_bytes().to_vec()))
            .collect()
    }

    fn col_shards(&self, col: usize) -> Vec<Option<Vec<u8>>> {
        (0..self.width)
            .map(|r| self.get(r, col).map(|s| s.as_bytes().to_vec()))
            .collect()
    }

    /// Whether the square position `(row, col)` lies in a parity quadrant
    /// (Q1, Q2, or Q3) rather than the original `Q0`. Purely positional —
    /// never inferred from a share's bytes, since RS parity output has no
    /// meaningful namespace prefix of its own.
    #[inline]
    pub fn is_parity_position(&self, row: usize, col: usize) -> bool {
        let k = self.original_width();
        row >= k || col >= k
    }

    fn set_row(&mut self, row: usize, shards: Vec<Vec<u8>>) -> Result<()> {
        for (c, bytes) in shards.into_iter().enumerate() {
            let idx = self.idx(row, c);
            self.cells[idx] = Some(Share::new(bytes, self.share_size)?);
        }
        Ok(())
    }

    fn set_col(&mut self, col: usize, shards: Vec<Vec<u8>>) -> Result<()> {
        for (r, bytes) in shards.into_iter().enumerate() {
            let idx = self.idx(r, col);
            if self.cells[idx].is_some() {
                continue;
            }
            self.cells[idx] = Some(Share::new(bytes, self.share_size)?);
        }
        Ok(())
    }

    /// Build the extended square from `k^2` original shares, row-major.
    pub fn extend(shares: Vec<Share>, share_size: usize) -> Result<Self> {
        let k2 = shares.len();
        let k = (k2 as f64).sqrt() as usize;
        if k == 0 || k * k != k2 || !k.is_power_of_two() {
            return Err(Error::InvalidShareSize { expected: 0, actual: k2 });
        }
        let width = 2 * k;
        let mut eds = Self { width, share_size, cells: vec![None; width * width] };

        for r in 0..k {
            let idx0 = eds.idx(r, 0);
            for c in 0..k {
                eds.cells[idx0 + c] = Some(shares[r * k + c].clone());
            }
        }

        let row_params = RsParams::for_original_width(k);
        let encoded_rows: Vec<Result<Vec<Vec<u8>>>> = run_axis(0..k, |r| {
            let mut row: Vec<Vec<u8>> = (0..k).map(|c| eds.get(r, c).unwrap().as_bytes().to_vec()).collect();
            row.extend(std::iter::repeat_with(Vec::new).take(k));
            codec::encode_in_place(row_params, &mut row)?;
            Ok(row)
        });
        for (r, row) in encoded_rows.into_iter().enumerate() {
            eds.set_row(r, row?)?;
        }

        let col_params = RsParams::for_original_width(k);
        let encoded_cols: Vec<Result<Vec<Vec<u8>>>> = run_axis(0..width, |c| {
            let mut col: Vec<Vec<u8>> = (0..k).map(|r| eds.get(r, c).unwrap().as_bytes().to_vec()).collect();
            col.extend(std::iter::repeat_with(Vec::new).take(k));
            codec::encode_in_place(col_params, &mut col)?;
            Ok(col)
        });
        for (c, col) in encoded_cols.into_iter().enumerate() {
            eds.set_col(c, col?)?;
        }

        Ok(eds)
    }

    /// Reconstruct an EDS from a flat row-major sequence where unknown
    /// positions are `None`.
    pub fn import(flat: Vec<Option<Share>>, width: usize, share_size: usize) -> Result<Self> {
        if flat.len() != width * width || width == 0 || width % 2 != 0 {
            return Err(Error::InvalidShareSize { expected: width * width, actual: flat.len() });
        }
        Ok(Self { width, share_size, cells: flat })
    }

    fn row_root(&self, row: usize) -> Root {
        let leaves: Vec<Leaf> = (0..self.width)
            .map(|c| leaf_for_share(self.get(row, c).expect("row just reconstructed"), self.is_parity_position(row, c)))
            .collect();
        Nmt::build(leaves).expect("row width is always a power of two").root()
    }

    fn col_root(&self, col: usize) -> Root {
        let leaves: Vec<Leaf> = (0..self.width)
            .map(|r| leaf_for_share(self.get(r, col).expect("column just reconstructed"), self.is_parity_position(r, col)))
            .collect();
        Nmt::build(leaves).expect("column width is always a power of two").root()
    }

    /// Iteratively repair missing shares by alternating row/column RS
    /// decoding until a fixed point; fails if some row and some column both
    /// remain unsolvable. Every row/column actually reconstructed is hashed
    /// and checked against the matching entry of `row_roots`/`col_roots`
    /// before being accepted, so a corrupted shard that happens to decode
    /// cleanly is still caught rather than silently folded in.
    pub fn repair(&mut self, row_roots: &[Root], col_roots: &[Root]) -> Result<()> {
        let k = self.original_width();
        let params = RsParams::for_original_width(k);

        loop {
            let mut progressed = false;
            let mut row_failure: Option<(usize, usize)> = None;

            for r in 0..self.width {
                let mut shards = self.row_shards(r);
                let present = shards.iter().filter(|s| s.is_some()).count();
                if present == self.width {
                    continue;
                }
                if present < k {
                    row_failure = Some((r, present));
                    continue;
                }
                codec::reconstruct(params, &mut shards)?;
                let filled: Vec<Vec<u8>> = shards.into_iter().map(|s| s.unwrap()).collect();
                self.set_row(r, filled)?;
                if self.row_root(r) != row_roots[r] {
                    return Err(Error::RootMismatch { axis: Axis::Row, index: r });
                }
                progressed = true;
            }

            let mut col_failure: Option<(usize, usize)> = None;
            for c in 0..self.width {
                let mut shards = self.col_shards(c);
                let present = shards.iter().filter(|s| s.is_some()).count();
                if present == self.width {
                    continue;
                }
                if present < k {
                    col_failure = Some((c, present));
                    continue;
                }
                codec::reconstruct(params, &mut shards)?;
                let filled: Vec<Vec<u8>> = shards.into_iter().map(|s| s.unwrap()).collect();
                self.set_col(c, filled)?;
                if self.col_root(c) != col_roots[c] {
                    return Err(Error::RootMismatch { axis: Axis::Col, index: c });
                }
                progressed = true;
            }

            if self.cells.iter().all(Option::is_some) {
                return Ok(());
            }
            if !progressed {
                if let Some((idx, have)) = row_failure {
                    return Err(Error::FailedToSolve { axis: Axis::Row, index: idx, have, need: k });
                }
                if let Some((idx, have)) = col_failure {
                    return Err(Error::FailedToSolve { axis: Axis::Col, index: idx, have, need: k });
                }
                return Err(Error::FailedToSolve { axis: Axis::Row, index: 0, have: 0, need: k });
            }
        }
    }

    /// The original `k x k` quadrant, row-major.
    pub fn extract_ods(&self) -> Result<Vec<Share>> {
        let k = self.original_width();
        let mut out = Vec::with_capacity(k * k);
        for r in 0..k {
            for c in 0..k {
                out.push(self.get(r, c).cloned().ok_or_else(|| Error::NotFound(format!("ods[{r},{c}]")))?);
            }
        }
        Ok(out)
    }

    /// The full `2k x 2k` square, row-major.
    pub fn extract_eds(&self) -> Result<Vec<Share>> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, s)| s.clone().ok_or_else(|| Error::NotFound(format!("eds[{i}]"))))
            .collect()
    }
}

/// Run `f` over `items`, CPU-parallel across the axis when the `rayon`
/// feature is enabled, sequential otherwise. Each individual call to `f`
/// (one row/column build) is itself sequential.
#[cfg(feature = "rayon")]
pub(crate) fn run_axis<I, T, F>(items: I, f: F) -> Vec<T>
where
    I: IntoIterator<Item = usize>,
    I::IntoIter: Send,
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    items.into_iter().collect::<Vec<_>>().into_par_iter().map(f).collect()
}

#[cfg(not(feature = "rayon"))]
pub(crate) fn run_axis<I, T, F>(items: I, f: F) -> Vec<T>
where
    I: IntoIterator<Item = usize>,
    F: Fn(usize) -> T,
{
    items.into_iter().map(f).collect()
}
