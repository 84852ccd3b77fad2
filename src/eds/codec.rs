//! Systematic RS(2k, k) codec over GF(2^8), used identically along rows and
//! columns: the first `k` shards of an axis are data, the next `k` are
//! parity.
//!
//! Thin wrapper around `reed_solomon_erasure`; errors fold directly into
//! `crate::error::Error::Codec` rather than a separate local error type.

use crate::error::{Error, Result};
use reed_solomon_erasure::galois_8::ReedSolomon;

/// Parameters for a systematic RS(k+m, k) code over GF(2^8). The EDS always
/// uses `m == k` (the extended square doubles each axis).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RsParams {
    pub data_shards: usize,
    pub parity_shards: usize,
}

impl RsParams {
    #[inline]
    pub const fn total(&self) -> usize {
        self.data_shards + self.parity_shards
    }

    /// Systematic params for an axis of original width `k` (extended to `2k`).
    #[inline]
    pub const fn for_original_width(k: usize) -> Self {
        Self { data_shards: k, parity_shards: k }
    }
}

fn ensure_equal_len<'a, T: AsRef<[u8]> + 'a>(shards: impl IntoIterator<Item = &'a T>) -> Option<usize> {
    let mut it = shards.into_iter();
    let first = it.next()?.as_ref().len();
    for s in it {
        if s.as_ref().len() != first {
            return None;
        }
    }
    Some(first)
}

fn build_rs(params: RsParams) -> Result<ReedSolomon> {
    ReedSolomon::new(params.data_shards, params.parity_shards).map_err(Error::Codec)
}

/// Compute parity shards **in place** for one axis (row or column).
///
/// `shards` must have length `params.total()`; the first `data_shards`
/// entries are filled data, the remaining `parity_shards` entries are
/// overwritten with computed parity (resized to match if needed).
pub fn encode_in_place(params: RsParams, shards: &mut [Vec<u8>]) -> Result<()> {
    if shards.len() != params.total() {
        return Err(Error::Codec(reed_solomon_erasure::Error::TooFewShards));
    }
    let data_len = ensure_equal_len(&shards[..params.data_shards])
        .ok_or_else(|| Error::Codec(reed_solomon_erasure::Error::IncorrectShardSize))?;
    for p in &mut shards[params.data_shards..] {
        p.resize(data_len, 0);
    }
    let rs = build_rs(params)?;
    rs.encode(shards).map_err(Error::Codec)
}

/// Reconstruct missing shards **in place** for one axis, given at least
/// `data_shards` present entries.
pub fn reconstruct(params: RsParams, shards: &mut [Option<Vec<u8>>]) -> Result<()> {
    if shards.len() != params.total() {
        return Err(Error::Codec(reed_solomon_erasure::Error::TooFewShards));
    }
    let present = shards.iter().filter(|s| s.is_some()).count();
    if present < params.data_shards {
        return Err(Error::Codec(reed_solomon_erasure::Error::TooFewShardsPresent));
    }
    let rs = build_rs(params)?;
    rs.reconstruct(shards).map_err(Error::Codec)
}

/// Check that data+parity shards are mutually consistent.
pub fn verify(params: RsParams, shards: &[Vec<u8>]) -> Result<bool> {
    if shards.len() != params.total() {
        return Err(Error::Codec(reed_solomon_erasure::Error::TooFewShards));
    }
    let rs = build_rs(params)?;
    rs.verify(shards).map_err(Error::Codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TestRng {
        state: u64,
    }

    impl TestRng {
        fn new(seed: u64) -> Self {
            let s = if seed == 0 { 0x1234_5678_9ABC_DEF0 } else { seed };
            Self { state: s }
        }

        fn next_u64(&mut self) -> u64 {
            let mut x = self.state;
            x ^= x >> 12;
            x ^= x << 25;
            x ^= x >> 27;
            self.state = x;
            x.wrapping_mul(0x2545_F491_4F6C_DD1D)
        }

        fn fill_bytes(&mut self, buf: &mut [u8]) {
            let mut i = 0;
            while i + 8 <= buf.len() {
                buf[i..i + 8].copy_from_slice(&self.next_u64().to_le_bytes());
                i += 8;
            }
            if i < buf.len() {
                let tail = self.next_u64().to_le_bytes();
                let remain = buf.len() - i;
                buf[i..].copy_from_slice(&tail[..remain]);
            }
        }
    }

    fn random_axis(k: usize, len: usize, seed: u64) -> (RsParams, Vec<Vec<u8>>) {
        let params = RsParams::for_original_width(k);
        let mut rng = TestRng::new(seed);
        let mut shards = vec![vec![0u8; len]; params.total()];
        for s in &mut shards[..k] {
            rng.fill_bytes(s);
        }
        (params, shards)
    }

    #[test]
    fn encode_then_verify_roundtrip() {
        let (params, mut shards) = random_axis(8, 512, 7);
        encode_in_place(params, &mut shards).unwrap();
        assert!(verify(params, &shards).unwrap());
    }

    #[test]
    fn reconstruct_from_exactly_k_survivors() {
        let (params, mut shards) = random_axis(4, 256, 11);
        encode_in_place(params, &mut shards).unwrap();
        let original = shards.clone();

        let mut holed: Vec<Option<Vec<u8>>> = shards.into_iter().map(Some).collect();
        for idx in [0usize, 2, 5, 7] {
            holed[idx] = None;
        }
        reconstruct(params, &mut holed).unwrap();
        let recovered: Vec<Vec<u8>> = holed.into_iter().map(|s| s.unwrap()).collect();
        assert_eq!(recovered, original);
    }

    #[test]
    fn fewer_than_k_present_fails() {
        let (params, mut shards) = random_axis(4, 256, 13);
        encode_in_place(params, &mut shards).unwrap();
        let mut holed: Vec<Option<Vec<u8>>> = shards.into_iter().map(Some).collect();
        for idx in [0usize, 1, 2, 3, 4] {
            holed[idx] = None;
        }
        assert!(reconstruct(params, &mut holed).is_err());
    }
}
