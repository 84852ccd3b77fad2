//! SHA-256 helpers backed by the `sha2` crate.
//!
//! This is the consensus-critical hash used by the NMT (`nmt::hashers`) and
//! content addressing (`cid`). It additionally offers a DS-tagged API for
//! ambient, non-consensus uses that still want a stable domain prefix.
//!
//! ```text
//! "da-share-layer.ds.sha256:" || context || 0x00
//! ```

use super::{Digest32, DsTag};
use sha2::{Digest as _, Sha256};

#[inline]
fn ds_prefix_bytes(_tag: DsTag) -> (&'static [u8], &'static [u8], u8) {
    (b"da-share-layer.ds.", b"sha256:", 0u8)
}

#[inline]
pub fn sha256(data: &[u8]) -> Digest32 {
    let mut h = Sha256::new();
    h.update(data);
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    o
}

pub fn sha256_many<'a, I>(parts: I) -> Digest32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    o
}

pub fn sha256_reader<R: std::io::Read>(mut reader: R) -> std::io::Result<Digest32> {
    const BUF: usize = 1 << 20;
    let mut h = Sha256::new();
    let mut buf = vec![0u8; BUF];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
    }
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    Ok(o)
}

#[inline]
fn absorb_ds_prefix(h: &mut Sha256, tag: DsTag) {
    let (a, b, z) = ds_prefix_bytes(tag);
    h.update(a);
    h.update(b);
    h.update(tag.context().as_bytes());
    h.update([z]);
}

pub fn sha256_ds(tag: DsTag, data: &[u8]) -> Digest32 {
    let mut h = Sha256::new();
    absorb_ds_prefix(&mut h, tag);
    h.update(data);
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    o
}

pub fn sha256_many_ds<'a, I>(tag: DsTag, parts: I) -> Digest32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut h = Sha256::new();
    absorb_ds_prefix(&mut h, tag);
    for p in parts {
        h.update(p);
    }
    let out = h.finalize();
    let mut o = [0u8; 32];
    o.copy_from_slice(&out);
    o
}
