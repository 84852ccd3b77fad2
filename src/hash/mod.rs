//! Hash abstractions and domain-separated helpers.
//!
//! `sha2` (via [`sha256`]) is the consensus-critical hash used throughout
//! the NMT and content addressing (§6). BLAKE3 (this module's default
//! [`HashFn`] impl) is kept for non-consensus, ergonomic uses: protocol
//! request deduplication ids and test fixtures, where speed matters more
//! than matching a mandated algorithm.

pub mod sha256;

use core::fmt;

/// A 256-bit digest used across the codebase.
pub type Digest32 = [u8; 32];

/// Domain separation tags for the BLAKE3 helpers in this module.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DsTag {
    /// Generic, internal usage.
    Generic,
    /// shrex/nd wire messages (framing / request ids).
    P2p,
    /// Data-availability blob commitment (non-consensus use only).
    DaBlob,
}

impl DsTag {
    #[inline]
    pub fn context(self) -> &'static str {
        match self {
            DsTag::Generic => "da-share-layer:v1:generic",
            DsTag::P2p => "da-share-layer:v1:p2p",
            DsTag::DaBlob => "da-share-layer:v1:da_blob",
        }
    }
}

/// Minimal interface for a streaming 256-bit hash.
pub trait HashFn: Sized + fmt::Debug {
    fn new_ds(tag: DsTag) -> Self;
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Digest32;

    #[inline]
    fn hash_ds(tag: DsTag, data: &[u8]) -> Digest32 {
        let mut h = Self::new_ds(tag);
        h.update(data);
        h.finalize()
    }

    #[inline]
    fn hash_many<'a, I>(tag: DsTag, parts: I) -> Digest32
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut h = Self::new_ds(tag);
        for p in parts {
            h.update(p);
        }
        h.finalize()
    }
}

/* ---------------------------- Blake3 (default) ---------------------------- */

#[derive(Debug)]
pub struct Blake3Hash(::blake3::Hasher);

impl HashFn for Blake3Hash {
    #[inline]
    fn new_ds(tag: DsTag) -> Self {
        Self(::blake3::Hasher::new_derive_key(tag.context()))
    }

    #[inline]
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    #[inline]
    fn finalize(self) -> Digest32 {
        *self.0.finalize().as_bytes()
    }
}

/// One-shot BLAKE3-256 with a domain tag.
#[inline]
pub fn blake3_256_ds(tag: DsTag, data: &[u8]) -> Digest32 {
    Blake3Hash::hash_ds(tag, data)
}

/// One-shot BLAKE3-256 over multiple chunks.
#[inline]
pub fn blake3_256_many<'a, I>(tag: DsTag, parts: I) -> Digest32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    Blake3Hash::hash_many(tag, parts)
}

/* ------------------------- Legacy-style BLAKE3 API ------------------------- */

/// A minimal, un-domain-separated BLAKE3 API used by `nmt::hashers` style
/// callers that want the raw primitive.
pub mod blake3 {
    use super::Digest32;

    #[inline]
    pub fn blake3(data: &[u8]) -> Digest32 {
        let hash = ::blake3::hash(data);
        *hash.as_bytes()
    }

    #[inline]
    pub fn blake3_many<'a, I>(parts: I) -> Digest32
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut hasher = ::blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        *hasher.finalize().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_length_is_32() {
        let d = blake3_256_ds(DsTag::Generic, b"");
        assert_eq!(d.len(), 32);
    }

    #[test]
    fn domain_separates_outputs() {
        let a = blake3_256_ds(DsTag::P2p, b"hello");
        let b = blake3_256_ds(DsTag::DaBlob, b"hello");
        assert_ne!(a, b);
    }

    #[test]
    fn streaming_equals_one_shot() {
        let parts = [b"abc" as &[u8], b"def", b"ghi"];
        let one = blake3_256_many(DsTag::Generic, parts.iter().copied());
        let cat = blake3_256_ds(DsTag::Generic, b"abcdefghi");
        assert_eq!(one, cat);
    }
}
