//! Fixed-width share layout.
//!
//! A [`Share`] is a `ShareSize`-byte blob whose first `NamespaceSize` bytes
//! are its namespace id. This module also provides the two leaf-tagging
//! byte layouts the NMT hashes over: an original share is tagged `0x00`, a
//! parity share produced by the erasure coder is tagged `0xFF` and forced
//! to the reserved parity namespace. Folding the tag into the leaf bytes
//! stops a parity leaf and an original leaf from ever hashing identically.

use crate::error::{Error, Result};
use crate::nmt::types::{NamespaceId, NAMESPACE_BYTES, PARITY_SHARE_NAMESPACE};

/// Tag byte prepended to an original share before NMT leaf hashing.
pub const ORIGINAL_LEAF_TAG: u8 = 0x00;
/// Tag byte prepended to a parity share before NMT leaf hashing.
pub const PARITY_LEAF_TAG: u8 = 0xFF;

/// A single fixed-width share: `namespace || payload`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    bytes: Vec<u8>,
}

impl Share {
    /// Wrap `bytes` as a share, checking its length against `share_size`.
    pub fn new(bytes: Vec<u8>, share_size: usize) -> Result<Self> {
        if bytes.len() != share_size {
            return Err(Error::InvalidShareSize { expected: share_size, actual: bytes.len() });
        }
        if share_size < NAMESPACE_BYTES {
            return Err(Error::InvalidShareSize { expected: NAMESPACE_BYTES, actual: share_size });
        }
        Ok(Self { bytes })
    }

    /// Build a share from a namespace and payload, left-padding/truncating
    /// isn't performed: `payload.len()` must equal `share_size - NamespaceSize`.
    pub fn from_parts(ns: NamespaceId, payload: &[u8], share_size: usize) -> Result<Self> {
        if payload.len() + NAMESPACE_BYTES != share_size {
            return Err(Error::InvalidShareSize { expected: share_size, actual: payload.len() + NAMESPACE_BYTES });
        }
        let mut bytes = Vec::with_capacity(share_size);
        bytes.extend_from_slice(&ns);
        bytes.extend_from_slice(payload);
        Ok(Self { bytes })
    }

    /// A parity share: namespaced to the reserved sentinel, producing it is
    /// infallible since the caller already knows the configured share size.
    pub fn parity(payload: &[u8], share_size: usize) -> Result<Self> {
        Self::from_parts(PARITY_SHARE_NAMESPACE, payload, share_size)
    }

    #[inline]
    pub fn namespace(&self) -> NamespaceId {
        let mut ns = [0u8; NAMESPACE_BYTES];
        ns.copy_from_slice(&self.bytes[..NAMESPACE_BYTES]);
        ns
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[NAMESPACE_BYTES..]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    pub fn is_parity(&self) -> bool {
        self.namespace() == PARITY_SHARE_NAMESPACE
    }
}

/// Tagged leaf bytes fed to the NMT hasher for an original share.
pub fn original_leaf_bytes(share: &Share) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + share.as_bytes().len());
    out.push(ORIGINAL_LEAF_TAG);
    out.extend_from_slice(share.as_bytes());
    out
}

/// Tagged leaf bytes fed to the NMT hasher for a parity share.
pub fn parity_leaf_bytes(share: &Share) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + share.as_bytes().len());
    out.push(PARITY_LEAF_TAG);
    out.extend_from_slice(share.as_bytes());
    out
}

/// Build the NMT leaf for a share at a known square position. Whether a
/// position is parity is a property of where it sits in the Extended Data
/// Square (see `eds::Eds::is_parity_position`), not of the share's bytes: a
/// parity share's raw RS output has no meaningful namespace prefix of its
/// own, so the caller must say which tagging to apply.
pub fn leaf_for_share(share: &Share, is_parity: bool) -> crate::nmt::Leaf {
    if is_parity {
        crate::nmt::Leaf::new(PARITY_SHARE_NAMESPACE, parity_leaf_bytes(share))
    } else {
        crate::nmt::Leaf::new(share.namespace(), original_leaf_bytes(share))
    }
}
