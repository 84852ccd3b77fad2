//! Content addressing for NMT nodes.
//!
//! A node's CID wraps `min_ns || max_ns || sha256_digest` in a multihash
//! under a project-specific multicodec, mirroring `NamespacedDataId` in
//! `celestia_types` (`CidGeneric` + `Multihash::wrap`). The wrapping is
//! bijective: any `Cid` produced by [`node_cid`] decodes back to the exact
//! `(min_ns, max_ns, hash)` triple it was built from.

use crate::error::{Error, Result};
use crate::hash::Digest32;
use crate::nmt::types::{NamespaceId, NAMESPACE_BYTES};

/// Multihash code for an NMT node digest (project-specific, unregistered).
pub const NODE_MULTIHASH_CODE: u64 = 0x9100;
/// CID codec for an NMT node (project-specific, unregistered).
pub const NODE_CODEC: u64 = 0x9101;

/// `min_ns || max_ns || sha256_digest`.
const NODE_ID_SIZE: usize = 2 * NAMESPACE_BYTES + 32;

/// A CID sized for [`NODE_ID_SIZE`]-byte multihash digests.
pub type Cid = cid::CidGeneric<NODE_ID_SIZE>;

fn encode_digest(min_ns: NamespaceId, max_ns: NamespaceId, hash: &Digest32) -> [u8; NODE_ID_SIZE] {
    let mut out = [0u8; NODE_ID_SIZE];
    out[..NAMESPACE_BYTES].copy_from_slice(&min_ns);
    out[NAMESPACE_BYTES..2 * NAMESPACE_BYTES].copy_from_slice(&max_ns);
    out[2 * NAMESPACE_BYTES..].copy_from_slice(hash);
    out
}

/// Derive the CID for an NMT node from its namespace range and content hash.
pub fn node_cid(min_ns: NamespaceId, max_ns: NamespaceId, hash: &Digest32) -> Result<Cid> {
    let bytes = encode_digest(min_ns, max_ns, hash);
    let mh = multihash::Multihash::wrap(NODE_MULTIHASH_CODE, &bytes)
        .map_err(|e| Error::Cid(format!("multihash wrap: {e}")))?;
    Ok(Cid::new_v1(NODE_CODEC, mh))
}

/// Recover the `(min_ns, max_ns, hash)` triple a CID was derived from.
pub fn node_cid_parts(cid: &Cid) -> Result<(NamespaceId, NamespaceId, Digest32)> {
    if cid.codec() != NODE_CODEC {
        return Err(Error::Cid(format!("unexpected codec {:#x}", cid.codec())));
    }
    let mh = cid.hash();
    if mh.code() != NODE_MULTIHASH_CODE {
        return Err(Error::Cid(format!("unexpected multihash code {:#x}", mh.code())));
    }
    let digest = mh.digest();
    if digest.len() != NODE_ID_SIZE {
        return Err(Error::Cid(format!("unexpected digest length {}", digest.len())));
    }
    let mut min_ns = [0u8; NAMESPACE_BYTES];
    let mut max_ns = [0u8; NAMESPACE_BYTES];
    let mut hash = [0u8; 32];
    min_ns.copy_from_slice(&digest[..NAMESPACE_BYTES]);
    max_ns.copy_from_slice(&digest[NAMESPACE_BYTES..2 * NAMESPACE_BYTES]);
    hash.copy_from_slice(&digest[2 * NAMESPACE_BYTES..]);
    Ok((min_ns, max_ns, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmt::types::ns_from_u64;

    #[test]
    fn roundtrips_through_cid() {
        let min_ns = ns_from_u64(1);
        let max_ns = ns_from_u64(9);
        let hash = [7u8; 32];

        let cid = node_cid(min_ns, max_ns, &hash).unwrap();
        let (got_min, got_max, got_hash) = node_cid_parts(&cid).unwrap();

        assert_eq!(got_min, min_ns);
        assert_eq!(got_max, max_ns);
        assert_eq!(got_hash, hash);
    }

    #[test]
    fn rejects_foreign_codec() {
        let mh = multihash::Multihash::wrap(NODE_MULTIHASH_CODE, &[0u8; NODE_ID_SIZE]).unwrap();
        let foreign = Cid::new_v1(0x55, mh);
        assert!(node_cid_parts(&foreign).is_err());
    }

    #[test]
    fn distinct_inputs_yield_distinct_cids() {
        let a = node_cid(ns_from_u64(1), ns_from_u64(2), &[1u8; 32]).unwrap();
        let b = node_cid(ns_from_u64(1), ns_from_u64(2), &[2u8; 32]).unwrap();
        assert_ne!(a, b);
    }
}
