//! Content-addressed block store.
//!
//! The core only ever depends on this trait: `get`/`put_many` are the hot
//! path (traversal and DAG-put), `delete`/`all_keys` exist for tests. The
//! shipped implementation is a `DashMap`-backed in-memory store, concurrency
//! safe per the crate's assumption that distinct CIDs never collide.

use crate::cid::Cid;
use crate::error::{Error, Result};
use crate::nmt::types::{NamespaceId, NAMESPACE_BYTES};
use async_trait::async_trait;
use dashmap::DashMap;

const LEAF_KIND: u8 = 0;
const INNER_KIND: u8 = 1;

/// Value layout stored under each CID: `min_ns || max_ns || kind || payload`.
/// `kind` distinguishes a leaf's tagged share bytes from an inner node's
/// `left_digest || right_digest`, mirroring the domain-separation byte
/// (`0x00`/`0x01`) the NMT already folds into its hash.
pub fn encode_value(min_ns: NamespaceId, max_ns: NamespaceId, is_leaf: bool, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * NAMESPACE_BYTES + 1 + payload.len());
    out.extend_from_slice(&min_ns);
    out.extend_from_slice(&max_ns);
    out.push(if is_leaf { LEAF_KIND } else { INNER_KIND });
    out.extend_from_slice(payload);
    out
}

/// Split a stored value back into its namespace range, leaf/inner kind, and payload.
pub fn decode_value(value: &[u8]) -> Result<(NamespaceId, NamespaceId, bool, &[u8])> {
    if value.len() < 2 * NAMESPACE_BYTES + 1 {
        return Err(Error::MalformedProof("block store value shorter than its header".into()));
    }
    let mut min_ns = [0u8; NAMESPACE_BYTES];
    let mut max_ns = [0u8; NAMESPACE_BYTES];
    min_ns.copy_from_slice(&value[..NAMESPACE_BYTES]);
    max_ns.copy_from_slice(&value[NAMESPACE_BYTES..2 * NAMESPACE_BYTES]);
    let kind = value[2 * NAMESPACE_BYTES];
    let is_leaf = match kind {
        LEAF_KIND => true,
        INNER_KIND => false,
        other => return Err(Error::MalformedProof(format!("unknown node kind byte {other}"))),
    };
    Ok((min_ns, max_ns, is_leaf, &value[2 * NAMESPACE_BYTES + 1..]))
}

/// Content-addressed get/put/delete over CID-keyed NMT node bytes.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn get(&self, cid: &Cid) -> Result<Vec<u8>>;

    /// Atomic batch insert.
    async fn put_many(&self, entries: Vec<(Cid, Vec<u8>)>) -> Result<()>;

    /// Only used by tests.
    async fn delete(&self, cid: &Cid) -> Result<()>;

    /// Only used by tests.
    async fn all_keys(&self) -> Result<Vec<Cid>>;
}

/// Reference in-memory implementation backed by a concurrent hash map.
#[derive(Default)]
pub struct MemoryBlockStore {
    inner: DashMap<Cid, Vec<u8>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get(&self, cid: &Cid) -> Result<Vec<u8>> {
        self.inner.get(cid).map(|v| v.clone()).ok_or_else(|| Error::NotFound(cid.to_string()))
    }

    async fn put_many(&self, entries: Vec<(Cid, Vec<u8>)>) -> Result<()> {
        for (cid, bytes) in entries {
            self.inner.insert(cid, bytes);
        }
        Ok(())
    }

    async fn delete(&self, cid: &Cid) -> Result<()> {
        self.inner.remove(cid);
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<Cid>> {
        Ok(self.inner.iter().map(|e| *e.key()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cid::node_cid;
    use crate::nmt::types::ns_from_u64;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryBlockStore::new();
        let cid = node_cid(ns_from_u64(1), ns_from_u64(2), &[3u8; 32]).unwrap();
        let value = encode_value(ns_from_u64(1), ns_from_u64(2), true, b"payload");
        store.put_many(vec![(cid, value.clone())]).await.unwrap();

        let got = store.get(&cid).await.unwrap();
        assert_eq!(got, value);

        let (min, max, is_leaf, payload) = decode_value(&got).unwrap();
        assert_eq!(min, ns_from_u64(1));
        assert_eq!(max, ns_from_u64(2));
        assert!(is_leaf);
        assert_eq!(payload, b"payload");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryBlockStore::new();
        let cid = node_cid(ns_from_u64(1), ns_from_u64(1), &[0u8; 32]).unwrap();
        assert!(matches!(store.get(&cid).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_then_all_keys() {
        let store = MemoryBlockStore::new();
        let cid = node_cid(ns_from_u64(1), ns_from_u64(1), &[0u8; 32]).unwrap();
        store.put_many(vec![(cid, vec![1, 2, 3])]).await.unwrap();
        assert_eq!(store.all_keys().await.unwrap().len(), 1);

        store.delete(&cid).await.unwrap();
        assert!(store.all_keys().await.unwrap().is_empty());
    }
}
