//! shrex/nd server half: answer one `GetSharesByNamespace` exchange per
//! stream, applying the server's concurrency limit as backpressure.
//!
//! Overload is signaled by closing the stream before writing a response
//! (spec §4.7's "EOF before response") rather than by a status code, since
//! writing *any* response, even `INTERNAL`, implies the server accepted the
//! request for processing.

use crate::cid::{node_cid, Cid};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::Digest32;
use crate::nmt::types::{ns_try_from_slice, NamespaceId};
use crate::protocol::wire::{self, GetSharesByNamespaceRequest, GetSharesByNamespaceResponse, Proof as WireProof, Row, StatusCode};
use crate::store::BlockStore;
use crate::traversal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// A tree this server can answer `GetSharesByNamespace` against: its root
/// CID in the block store and the number of leaves under it.
#[derive(Clone, Copy)]
pub struct ServedRoot {
    pub cid: Cid,
    pub total_leaves: usize,
}

/// Shared server state: the block store, every root this server currently
/// knows how to serve (keyed by the root's own content hash, the wire
/// request's `root_hash`), and the concurrency limiter.
pub struct Server {
    store: Arc<dyn BlockStore>,
    roots: HashMap<Digest32, ServedRoot>,
    limiter: Semaphore,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Server {
    pub fn new(store: Arc<dyn BlockStore>, config: &Config) -> Self {
        Self {
            store,
            roots: HashMap::new(),
            limiter: Semaphore::new(config.max_concurrent_requests),
            read_timeout: config.request_timeout(),
            write_timeout: config.request_timeout(),
        }
    }

    pub fn register_root(&mut self, root_hash: Digest32, cid: Cid, total_leaves: usize) {
        self.roots.insert(root_hash, ServedRoot { cid, total_leaves });
    }

    /// Serve a single request/response exchange over `stream`. Returns
    /// `Ok(())` whether or not a response was actually written: a dropped
    /// permit (overload) is not an error, it's the protocol's rate-limit
    /// signal to the client.
    pub async fn serve_one<S>(&self, stream: &mut S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let permit = match self.limiter.try_acquire() {
            Ok(p) => p,
            Err(_) => {
                warn!("shrex/nd: rejecting request, concurrency limit reached");
                return Ok(());
            }
        };

        let request: GetSharesByNamespaceRequest = timeout(self.read_timeout, wire::read_framed(stream)).await.map_err(|_| Error::Canceled)??;
        trace!(root_hash = ?request.root_hash, "shrex/nd: handling request");

        let response = self.build_response(&request).await;
        drop(permit);

        timeout(self.write_timeout, wire::write_framed(stream, &response)).await.map_err(|_| Error::Canceled)??;
        Ok(())
    }

    async fn build_response(&self, request: &GetSharesByNamespaceRequest) -> GetSharesByNamespaceResponse {
        let Ok(root_hash) = Digest32::try_from(request.root_hash.as_slice()) else {
            return status_only(StatusCode::Invalid);
        };
        let Some(nid) = ns_try_from_slice(&request.namespace_id) else {
            return status_only(StatusCode::Invalid);
        };
        let Some(served) = self.roots.get(&root_hash).copied() else {
            return status_only(StatusCode::NotFound);
        };

        let cancel = CancellationToken::new();
        match self.collect_row(served.cid, nid, served.total_leaves, &cancel).await {
            Ok(Some(row)) => GetSharesByNamespaceResponse { status: StatusCode::Ok as i32, rows: vec![row] },
            Ok(None) => status_only(StatusCode::NamespaceNotFound),
            Err(Error::NamespaceOutsideRange(_)) => status_only(StatusCode::NamespaceNotFound),
            Err(e) => {
                debug!(error = %e, "shrex/nd: internal error answering request");
                status_only(StatusCode::Internal)
            }
        }
    }

    async fn collect_row(&self, root_cid: Cid, nid: NamespaceId, total_leaves: usize, cancel: &CancellationToken) -> Result<Option<Row>> {
        // The wire response carries a full row or a status code, nothing in
        // between, so a partial buffer from a mid-walk failure has nowhere
        // to go on this side of the protocol; only the error matters here.
        let data = traversal::collect_by_namespace(self.store.as_ref(), root_cid, nid, total_leaves, cancel).await.map_err(|(e, _partial)| e)?;
        if data.leaves.is_empty() {
            return Ok(None);
        }
        let start = data.leaves.first().unwrap().0;
        let end = data.leaves.last().unwrap().0 + 1;
        let proof = traversal::prove_range(self.store.as_ref(), root_cid, total_leaves, start, end, cancel).await?;

        Ok(Some(Row {
            shares: data.leaves.into_iter().map(|(_, leaf)| leaf.data).collect(),
            proof: Some(WireProof {
                start: proof.start as u32,
                end: proof.end as u32,
                nodes: proof.path.iter().map(encode_proof_node).collect(),
                leaf_hash: Vec::new(),
                is_max_namespace_id_ignored: proof.is_max_namespace_id_ignored,
            }),
        }))
    }
}

fn status_only(status: StatusCode) -> GetSharesByNamespaceResponse {
    GetSharesByNamespaceResponse { status: status as i32, rows: Vec::new() }
}

fn encode_proof_node(n: &crate::nmt::ProofNode) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 * crate::nmt::NAMESPACE_BYTES + 33);
    out.push(n.is_left as u8);
    out.extend_from_slice(&n.min_ns);
    out.extend_from_slice(&n.max_ns);
    out.extend_from_slice(&n.hash);
    out
}

/// Also used by `protocol::client` to decode `Row.proof.nodes`.
pub(crate) fn decode_proof_node(bytes: &[u8]) -> Option<crate::nmt::ProofNode> {
    const NS: usize = crate::nmt::NAMESPACE_BYTES;
    if bytes.len() != 1 + 2 * NS + 32 {
        return None;
    }
    let is_left = bytes[0] != 0;
    let mut min = [0u8; NS];
    let mut max = [0u8; NS];
    let mut hash = [0u8; 32];
    min.copy_from_slice(&bytes[1..1 + NS]);
    max.copy_from_slice(&bytes[1 + NS..1 + 2 * NS]);
    hash.copy_from_slice(&bytes[1 + 2 * NS..]);
    Some(crate::nmt::ProofNode { is_left, min_ns: min, max_ns: max, hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmt::types::ns_from_u64;
    use crate::nmt::{Leaf, Nmt};
    use crate::store::{encode_value, MemoryBlockStore};

    fn mk_leaf(ns: u64, data: &'static [u8]) -> Leaf {
        Leaf::new(ns_from_u64(ns), data.to_vec())
    }

    async fn seed(store: &MemoryBlockStore, leaves: Vec<Leaf>) -> (Cid, Digest32, usize) {
        let tree = Nmt::build(leaves).unwrap();
        let mut entries = Vec::new();
        for node in tree.dag_nodes() {
            let cid = node_cid(node.min_ns, node.max_ns, &node.hash).unwrap();
            entries.push((cid, encode_value(node.min_ns, node.max_ns, node.is_leaf, &node.payload)));
        }
        let total = tree.len();
        store.put_many(entries).await.unwrap();
        let root = tree.root();
        (node_cid(root.min_ns, root.max_ns, &root.hash).unwrap(), root.hash, total)
    }

    #[tokio::test]
    async fn answers_ok_with_matching_rows() {
        let store = Arc::new(MemoryBlockStore::new());
        let leaves = vec![mk_leaf(1, b"a"), mk_leaf(5, b"b"), mk_leaf(5, b"c"), mk_leaf(9, b"d")];
        let (cid, root_hash, total) = seed(&store, leaves).await;

        let mut server = Server::new(store.clone(), &Config::default());
        server.register_root(root_hash, cid, total);

        let request = GetSharesByNamespaceRequest { root_hash: root_hash.to_vec(), namespace_id: ns_from_u64(5).to_vec() };
        let response = server.build_response(&request).await;

        assert_eq!(response.status, StatusCode::Ok as i32);
        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0].shares, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[tokio::test]
    async fn unknown_root_is_not_found() {
        let store = Arc::new(MemoryBlockStore::new());
        let server = Server::new(store, &Config::default());
        let request = GetSharesByNamespaceRequest { root_hash: vec![0u8; 32], namespace_id: ns_from_u64(1).to_vec() };
        let response = server.build_response(&request).await;
        assert_eq!(response.status, StatusCode::NotFound as i32);
    }

    #[tokio::test]
    async fn overload_closes_the_stream_without_a_response() {
        let store = Arc::new(MemoryBlockStore::new());
        let mut config = Config::default();
        config.max_concurrent_requests = 0;
        let server = Server::new(store, &config);

        let (mut a, b) = tokio::io::duplex(4096);
        drop(b);
        server.serve_one(&mut a).await.unwrap();
    }
}
