//! shrex/nd client half: send one `GetSharesByNamespace` request over a
//! stream and decode the response, or time out trying.

use crate::error::Error;
use crate::hash::Digest32;
use crate::nmt::types::NamespaceId;
use crate::nmt::{Proof, ProofNode};
use crate::protocol::server::decode_proof_node;
use crate::protocol::wire::{self, GetSharesByNamespaceRequest, GetSharesByNamespaceResponse, Row as WireRow, StatusCode};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("peer is overloaded or rate-limiting")]
    RateLimited,
    #[error("root not found")]
    NotFound,
    #[error("namespace not found under root")]
    NamespaceNotFound,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of shares and the proof binding them to the requested namespace,
/// decoded from a `shrex.nd.Row`.
#[derive(Debug)]
pub struct NamespaceRow {
    pub shares: Vec<Vec<u8>>,
    pub proof: Proof,
}

/// Send a `GetSharesByNamespace` request and decode its response, giving up
/// once `deadline` elapses.
pub async fn get_shares_by_namespace<S>(
    stream: &mut S,
    root_hash: Digest32,
    namespace_id: NamespaceId,
    total_leaves: usize,
    deadline: Duration,
) -> Result<Vec<NamespaceRow>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    timeout(deadline, run(stream, root_hash, namespace_id, total_leaves)).await.map_err(|_| ClientError::DeadlineExceeded)?
}

async fn run<S>(stream: &mut S, root_hash: Digest32, namespace_id: NamespaceId, total_leaves: usize) -> Result<Vec<NamespaceRow>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let request = GetSharesByNamespaceRequest { root_hash: root_hash.to_vec(), namespace_id: namespace_id.to_vec() };
    wire::write_framed(stream, &request).await.map_err(wire_err)?;

    let response: GetSharesByNamespaceResponse = match wire::read_framed(stream).await {
        Ok(r) => r,
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ClientError::RateLimited),
        Err(e) => return Err(wire_err(e)),
    };

    // proto3 has no reserved "unset" slot here: INVALID occupies 0, so an
    // unrecognized status value (a future peer's new code) falls through to
    // the same branch as an explicit INVALID rather than needing one of its
    // own.
    match StatusCode::try_from(response.status).unwrap_or(StatusCode::Invalid) {
        StatusCode::Ok => response.rows.into_iter().map(|row| decode_row(row, total_leaves)).collect(),
        StatusCode::NotFound => Err(ClientError::NotFound),
        StatusCode::NamespaceNotFound => Err(ClientError::NamespaceNotFound),
        StatusCode::Invalid => Err(ClientError::InvalidResponse("peer rejected the request as invalid".into())),
        StatusCode::Internal => Err(ClientError::InvalidResponse(format!("unexpected status {}", response.status))),
    }
}

fn wire_err(e: Error) -> ClientError {
    match e {
        Error::Io(io) => ClientError::Io(io),
        other => ClientError::InvalidResponse(other.to_string()),
    }
}

fn decode_row(row: WireRow, total_leaves: usize) -> Result<NamespaceRow, ClientError> {
    let wire_proof = row.proof.ok_or_else(|| ClientError::InvalidResponse("row missing proof".into()))?;
    let proof = reconstruct_proof(&wire_proof, total_leaves)?;
    Ok(NamespaceRow { shares: row.shares, proof })
}

/// Rebuild a `Proof` from the wire's flat `nodes` list.
///
/// The wire format carries no per-sibling `is_left` flag of its own (each
/// entry is already 1 + 2*NAMESPACE_BYTES + 32 bytes via
/// `protocol::server::encode_proof_node`, so it round-trips directly).
fn reconstruct_proof(wire_proof: &wire::Proof, total_leaves: usize) -> Result<Proof, ClientError> {
    let start = wire_proof.start as usize;
    let end = wire_proof.end as usize;
    if start >= end || end > total_leaves {
        return Err(ClientError::InvalidResponse(format!("invalid proof range {start}..{end} for {total_leaves} leaves")));
    }

    let path: Vec<ProofNode> = wire_proof
        .nodes
        .iter()
        .map(|b| decode_proof_node(b).ok_or_else(|| ClientError::InvalidResponse("malformed proof node on the wire".into())))
        .collect::<Result<_, _>>()?;

    Ok(Proof { start, end, path, is_max_namespace_id_ignored: wire_proof.is_max_namespace_id_ignored })
}
