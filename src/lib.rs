//! Data availability share layer: namespaced Merkle trees over a 2D
//! Reed-Solomon Extended Data Square, a content-addressed block store,
//! namespace-aware traversal, and the shrex/nd P2P retrieval protocol.
//!
//! ### Module map
//! - [`share`] — fixed-size share encode/decode.
//! - [`nmt`] — namespaced Merkle tree construction, proofs, verification.
//! - [`eds`] — 2D Reed-Solomon erasure coding over the Extended Data Square.
//! - [`cid`] — content addressing for NMT nodes.
//! - [`store`] — the `BlockStore` trait and an in-memory reference impl.
//! - [`dag`] — Share DAG Put: commit an EDS as row/column NMTs into a store.
//! - [`traversal`] — namespace-filtered retrieval (`CollectByNamespace`, `GetShare`).
//! - [`protocol`] — the shrex/nd wire protocol (client + server).

#![deny(rust_2018_idioms, unused_must_use)]

pub mod cid;
pub mod config;
pub mod dag;
pub mod eds;
pub mod error;
pub mod hash;
pub mod nmt;
pub mod protocol;
pub mod share;
pub mod store;
pub mod traversal;

pub use error::{Error, Result};
