//! shrex/nd: the namespaced-share request/response protocol.
//!
//! A client asks a peer for every share under a namespace within a known
//! row/column NMT root; the peer answers with the shares and a range
//! inclusion proof, or a status code explaining why it can't. Framing and
//! generated message types live in [`wire`]; [`server::Server`] and
//! [`client::get_shares_by_namespace`] are the two sides of the exchange.

pub mod client;
pub mod server;
pub mod wire;

pub use client::{get_shares_by_namespace, ClientError, NamespaceRow};
pub use server::{Server, ServedRoot};
