//! Crate-wide configuration: share/namespace sizing and protocol limits.
//!
//! Loaded as plain TOML via `serde`; every field has a spec-mandated default
//! so `Config::default()` is always a usable configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Width in bytes of a namespace identifier.
    pub namespace_size: usize,
    /// Width in bytes of a single share.
    pub share_size: usize,
    /// Maximum number of rows returned to a single shrex/nd request.
    pub max_rows_per_response: usize,
    /// Per-request deadline in milliseconds, before the server gives up.
    pub request_timeout_ms: u64,
    /// Maximum number of concurrent in-flight shrex/nd requests a server
    /// will service before responding with backpressure (EOF before a
    /// response, per the protocol's rate-limit semantics).
    pub max_concurrent_requests: usize,
}

impl Config {
    pub const DEFAULT_NAMESPACE_SIZE: usize = 8;
    pub const DEFAULT_SHARE_SIZE: usize = 512;

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace_size: Self::DEFAULT_NAMESPACE_SIZE,
            share_size: Self::DEFAULT_SHARE_SIZE,
            max_rows_per_response: 128,
            request_timeout_ms: 10_000,
            max_concurrent_requests: 64,
        }
    }
}

impl Config {
    /// Parse a `Config` from TOML text, falling back to field defaults for
    /// anything the caller's document omits.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
