//! Secret store abstraction.
//!
//! The remote secret store is consumed through a narrow, backend-agnostic
//! seam: one read, one listing, one seal probe. The production implementation
//! ([`vault::VaultKvStore`]) talks to HashiCorp Vault's KV engine; tests
//! substitute in-memory implementations at the same seam.

pub mod lifecycle;
pub mod vault;

pub use lifecycle::{ClientLifecycle, StoreConnector, DEFAULT_IDLE_SHUTDOWN};
pub use vault::{VaultConnector, VaultKvStore};

use crate::errors::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One secret read from a single mount. Never mutated; scoped to one mount
/// search iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretRecord {
    /// The secret's key/value payload.
    pub fields: Map<String, Value>,
    /// Mount the secret was read from.
    pub source_mount: String,
}

impl SecretRecord {
    pub fn new(fields: Map<String, Value>, source_mount: impl Into<String>) -> Self {
        Self { fields, source_mount: source_mount.into() }
    }
}

/// Read-side interface to the remote secret store.
///
/// Implementations must distinguish "nothing at this path" (`Ok(None)`) from
/// transport or store-level failures (`Err`); the mount search treats the
/// former as a plain miss and recovers the latter per mount.
///
/// Implementations MUST NOT log secret values.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read the secret at `path`. The path carries the mount prefix, e.g.
    /// `/secret/db-pass`.
    async fn read(&self, path: &str) -> Result<Option<SecretRecord>>;

    /// List the entries under `path`.
    async fn list(&self, path: &str) -> Result<Option<Vec<String>>>;

    /// Whether the store is currently sealed. While sealed, no secret
    /// material is accessible.
    async fn sealed(&self) -> Result<bool>;
}

impl std::fmt::Debug for dyn SecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn SecretStore")
    }
}

/// Join a mount prefix and a bare key into a read path, collapsing the
/// slash between them.
pub(crate) fn join_path(mount: &str, key: &str) -> String {
    format!("{}/{}", mount.trim_end_matches('/'), key.trim_start_matches('/'))
}
