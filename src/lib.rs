//! # hiera-vault
//!
//! Hierarchical configuration lookup backend that resolves keys against
//! HashiCorp Vault's KV store. A host configuration hierarchy hands each
//! key and an option bag to [`VaultBackend::lookup_key`]; the backend
//! dispatches on the key's `vault_key::`/`vault_list::` tag, searches the
//! configured mounts in order, and answers with a [`LookupOutcome`] telling
//! the host whether to use the value, keep looking, or treat the key as
//! never having been addressed to this backend.
//!
//! ## Architecture
//!
//! ```text
//! Host hierarchy → VaultBackend → ClientLifecycle → SecretStore (Vault KV)
//!        ↓               ↓               ↓
//!  LookupContext    LookupOptions   Idle shutdown
//! ```
//!
//! ## Core Components
//!
//! - **Lookup pipeline**: composite-key parsing, ordered mount search, and
//!   field extraction policy
//! - **Client lifecycle**: one shared, mutex-guarded store client with merge
//!   configuration semantics and a debounced idle shutdown
//! - **Secret store**: trait seam over Vault KV v2, mockable in tests
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hiera_vault::{LookupOutcome, TracingContext, VaultBackend};
//! use serde_json::{json, Map, Value};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> hiera_vault::Result<()> {
//!     let backend = VaultBackend::new();
//!     let options: Map<String, Value> = match json!({
//!         "address": "https://vault.example.com:8200",
//!         "mounts": { "generic": ["/puppet", "/secret"] },
//!         "default_field": "value"
//!     }) {
//!         Value::Object(map) => map,
//!         _ => unreachable!(),
//!     };
//!
//!     let outcome = backend
//!         .lookup_key("vault_key::db-pass", &options, &TracingContext)
//!         .await?;
//!     if let LookupOutcome::Found(value) = outcome {
//!         println!("resolved: {}", value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod lookup;
pub mod store;

// Re-export commonly used types and traits
pub use config::{ConnectionOptions, ConnectionSettings, LookupOptions, SecretString};
pub use errors::{LookupError, Result};
pub use lookup::{LookupContext, LookupKind, LookupOutcome, TracingContext, VaultBackend};
pub use store::{ClientLifecycle, SecretRecord, SecretStore, StoreConnector, VaultConnector};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
