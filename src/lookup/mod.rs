//! Lookup pipeline: key dispatch, mount search, and outcome arbitration.
//!
//! [`VaultBackend`] is the entry point a host hierarchy calls per key. It
//! parses the composite key, applies this lookup's options to the shared
//! client, runs the mount search for the selected mode, and maps the search
//! result into a [`LookupOutcome`] the host can act on.

pub mod context;
pub mod extract;
pub mod key;
pub mod outcome;
pub mod search;

pub use context::{LookupContext, TracingContext};
pub use key::{LookupKind, ParsedKey, BYPASS_MARKER};
pub use outcome::LookupOutcome;

use crate::config::LookupOptions;
use crate::errors::Result;
use crate::store::{ClientLifecycle, StoreConnector, VaultConnector};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Hierarchical lookup backend over a Vault KV store.
///
/// One instance is meant to live for the host process; every lookup goes
/// through the same [`ClientLifecycle`], so connection settings accumulate
/// across lookups and the idle shutdown sees all traffic.
#[derive(Clone)]
pub struct VaultBackend {
    lifecycle: ClientLifecycle,
}

impl VaultBackend {
    /// Backend connected to a real Vault server.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(VaultConnector))
    }

    /// Backend over a custom connector. This is the seam tests use to
    /// substitute in-memory stores.
    pub fn with_connector(connector: Arc<dyn StoreConnector>) -> Self {
        Self { lifecycle: ClientLifecycle::new(connector) }
    }

    pub fn with_lifecycle(lifecycle: ClientLifecycle) -> Self {
        Self { lifecycle }
    }

    /// Resolve one composite key against the configured mounts.
    ///
    /// Keys without a `vault_key`/`vault_list` tag segment are rejected
    /// before options are validated, so a malformed configuration never
    /// turns an unserved key into an error. A `VAULT_TOKEN` of
    /// [`BYPASS_MARKER`] rejects every key.
    ///
    /// # Errors
    ///
    /// [`crate::errors::LookupError::Configuration`] on invalid options or a
    /// client that cannot be configured. Read and listing failures are not
    /// errors; they surface as misses through the returned outcome.
    pub async fn lookup_key(
        &self,
        composite_key: &str,
        options: &Map<String, Value>,
        context: &dyn LookupContext,
    ) -> Result<LookupOutcome> {
        let Some((kind, raw_key)) = key::split_composite_key(composite_key) else {
            debug!(key = %composite_key, "Key not served by this backend");
            return Ok(LookupOutcome::Rejected);
        };

        if key::backend_bypassed() {
            context.explain(&|| {
                format!("Token set to {}, skipping backend", BYPASS_MARKER)
            });
            return Ok(LookupOutcome::Rejected);
        }

        let options = LookupOptions::from_map(options)?;
        let bare_key = key::apply_strip_patterns(raw_key, &options.strip_from_keys);
        debug!(key = %bare_key, mode = kind.as_str(), "Resolving key");

        let store = self.lifecycle.ensure_configured(&options.connection, context).await?;

        let found = match kind {
            LookupKind::Key => {
                search::search_key(store.as_ref(), &bare_key, &options, context).await
            }
            LookupKind::List => {
                search::search_list(store.as_ref(), &bare_key, &options, context).await
            }
        };

        // The search is done with the client either way; restart the idle
        // window before arbitrating.
        self.lifecycle.schedule_idle_shutdown().await;

        match found {
            Some(value) => Ok(LookupOutcome::Found(value)),
            None if options.continue_if_not_found => {
                context.explain(&|| format!("Key {} not found, passing through", bare_key));
                Ok(LookupOutcome::NotFound)
            }
            // Authoritative miss: answer with a null value so the host
            // stops searching other backends.
            None => Ok(LookupOutcome::Found(Value::Null)),
        }
    }

    pub fn lifecycle(&self) -> &ClientLifecycle {
        &self.lifecycle
    }
}

impl Default for VaultBackend {
    fn default() -> Self {
        Self::new()
    }
}
