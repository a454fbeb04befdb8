//! Secret store client lifecycle.
//!
//! One process-wide [`ClientLifecycle`] owns the configured connection to
//! the secret store. Lookups call [`ClientLifecycle::ensure_configured`]
//! before reading; the connection is torn down only by a debounced idle
//! timer, never by an individual lookup's success or failure path.
//!
//! Holding a live authenticated connection forever is undesirable under
//! sparse, bursty lookup traffic, but reconnecting per key is wasteful.
//! The debounce splits the difference: every call restarts the idle window,
//! and the teardown fires exactly once after the window elapses with no
//! further calls.

use crate::config::{ConnectionOptions, ConnectionSettings};
use crate::errors::{LookupError, Result};
use crate::lookup::context::LookupContext;
use crate::store::SecretStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default quiet period before the idle client is shut down.
pub const DEFAULT_IDLE_SHUTDOWN: Duration = Duration::from_secs(10);

/// Builds a [`SecretStore`] from accumulated connection settings.
///
/// The production implementation is [`crate::store::VaultConnector`]; tests
/// substitute mock connectors at this seam.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn SecretStore>>;
}

enum LifecycleState {
    Unconfigured,
    Configured(Arc<dyn SecretStore>),
    ShutDown,
}

struct LifecycleInner {
    settings: ConnectionSettings,
    state: LifecycleState,
    /// Debounce generation; bumped on every schedule call so that only the
    /// most recent pending teardown fires.
    epoch: u64,
}

/// Shared handle to the process-wide secret store client.
///
/// Cloning is cheap; all clones share the same state. Configuration and the
/// seal check run under one mutex acquisition, so concurrent lookups never
/// observe a partially applied configuration. The idle teardown only drops
/// this handle's reference to the store: an in-flight read holds its own
/// `Arc` and completes safely.
#[derive(Clone)]
pub struct ClientLifecycle {
    inner: Arc<Mutex<LifecycleInner>>,
    connector: Arc<dyn StoreConnector>,
    idle_shutdown: Duration,
}

impl ClientLifecycle {
    /// Create a lifecycle with the default idle window, seeded from the
    /// conventional Vault environment variables.
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_idle_shutdown(connector, DEFAULT_IDLE_SHUTDOWN)
    }

    pub fn with_idle_shutdown(connector: Arc<dyn StoreConnector>, idle_shutdown: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LifecycleInner {
                settings: ConnectionSettings::from_env(),
                state: LifecycleState::Unconfigured,
                epoch: 0,
            })),
            connector,
            idle_shutdown,
        }
    }

    /// Apply this lookup's connection options and hand out a usable store.
    ///
    /// Merge semantics: options absent from this lookup never reset
    /// previously applied values. Reconfiguration with unchanged settings
    /// reuses the live client. The seal status is probed on every call;
    /// a sealed store fails the lookup.
    ///
    /// # Errors
    ///
    /// Always [`LookupError::Configuration`]; any failure schedules the
    /// idle shutdown before propagating.
    pub async fn ensure_configured(
        &self,
        options: &ConnectionOptions,
        context: &dyn LookupContext,
    ) -> Result<Arc<dyn SecretStore>> {
        let mut inner = self.inner.lock().await;

        match self.configure_locked(&mut inner, options, context).await {
            Ok(store) => Ok(store),
            Err(e) => {
                self.schedule_shutdown_locked(&mut inner);
                let message = match e {
                    LookupError::Configuration { message } => message,
                    other => format!("skipping backend, configuration failed: {}", other),
                };
                Err(LookupError::config(message))
            }
        }
    }

    async fn configure_locked(
        &self,
        inner: &mut LifecycleInner,
        options: &ConnectionOptions,
        context: &dyn LookupContext,
    ) -> Result<Arc<dyn SecretStore>> {
        let changed = inner.settings.merge(options);

        let store = match (&inner.state, changed) {
            (LifecycleState::Configured(store), false) => store.clone(),
            _ => {
                let store = self.connector.connect(&inner.settings).await?;
                inner.state = LifecycleState::Configured(store.clone());
                debug!("Secret store client configured");
                store
            }
        };

        // Sealed-store detection runs on every (re)configuration, before
        // any read is attempted.
        if store.sealed().await? {
            return Err(LookupError::config("vault is sealed"));
        }

        if let Some(address) = &inner.settings.address {
            context.explain(&|| format!("Client configured to connect to {}", address));
        }

        Ok(store)
    }

    /// Restart the idle-shutdown window. Called after every completed search
    /// and on every configuration failure.
    pub async fn schedule_idle_shutdown(&self) {
        let mut inner = self.inner.lock().await;
        self.schedule_shutdown_locked(&mut inner);
    }

    fn schedule_shutdown_locked(&self, inner: &mut LifecycleInner) {
        inner.epoch += 1;
        let epoch = inner.epoch;
        let handle = Arc::clone(&self.inner);
        let delay = self.idle_shutdown;

        // Scheduling a new teardown supersedes the pending one: stale tasks
        // wake, see a newer epoch, and do nothing.
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = handle.lock().await;
            if inner.epoch == epoch && matches!(inner.state, LifecycleState::Configured(_)) {
                debug!("Idle window elapsed, shutting down secret store client");
                inner.state = LifecycleState::ShutDown;
            }
        });
    }

    /// Whether a live client is currently held. Exposed for tests and host
    /// instrumentation.
    pub async fn is_configured(&self) -> bool {
        matches!(self.inner.lock().await.state, LifecycleState::Configured(_))
    }
}
