//! HashiCorp Vault KV implementation of the secret store seam.
//!
//! Paths handed to this store carry the mount prefix (`/secret/app/db-pass`);
//! the first segment is split off as the KV engine mount and the remainder
//! is read through the KV v2 API. An HTTP 404 is a plain miss; any other
//! store answer is a store error and everything below HTTP (DNS, TLS,
//! refused connections) is a connection error.

use crate::config::ConnectionSettings;
use crate::errors::{LookupError, Result};
use crate::store::{SecretRecord, SecretStore, StoreConnector};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::sys::ServerStatus;
use vaultrs::{kv2, sys};

/// Secret store backed by Vault's KV v2 engine.
pub struct VaultKvStore {
    client: VaultClient,
}

impl std::fmt::Debug for VaultKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKvStore").field("client", &"[VaultClient]").finish()
    }
}

impl VaultKvStore {
    /// Build a store from accumulated connection settings.
    ///
    /// # Errors
    ///
    /// [`LookupError::Configuration`] on an invalid address, unreadable TLS
    /// material, or a client that cannot be constructed.
    pub fn new(settings: &ConnectionSettings) -> Result<Self> {
        let mut builder = VaultClientSettingsBuilder::default();

        if let Some(ref address) = settings.address {
            Url::parse(address).map_err(|e| {
                LookupError::config(format!("invalid store address '{}': {}", address, e))
            })?;
            builder.address(address);
        }

        if let Some(ref token) = settings.token {
            builder.token(token.expose_secret());
        }

        if let Some(verify) = settings.ssl_verify {
            builder.verify(verify);
        }

        let ca_certs = collect_ca_certs(settings)?;
        if !ca_certs.is_empty() {
            builder.ca_certs(ca_certs);
        }

        if let Some(ref pem_file) = settings.ssl_pem_file {
            let pem = std::fs::read(pem_file).map_err(|e| {
                LookupError::config(format!(
                    "could not read client certificate '{}': {}",
                    pem_file.display(),
                    e
                ))
            })?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                LookupError::config(format!(
                    "invalid client certificate '{}': {}",
                    pem_file.display(),
                    e
                ))
            })?;
            builder.identity(Some(identity));
        }

        if settings.ssl_ciphers.is_some() {
            // rustls owns cipher policy; the option is kept for merge
            // fidelity but cannot be applied per connection.
            warn!("ssl_ciphers is set but cipher selection is delegated to the TLS backend");
        }

        let client_settings = builder
            .build()
            .map_err(|e| LookupError::config(format!("invalid store configuration: {}", e)))?;

        let client = VaultClient::new(client_settings)
            .map_err(|e| LookupError::config(format!("failed to build store client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SecretStore for VaultKvStore {
    async fn read(&self, path: &str) -> Result<Option<SecretRecord>> {
        let (mount, key) = split_mount(path);
        debug!(mount = %mount, "Reading secret");

        match kv2::read::<Map<String, Value>>(&self.client, mount, key).await {
            Ok(fields) => Ok(Some(SecretRecord::new(fields, format!("/{}", mount)))),
            Err(ClientError::APIError { code: 404, .. }) => Ok(None),
            Err(e) => Err(map_client_error(e)),
        }
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>> {
        let (mount, key) = split_mount(path);
        debug!(mount = %mount, "Listing secrets");

        match kv2::list(&self.client, mount, key).await {
            Ok(entries) => Ok(Some(entries)),
            Err(ClientError::APIError { code: 404, .. }) => Ok(None),
            Err(e) => Err(map_client_error(e)),
        }
    }

    async fn sealed(&self) -> Result<bool> {
        match sys::status(&self.client).await {
            Ok(ServerStatus::SEALED) => Ok(true),
            Ok(_) => Ok(false),
            Err(e) => Err(map_client_error(e)),
        }
    }
}

/// Builds [`VaultKvStore`]s for the client lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultConnector;

#[async_trait]
impl StoreConnector for VaultConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Arc<dyn SecretStore>> {
        Ok(Arc::new(VaultKvStore::new(settings)?))
    }
}

/// Split a joined lookup path into its KV mount and the key below it.
fn split_mount(path: &str) -> (&str, &str) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((mount, key)) => (mount, key),
        None => (trimmed, ""),
    }
}

/// Gather CA material: an explicit CA file plus every file in the CA
/// directory, in name order.
fn collect_ca_certs(settings: &ConnectionSettings) -> Result<Vec<String>> {
    let mut certs = Vec::new();

    if let Some(ref ca_cert) = settings.ssl_ca_cert {
        certs.push(ca_cert.display().to_string());
    }

    if let Some(ref ca_path) = settings.ssl_ca_path {
        let entries = std::fs::read_dir(ca_path).map_err(|e| {
            LookupError::config(format!(
                "could not read CA directory '{}': {}",
                ca_path.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LookupError::config(format!(
                    "could not read CA directory '{}': {}",
                    ca_path.display(),
                    e
                ))
            })?;
            let path = entry.path();
            if path.is_file() {
                files.push(path.display().to_string());
            }
        }
        files.sort();
        certs.extend(files);
    }

    Ok(certs)
}

fn map_client_error(error: ClientError) -> LookupError {
    match error {
        ClientError::APIError { code, errors } => {
            LookupError::store(format!("HTTP {}: {}", code, errors.join(", ")))
        }
        other => LookupError::connection(other.to_string()),
    }
}
