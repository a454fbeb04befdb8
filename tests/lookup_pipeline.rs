//! End-to-end lookup pipeline tests over an in-memory secret store.

use async_trait::async_trait;
use hiera_vault::{
    LookupContext, LookupError, LookupOutcome, Result, SecretRecord, SecretStore, StoreConnector,
    VaultBackend,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Context that records every explanation for assertions.
#[derive(Default)]
struct RecordingContext {
    messages: Mutex<Vec<String>>,
}

impl RecordingContext {
    fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

impl LookupContext for RecordingContext {
    fn explain(&self, message: &dyn Fn() -> String) {
        self.messages.lock().unwrap().push(message());
    }
}

struct MemoryStore {
    secrets: HashMap<String, Map<String, Value>>,
    listings: HashMap<String, Vec<String>>,
    sealed: bool,
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<Option<SecretRecord>> {
        Ok(self.secrets.get(path).map(|fields| SecretRecord::new(fields.clone(), path)))
    }

    async fn list(&self, path: &str) -> Result<Option<Vec<String>>> {
        Ok(self.listings.get(path).cloned())
    }

    async fn sealed(&self) -> Result<bool> {
        Ok(self.sealed)
    }
}

#[derive(Default)]
struct MemoryConnector {
    secrets: HashMap<String, Map<String, Value>>,
    listings: HashMap<String, Vec<String>>,
    sealed: AtomicBool,
    connects: AtomicUsize,
}

impl MemoryConnector {
    fn with_secret(mut self, path: &str, fields: Value) -> Self {
        let Value::Object(map) = fields else { panic!("expected object") };
        self.secrets.insert(path.to_string(), map);
        self
    }

    fn with_listing(mut self, path: &str, entries: &[&str]) -> Self {
        self.listings.insert(path.to_string(), entries.iter().map(|s| s.to_string()).collect());
        self
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(
        &self,
        _settings: &hiera_vault::ConnectionSettings,
    ) -> Result<Arc<dyn SecretStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryStore {
            secrets: self.secrets.clone(),
            listings: self.listings.clone(),
            sealed: self.sealed.load(Ordering::SeqCst),
        }))
    }
}

fn options(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

#[tokio::test]
async fn key_lookup_searches_mounts_in_order() {
    let connector = Arc::new(
        MemoryConnector::default()
            .with_secret("/secret/db-pass", json!({ "value": "from-secret" }))
            .with_secret("/puppet/db-pass", json!({ "value": "from-puppet" })),
    );
    let backend = VaultBackend::with_connector(connector);
    let ctx = RecordingContext::default();
    let opts = options(json!({
        "mounts": { "generic": ["/puppet", "/secret"] },
        "default_field": "value"
    }));

    let outcome = backend.lookup_key("vault_key::db-pass", &opts, &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Found(json!("from-puppet")));
    assert!(ctx.contains("Looking in path /puppet/db-pass"));
    assert!(ctx.contains("Read secret: db-pass"));
}

#[tokio::test]
async fn key_lookup_returns_whole_secret_without_default_field() {
    let connector = Arc::new(MemoryConnector::default().with_secret(
        "/secret/db-creds",
        json!({ "user": "app", "password": "hunter2" }),
    ));
    let backend = VaultBackend::with_connector(connector);
    let ctx = RecordingContext::default();
    let opts = options(json!({}));

    let outcome = backend.lookup_key("vault_key::db-creds", &opts, &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Found(json!({ "user": "app", "password": "hunter2" })));
}

#[tokio::test]
async fn key_lookup_strips_configured_patterns() {
    let connector = Arc::new(
        MemoryConnector::default().with_secret("/secret/db-pass", json!({ "value": "x" })),
    );
    let backend = VaultBackend::with_connector(connector);
    let ctx = RecordingContext::default();
    let opts = options(json!({
        "strip_from_keys": ["^profiles-"],
        "default_field": "value"
    }));

    let outcome = backend.lookup_key("vault_key::profiles-db-pass", &opts, &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Found(json!("x")));
}

#[tokio::test]
async fn list_lookup_keeps_last_mount_result() {
    let connector = Arc::new(
        MemoryConnector::default()
            .with_listing("/puppet/apps", &["one", "two"])
            .with_listing("/secret/apps", &["three"]),
    );
    let backend = VaultBackend::with_connector(connector);
    let ctx = RecordingContext::default();
    let opts = options(json!({ "mounts": { "generic": ["/puppet", "/secret"] } }));

    let outcome = backend.lookup_key("vault_list::apps", &opts, &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Found(json!(["three"])));
}

#[tokio::test]
async fn untagged_key_is_rejected() {
    let backend = VaultBackend::with_connector(Arc::new(MemoryConnector::default()));
    let ctx = RecordingContext::default();

    let outcome = backend.lookup_key("classes", &options(json!({})), &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Rejected);
}

#[tokio::test]
async fn miss_answers_null_by_default() {
    let backend = VaultBackend::with_connector(Arc::new(MemoryConnector::default()));
    let ctx = RecordingContext::default();

    let outcome =
        backend.lookup_key("vault_key::missing", &options(json!({})), &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::Found(Value::Null));
}

#[tokio::test]
async fn miss_passes_through_when_continue_is_set() {
    let backend = VaultBackend::with_connector(Arc::new(MemoryConnector::default()));
    let ctx = RecordingContext::default();
    let opts = options(json!({ "continue_if_not_found": true }));

    let outcome = backend.lookup_key("vault_key::missing", &opts, &ctx).await.unwrap();
    assert_eq!(outcome, LookupOutcome::NotFound);
}

#[tokio::test]
async fn sealed_store_fails_the_lookup() {
    let connector = Arc::new(
        MemoryConnector::default().with_secret("/secret/db-pass", json!({ "value": "x" })),
    );
    connector.sealed.store(true, Ordering::SeqCst);
    let backend = VaultBackend::with_connector(connector);
    let ctx = RecordingContext::default();

    let err =
        backend.lookup_key("vault_key::db-pass", &options(json!({})), &ctx).await.unwrap_err();
    assert!(matches!(err, LookupError::Configuration { .. }));
    assert!(err.to_string().contains("vault is sealed"));
}

#[tokio::test]
async fn client_is_reused_across_lookups() {
    let connector = Arc::new(
        MemoryConnector::default().with_secret("/secret/db-pass", json!({ "value": "x" })),
    );
    let backend = VaultBackend::with_connector(connector.clone());
    let ctx = RecordingContext::default();
    let opts = options(json!({ "address": "https://vault:8200", "default_field": "value" }));

    backend.lookup_key("vault_key::db-pass", &opts, &ctx).await.unwrap();
    backend.lookup_key("vault_key::db-pass", &opts, &ctx).await.unwrap();

    assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn client_shuts_down_after_idle_window() {
    let connector = Arc::new(
        MemoryConnector::default().with_secret("/secret/db-pass", json!({ "value": "x" })),
    );
    let backend = VaultBackend::with_connector(connector.clone());
    let ctx = RecordingContext::default();
    let opts = options(json!({ "default_field": "value" }));

    backend.lookup_key("vault_key::db-pass", &opts, &ctx).await.unwrap();
    assert!(backend.lifecycle().is_configured().await);

    tokio::task::yield_now().await;
    tokio::time::advance(hiera_vault::store::DEFAULT_IDLE_SHUTDOWN + std::time::Duration::from_millis(1))
        .await;
    tokio::task::yield_now().await;
    assert!(!backend.lifecycle().is_configured().await);

    // The next lookup reconnects transparently.
    backend.lookup_key("vault_key::db-pass", &opts, &ctx).await.unwrap();
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
}
