//! Ordered mount search.
//!
//! Mounts are tried strictly in configured order. Key mode stops at the
//! first mount that yields a usable value; List mode visits every mount and
//! keeps the last one's result. Connection and store failures never abort
//! the lookup: they are explained and the mount counts as a miss.

use crate::config::LookupOptions;
use crate::errors::LookupError;
use crate::lookup::context::LookupContext;
use crate::lookup::extract::extract_value;
use crate::store::{join_path, SecretStore};
use serde_json::Value;
use tracing::debug;

/// Key mode: read each mount in order until one yields a usable extracted
/// value; short-circuit on the first hit.
pub async fn search_key(
    store: &dyn SecretStore,
    bare_key: &str,
    options: &LookupOptions,
    context: &dyn LookupContext,
) -> Option<Value> {
    for mount in &options.mounts {
        let path = join_path(mount, bare_key);
        context.explain(&|| format!("Looking in path {}", path));

        let record = match store.read(&path).await {
            Ok(record) => record,
            Err(e) => {
                explain_read_failure(&path, &e, context);
                continue;
            }
        };

        let Some(record) = record else {
            debug!(path = %path, "No secret at path");
            continue;
        };

        context.explain(&|| format!("Read secret: {}", bare_key));
        if let Some(value) = extract_value(&record, options, context) {
            debug!(path = %path, mount = %record.source_mount, "Resolved secret");
            return Some(value);
        }
    }

    None
}

/// List mode: perform a listing against every mount. Deliberately no
/// short-circuit: the last mount's outcome overwrites the running result,
/// misses included. Compatibility behavior; do not "fix" without a
/// migration path for existing hierarchies.
pub async fn search_list(
    store: &dyn SecretStore,
    bare_key: &str,
    options: &LookupOptions,
    context: &dyn LookupContext,
) -> Option<Value> {
    let mut listing: Option<Vec<String>> = None;

    for mount in &options.mounts {
        let path = join_path(mount, bare_key);
        context.explain(&|| format!("Looking in path {}", path));

        listing = match store.list(&path).await {
            Ok(entries) => entries,
            Err(e) => {
                explain_read_failure(&path, &e, context);
                None
            }
        };
    }

    listing.map(|entries| Value::Array(entries.into_iter().map(Value::String).collect()))
}

fn explain_read_failure(path: &str, error: &LookupError, context: &dyn LookupContext) {
    match error {
        LookupError::Connection { .. } => {
            context.explain(&|| format!("Could not connect to read secret: {}", path));
        }
        _ => {
            context.explain(&|| format!("Could not read secret {}: {}", path, error));
        }
    }
    debug!(path = %path, error = %error, "Mount read failed, continuing");
}
