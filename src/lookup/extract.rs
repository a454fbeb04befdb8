//! Field extraction and parsing policy.
//!
//! Given a found secret's field map, either project a single named field out
//! of it (optionally JSON-decoding the value) or return the whole map with
//! keys coerced to strings and nested structures stringified recursively.

use crate::config::{DefaultFieldBehavior, DefaultFieldParse, LookupOptions};
use crate::lookup::context::LookupContext;
use crate::store::SecretRecord;
use serde_json::{Map, Value};

/// Extract a usable value from one secret, per the lookup's options.
///
/// Returns `None` when the secret yields no usable value from this mount
/// (the configured `default_field` is absent, or its value is null), in
/// which case the mount search moves on to the next mount.
pub fn extract_value(
    record: &SecretRecord,
    options: &LookupOptions,
    context: &dyn LookupContext,
) -> Option<Value> {
    if let Some(field) = &options.default_field {
        // `only` restricts projection to pure single-field secrets so
        // multi-field secrets are returned whole instead of silently
        // truncated.
        let projects = match options.default_field_behavior {
            Some(DefaultFieldBehavior::Only) => {
                record.fields.contains_key(field) && record.fields.len() == 1
            }
            Some(DefaultFieldBehavior::Ignore) | None => true,
        };

        if projects {
            let raw = record.fields.get(field)?;
            let value = parse_field_value(raw, options, context);
            // A null field value is not a usable answer; the mount search
            // must move on instead of resolving to null here.
            if value.is_null() {
                return None;
            }
            return Some(value);
        }
    }

    Some(Value::Object(stringify_fields(&record.fields)))
}

/// Apply the `default_field_parse` policy to a projected field value.
fn parse_field_value(raw: &Value, options: &LookupOptions, context: &dyn LookupContext) -> Value {
    if options.default_field_parse != Some(DefaultFieldParse::Json) {
        return raw.clone();
    }

    let Value::String(text) = raw else {
        // Nothing to decode; non-string values pass through.
        return raw.clone();
    };

    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            context.explain(&|| format!("Could not parse string as json: {}", e));
            raw.clone()
        }
    }
}

/// Copy a field map with every key coerced to a string and every nested
/// map/sequence processed the same way. Scalars other than strings pass
/// through unchanged. Idempotent.
pub fn stringify_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields.iter().map(|(k, v)| (k.clone(), stringify_value(v))).collect()
}

fn stringify_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(stringify_fields(map)),
        Value::Array(items) => Value::Array(items.iter().map(stringify_value).collect()),
        other => other.clone(),
    }
}
