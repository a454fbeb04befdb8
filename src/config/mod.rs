//! # Lookup Configuration
//!
//! Typed view of the option bag the host framework hands to this backend on
//! every lookup. The raw input is an untyped JSON map; it is parsed into
//! [`LookupOptions`] exactly once per invocation, failing fast on invalid
//! enum values or wrongly typed options before any store access happens.

pub mod secret;

pub use secret::SecretString;

use crate::errors::{LookupError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Mount searched when the options carry no `mounts.generic` list.
pub const DEFAULT_MOUNT: &str = "/secret";

/// Governs when `default_field` projection applies to a found secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultFieldBehavior {
    /// Project the default field regardless of what else the secret holds.
    Ignore,
    /// Project only when the secret is a pure single-field secret holding
    /// exactly that field; multi-field secrets are returned whole.
    Only,
}

impl DefaultFieldBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Only => "only",
        }
    }
}

impl FromStr for DefaultFieldBehavior {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "only" => Ok(Self::Only),
            other => Err(format!(
                "invalid value for default_field_behavior: '{}', should be one of 'ignore','only'",
                other
            )),
        }
    }
}

impl fmt::Display for DefaultFieldBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Governs post-projection parsing of the default field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultFieldParse {
    /// Keep the raw string value.
    String,
    /// Attempt to decode the value as JSON; parse failures keep the raw
    /// string instead of failing the lookup.
    Json,
}

impl DefaultFieldParse {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Json => "json",
        }
    }
}

impl FromStr for DefaultFieldParse {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid value for default_field_parse: '{}', should be one of 'string','json'",
                other
            )),
        }
    }
}

impl fmt::Display for DefaultFieldParse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection options present in a single lookup's option bag.
///
/// Every field is optional: options absent from one lookup must not reset
/// values applied by an earlier lookup (see [`ConnectionSettings::merge`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOptions {
    pub address: Option<String>,
    pub token: Option<SecretString>,
    pub ssl_pem_file: Option<PathBuf>,
    pub ssl_verify: Option<bool>,
    pub ssl_ca_cert: Option<PathBuf>,
    pub ssl_ca_path: Option<PathBuf>,
    pub ssl_ciphers: Option<String>,
}

impl ConnectionOptions {
    /// Whether this lookup carried any connection option at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Accumulated connection configuration, persisted across lookups.
///
/// The merge discipline matches the source behavior: each lookup overlays
/// only the options it actually carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSettings {
    pub address: Option<String>,
    pub token: Option<SecretString>,
    pub ssl_pem_file: Option<PathBuf>,
    pub ssl_verify: Option<bool>,
    pub ssl_ca_cert: Option<PathBuf>,
    pub ssl_ca_path: Option<PathBuf>,
    pub ssl_ciphers: Option<String>,
}

impl ConnectionSettings {
    /// Seed settings from the conventional Vault environment variables, so a
    /// host that configures the store purely through the environment works
    /// without per-lookup connection options.
    pub fn from_env() -> Self {
        Self {
            address: std::env::var("VAULT_ADDR").ok(),
            token: std::env::var("VAULT_TOKEN").ok().map(SecretString::from),
            ..Self::default()
        }
    }

    /// Overlay the options present in one lookup. Absent options never reset
    /// previously applied values. Returns true when anything changed.
    pub fn merge(&mut self, opts: &ConnectionOptions) -> bool {
        let before = self.clone();

        if let Some(ref address) = opts.address {
            self.address = Some(address.clone());
        }
        if let Some(ref token) = opts.token {
            self.token = Some(token.clone());
        }
        if let Some(ref pem) = opts.ssl_pem_file {
            self.ssl_pem_file = Some(pem.clone());
        }
        if let Some(verify) = opts.ssl_verify {
            self.ssl_verify = Some(verify);
        }
        if let Some(ref ca_cert) = opts.ssl_ca_cert {
            self.ssl_ca_cert = Some(ca_cert.clone());
        }
        if let Some(ref ca_path) = opts.ssl_ca_path {
            self.ssl_ca_path = Some(ca_path.clone());
        }
        if let Some(ref ciphers) = opts.ssl_ciphers {
            self.ssl_ciphers = Some(ciphers.clone());
        }

        *self != before
    }
}

/// Typed per-lookup options, parsed from the host's raw option map.
#[derive(Debug, Clone)]
pub struct LookupOptions {
    /// Store connection options carried by this lookup.
    pub connection: ConnectionOptions,
    /// Ordered mount search path; order defines priority.
    pub mounts: Vec<String>,
    /// Patterns removed (all non-overlapping occurrences) from the bare key,
    /// applied in list order.
    pub strip_from_keys: Vec<Regex>,
    /// Field to project out of a found secret.
    pub default_field: Option<String>,
    pub default_field_behavior: Option<DefaultFieldBehavior>,
    pub default_field_parse: Option<DefaultFieldParse>,
    /// Whether a miss here defers to the next configuration source.
    pub continue_if_not_found: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            connection: ConnectionOptions::default(),
            mounts: vec![DEFAULT_MOUNT.to_string()],
            strip_from_keys: Vec::new(),
            default_field: None,
            default_field_behavior: None,
            default_field_parse: None,
            continue_if_not_found: false,
        }
    }
}

impl LookupOptions {
    /// Parse and validate the host's option map.
    ///
    /// # Errors
    ///
    /// [`LookupError::Configuration`] on wrongly typed options, invalid
    /// behavior/parse enum values, or malformed strip patterns. Validation
    /// happens here, before any store access.
    pub fn from_map(options: &Map<String, Value>) -> Result<Self> {
        let connection = ConnectionOptions {
            address: opt_string(options, "address")?,
            token: opt_string(options, "token")?.map(SecretString::from),
            ssl_pem_file: opt_string(options, "ssl_pem_file")?.map(PathBuf::from),
            ssl_verify: opt_bool(options, "ssl_verify")?,
            ssl_ca_cert: opt_string(options, "ssl_ca_cert")?.map(PathBuf::from),
            ssl_ca_path: opt_string(options, "ssl_ca_path")?.map(PathBuf::from),
            ssl_ciphers: opt_string(options, "ssl_ciphers")?,
        };

        let mounts = parse_mounts(options)?;
        let strip_from_keys = parse_strip_patterns(options)?;

        let default_field = opt_string(options, "default_field")?;
        let default_field_behavior = opt_string(options, "default_field_behavior")?
            .map(|s| s.parse::<DefaultFieldBehavior>())
            .transpose()
            .map_err(LookupError::config)?;
        let default_field_parse = opt_string(options, "default_field_parse")?
            .map(|s| s.parse::<DefaultFieldParse>())
            .transpose()
            .map_err(LookupError::config)?;

        let continue_if_not_found = opt_bool(options, "continue_if_not_found")?.unwrap_or(false);

        Ok(Self {
            connection,
            mounts,
            strip_from_keys,
            default_field,
            default_field_behavior,
            default_field_parse,
            continue_if_not_found,
        })
    }
}

fn parse_mounts(options: &Map<String, Value>) -> Result<Vec<String>> {
    let generic = match options.get("mounts") {
        None | Some(Value::Null) => None,
        Some(Value::Object(mounts)) => match mounts.get("generic") {
            None | Some(Value::Null) => None,
            Some(Value::Array(entries)) => {
                let mut paths = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Value::String(path) => paths.push(path.clone()),
                        other => {
                            return Err(LookupError::config(format!(
                                "mounts.generic entries must be strings, got: {}",
                                other
                            )))
                        }
                    }
                }
                Some(paths)
            }
            Some(other) => {
                return Err(LookupError::config(format!(
                    "mounts.generic must be an array, got: {}",
                    other
                )))
            }
        },
        Some(other) => {
            return Err(LookupError::config(format!("mounts must be a map, got: {}", other)))
        }
    };

    match generic {
        Some(paths) if !paths.is_empty() => Ok(paths),
        _ => Ok(vec![DEFAULT_MOUNT.to_string()]),
    }
}

fn parse_strip_patterns(options: &Map<String, Value>) -> Result<Vec<Regex>> {
    let entries = match options.get("strip_from_keys") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(LookupError::config("strip_from_keys must be an array")),
    };

    let mut patterns = Vec::with_capacity(entries.len());
    for entry in entries {
        let pattern = entry.as_str().ok_or_else(|| {
            LookupError::config(format!("strip_from_keys entries must be strings, got: {}", entry))
        })?;
        let regex = Regex::new(pattern).map_err(|e| {
            LookupError::config(format!("invalid strip_from_keys pattern '{}': {}", pattern, e))
        })?;
        patterns.push(regex);
    }
    Ok(patterns)
}

fn opt_string(options: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => {
            Err(LookupError::config(format!("option '{}' must be a string, got: {}", name, other)))
        }
    }
}

fn opt_bool(options: &Map<String, Value>, name: &str) -> Result<Option<bool>> {
    match options.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => {
            Err(LookupError::config(format!("option '{}' must be a boolean, got: {}", name, other)))
        }
    }
}
