// src/destination.rs
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ConfigStore;

pub const DEFAULT_PORT: &str = "8080";
pub const DEFAULT_SOURCETYPE: &str = "hubble_fim";
pub const DEFAULT_TIMEOUT: f64 = 9.05;

/// One Logstash HTTP input to deliver events to.
#[derive(Clone, PartialEq)]
pub struct Destination {
    pub indexer: String,
    pub port: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub index: Option<String>,
    pub sourcetype: String,
    /// Carried for the transport's benefit, not interpreted here.
    pub custom_fields: Vec<String>,
    pub indexer_ssl: bool,
    /// `requests`-style scheme to proxy URL map.
    pub proxy: Map<String, Value>,
    /// Seconds.
    pub timeout: f64,
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("indexer", &self.indexer)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("index", &self.index)
            .field("sourcetype", &self.sourcetype)
            .field("custom_fields", &self.custom_fields)
            .field("indexer_ssl", &self.indexer_ssl)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Destination {
    pub fn url(&self) -> String {
        format!("{}:{}/hubble/pulsar", self.indexer, self.port)
    }
}

/// One destination entry as written in the config store.
#[derive(Deserialize)]
struct LogstashOpts {
    indexer: Option<String>,
    #[serde(default, deserialize_with = "port_string")]
    port: Option<String>,
    user: Option<String>,
    password: Option<String>,
    index: Option<String>,
    #[serde(rename = "sourcetype_pulsar")]
    sourcetype: Option<String>,
    custom_fields: Option<Vec<String>>,
    indexer_ssl: Option<bool>,
    proxy: Option<Map<String, Value>>,
    timeout: Option<f64>,
}

/// Ports show up as either `8080` or `"8080"`.
fn port_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl LogstashOpts {
    fn into_destination(self) -> Option<Destination> {
        let indexer = self.indexer.filter(|i| !i.is_empty())?;
        Some(Destination {
            indexer,
            port: self.port.unwrap_or_else(|| DEFAULT_PORT.to_string()),
            user: self.user,
            password: self.password,
            index: self.index,
            sourcetype: self.sourcetype.unwrap_or_else(|| DEFAULT_SOURCETYPE.to_string()),
            custom_fields: self.custom_fields.unwrap_or_default(),
            indexer_ssl: self.indexer_ssl.unwrap_or(true),
            proxy: self.proxy.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

fn parse_entry(entry: &Value) -> Option<Destination> {
    match LogstashOpts::deserialize(entry) {
        Ok(opts) => {
            let dest = opts.into_destination();
            if dest.is_none() {
                warn!("skipping logstash destination without an indexer");
            }
            dest
        }
        Err(e) => {
            warn!(error = %e, "skipping malformed logstash destination");
            None
        }
    }
}

/// Rebuild a single entry from the deprecated flat keys.
fn legacy_entry(store: &ConfigStore) -> Value {
    let pairs = [
        ("password", crate::KEY_LEGACY_PASSWORD),
        ("indexer", crate::KEY_LEGACY_INDEXER),
        ("sourcetype_pulsar", crate::KEY_LEGACY_SOURCETYPE),
        ("port", crate::KEY_LEGACY_PORT),
        ("user", crate::KEY_LEGACY_USER),
        ("custom_fields", crate::KEY_LEGACY_CUSTOM_FIELDS),
        ("indexer_ssl", crate::KEY_LEGACY_INDEXER_SSL),
        ("proxy", crate::KEY_LEGACY_PROXY),
        ("timeout", crate::KEY_LEGACY_TIMEOUT),
    ];
    let mut entry = Map::new();
    for (field, key) in pairs {
        if let Some(value) = store.get(key) {
            entry.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(entry)
}

/// Expand configured destinations. An empty result means "unconfigured".
pub fn resolve_destinations(store: &ConfigStore) -> Vec<Destination> {
    let entries = match store.get(crate::KEY_LOGSTASH) {
        Some(Value::Array(list)) if !list.is_empty() => list.clone(),
        Some(Value::Object(map)) if !map.is_empty() => vec![Value::Object(map.clone())],
        Some(Value::Array(_)) | Some(Value::Object(_)) | None => {
            debug!("no aggregated logstash config, trying legacy keys");
            if store.get(crate::KEY_LEGACY_INDEXER).is_none() {
                return Vec::new();
            }
            vec![legacy_entry(store)]
        }
        Some(other) => {
            warn!(value = %other, "logstash returner config is neither a mapping nor a list");
            return Vec::new();
        }
    };
    entries.iter().filter_map(parse_entry).collect()
}
