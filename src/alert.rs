// src/alert.rs
use std::collections::HashSet;

use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::AlertError;

/// One raw FIM alert, tagged by the collector that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAlert {
    Linux(LinuxAlert),
    Windows(WindowsAlert),
}

/// An inotify watch event from the Linux watcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinuxAlert {
    /// `<CODE>` or `<CODE>|IN_ISDIR`.
    pub change: String,
    pub path: String,
    pub name: String,
    /// The watched directory.
    pub tag: String,
    /// `Some(Value::Null)` when the key is present with a null value.
    #[serde(default, deserialize_with = "present")]
    pub contents: Option<Value>,
    /// Absent for deletions, since there is nothing left to stat.
    #[serde(default, deserialize_with = "truthy_stats")]
    pub stats: Option<FileStats>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub checksum_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileStats {
    pub inode: Value,
    pub mode: Value,
    pub ctime: Value,
    pub mtime: Value,
    /// Bytes.
    pub size: f64,
    /// Name or numeric id, whichever the watcher reported.
    pub user: Value,
    pub group: Value,
}

/// An object-access audit record from the Windows collector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowsAlert {
    #[serde(rename = "Accesses")]
    pub accesses: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "Object Name")]
    pub object_name: String,
}

/// Any falsy value (`null`, `false`, `0`, `""`, `[]`, `{}`) means "no stat data".
fn truthy_stats<'de, D>(deserializer: D) -> Result<Option<FileStats>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !is_truthy(&value) {
        return Ok(None);
    }
    FileStats::deserialize(value).map(Some).map_err(serde::de::Error::custom)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing key falls back
/// to the field default.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RawAlert {
    /// Decide the platform once, at the ingestion boundary.
    pub fn from_value(value: &Value) -> Result<Self, AlertError> {
        let map = value.as_object().ok_or(AlertError::NotAnObject)?;
        if map.contains_key(crate::F_CHANGE) {
            serde_json::from_value(value.clone())
                .map(RawAlert::Linux)
                .map_err(|source| AlertError::Malformed { platform: "linux", source })
        } else {
            serde_json::from_value(value.clone())
                .map(RawAlert::Windows)
                .map_err(|source| AlertError::Malformed { platform: "windows", source })
        }
    }
}

/// Flatten a batch of job-return items into one ordered list of alerts.
///
/// Each item is either a single alert or a list of alerts; only one level is
/// flattened.
pub fn extract_alerts(batch: &[Value]) -> Vec<Value> {
    let mut alerts = Vec::with_capacity(batch.len());
    for item in batch {
        match item {
            Value::Array(list) => alerts.extend(list.iter().cloned()),
            other => alerts.push(other.clone()),
        }
    }
    alerts
}

/// Integral floats hash like the equal integer, so `1.0` and `1` match.
fn number_key(n: &Number) -> String {
    match n.as_f64() {
        // 2^53: every integer below this is exact in an f64
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Content signature of a JSON value, independent of object key order.
pub fn alert_signature(value: &Value) -> String {
    fn feed(hasher: &mut Sha256, value: &Value) {
        match value {
            Value::Null => hasher.update(b"n"),
            Value::Bool(b) => hasher.update(if *b { b"t" } else { b"f" }),
            Value::Number(n) => {
                hasher.update(b"#");
                hasher.update(number_key(n).as_bytes());
                hasher.update(b";");
            }
            Value::String(s) => {
                hasher.update(b"s");
                hasher.update((s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
            Value::Array(items) => {
                hasher.update(b"[");
                hasher.update((items.len() as u64).to_le_bytes());
                for item in items {
                    feed(hasher, item);
                }
            }
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                hasher.update(b"{");
                hasher.update((keys.len() as u64).to_le_bytes());
                for key in keys {
                    hasher.update((key.len() as u64).to_le_bytes());
                    hasher.update(key.as_bytes());
                    feed(hasher, &map[key.as_str()]);
                }
            }
        }
    }

    let mut hasher = Sha256::new();
    feed(&mut hasher, value);
    format!("{:x}", hasher.finalize())
}

/// Drop every alert that has a structurally equal alert later in the batch.
///
/// The surviving copy of a duplicate is the last one, so its position is
/// the one kept in the output order.
pub fn dedup_alerts(alerts: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::with_capacity(alerts.len());
    let mut kept: Vec<Value> = alerts
        .into_iter()
        .rev()
        .filter(|alert| seen.insert(alert_signature(alert)))
        .collect();
    kept.reverse();
    kept
}
