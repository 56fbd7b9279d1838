// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Failures loading the config store or the grains file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A raw alert that cannot be turned into a `RawAlert`.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert is not a JSON object")]
    NotAnObject,

    #[error("malformed {platform} alert: {source}")]
    Malformed {
        platform: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("grains carry no IPv4 address (fqdn_ip4 and ipv4 are both empty)")]
    NoIpv4,
}

/// Delivery of one payload to one destination failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid proxy {url:?}: {source}")]
    Proxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("POST {url} failed: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors that abort a whole delivery cycle.
#[derive(Debug, Error)]
pub enum PulsarError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("failed to parse job return: {0}")]
    Batch(#[from] serde_json::Error),

    #[error("failed to encode event: {0}")]
    Enrich(#[source] serde_json::Error),
}
