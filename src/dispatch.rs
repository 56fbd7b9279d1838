// src/dispatch.rs
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Proxy;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::destination::{Destination, DEFAULT_TIMEOUT};
use crate::error::DeliveryError;

pub type DeliveryResult = Result<(), DeliveryError>;

/// Body of one POST to `/hubble/pulsar`.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub host: &'a str,
    pub index: Option<&'a str>,
    pub sourcetype: &'a str,
    pub event: &'a Map<String, Value>,
}

/// The delivery contract. Implementations must not retry.
pub trait Transport: Sync {
    fn post(&self, destination: &Destination, payload: &Payload<'_>) -> DeliveryResult;
}

/// Build the payload for one (event, destination) pair and hand it off.
///
/// Only the transport's error is surfaced; the response body is never read.
pub fn dispatch(
    event: &Map<String, Value>,
    destination: &Destination,
    host: &str,
    transport: &dyn Transport,
) -> DeliveryResult {
    let payload = Payload {
        host,
        index: destination.index.as_deref(),
        sourcetype: &destination.sourcetype,
        event,
    };
    debug!(indexer = %destination.indexer, sourcetype = %destination.sourcetype, "dispatching event");
    transport.post(destination, &payload)
}

/// Blocking HTTP transport with per-destination auth, timeout and proxy.
pub struct HttpTransport {
    client: Client,
    /// Proxied clients, keyed by destination URL and proxy map.
    proxied: Mutex<HashMap<String, Client>>,
}

impl HttpTransport {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = Client::builder().build().map_err(DeliveryError::Client)?;
        Ok(Self { client, proxied: Mutex::new(HashMap::new()) })
    }

    /// Proxies are client-wide in reqwest, so each proxied destination gets
    /// its own client, built on first use and reused afterwards.
    fn client_for(&self, destination: &Destination) -> Result<Client, DeliveryError> {
        if destination.proxy.is_empty() {
            return Ok(self.client.clone());
        }
        let key = format!("{} {}", destination.url(), Value::Object(destination.proxy.clone()));
        let mut proxied = self.proxied.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = proxied.get(&key) {
            return Ok(client.clone());
        }
        let client = proxied_client(destination)?;
        proxied.insert(key, client.clone());
        Ok(client)
    }
}

fn proxied_client(destination: &Destination) -> Result<Client, DeliveryError> {
    let mut builder = Client::builder();
    for (scheme, url) in &destination.proxy {
        let Some(url) = url.as_str() else {
            warn!(scheme = %scheme, "ignoring non-string proxy url");
            continue;
        };
        let proxy = match scheme.as_str() {
            "http" => Proxy::http(url),
            "https" => Proxy::https(url),
            "all" => Proxy::all(url),
            other => {
                warn!(scheme = %other, "ignoring proxy for unsupported scheme");
                continue;
            }
        }
        .map_err(|source| DeliveryError::Proxy { url: url.to_string(), source })?;
        builder = builder.proxy(proxy);
    }
    builder.build().map_err(DeliveryError::Client)
}

fn request_timeout(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT))
}

impl Transport for HttpTransport {
    fn post(&self, destination: &Destination, payload: &Payload<'_>) -> DeliveryResult {
        let url = destination.url();
        let mut request = self
            .client_for(destination)?
            .post(&url)
            .json(payload)
            .timeout(request_timeout(destination.timeout));
        // a password without a user still authenticates, with an empty user name
        if destination.user.is_some() || destination.password.is_some() {
            request = request.basic_auth(destination.user.as_deref().unwrap_or(""), destination.password.as_ref());
        }

        let response = request
            .send()
            .map_err(|source| DeliveryError::Send { url: url.clone(), source })?;
        if !response.status().is_success() {
            debug!(url = %url, status = response.status().as_u16(), "indexer answered with non-success status");
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every payload; fails for indexers listed in `failing`.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(String, Value)>>,
        pub failing: Vec<String>,
    }

    impl RecordingTransport {
        pub fn failing_for(indexers: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: indexers.iter().map(|s| s.to_string()).collect(),
            }
        }

        pub fn sent(&self) -> Vec<(String, Value)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn post(&self, destination: &Destination, payload: &Payload<'_>) -> DeliveryResult {
            if self.failing.contains(&destination.indexer) {
                let source = Client::new().post("not a url").build().unwrap_err();
                return Err(DeliveryError::Send { url: destination.url(), source });
            }
            let body = serde_json::to_value(payload).unwrap();
            self.sent.lock().unwrap().push((destination.url(), body));
            Ok(())
        }
    }
}
