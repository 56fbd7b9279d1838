// src/identity.rs
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::IdentityError;
use crate::event::CanonicalEvent;

/// Host facts supplied by the grains provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Grains {
    #[serde(default)]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub fqdn_ip4: Vec<String>,
    #[serde(default)]
    pub cloud_details: Map<String, Value>,
}

/// Host identity, resolved once per delivery cycle and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub minion_id: String,
    pub dest_host: String,
    pub dest_ip: String,
    pub cloud_details: Map<String, Value>,
}

/// 127.0.0.0/8. Unparseable grains fall back to a prefix check.
fn is_loopback(addr: &str) -> bool {
    match (Ipv4Network::new(Ipv4Addr::new(127, 0, 0, 0), 8), addr.parse::<Ipv4Addr>()) {
        (Ok(net), Ok(ip)) => net.contains(ip),
        _ => addr.starts_with("127."),
    }
}

impl Identity {
    pub fn resolve(grains: &Grains, minion_id: &str) -> Result<Self, IdentityError> {
        let dest_host = grains
            .fqdn
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(minion_id)
            .to_string();

        let mut dest_ip = grains
            .fqdn_ip4
            .first()
            .or_else(|| grains.ipv4.first())
            .cloned()
            .ok_or(IdentityError::NoIpv4)?;

        // The first non-loopback interface wins, whatever network it is on.
        if is_loopback(&dest_ip) {
            if let Some(addr) = grains.ipv4.iter().find(|a| !a.is_empty() && !is_loopback(a)) {
                debug!(loopback = %dest_ip, substitute = %addr, "replacing loopback dest_ip");
                dest_ip = addr.clone();
            }
        }

        Ok(Self {
            minion_id: minion_id.to_string(),
            dest_host,
            dest_ip,
            cloud_details: grains.cloud_details.clone(),
        })
    }
}

/// Merge identity into an event. Identity keys win on collision.
pub fn enrich(event: &CanonicalEvent, identity: &Identity) -> Result<Map<String, Value>, serde_json::Error> {
    let mut fields = match serde_json::to_value(event)? {
        Value::Object(map) => map,
        other => return Err(serde::ser::Error::custom(format!("event serialized to a non-object: {other}"))),
    };
    fields.insert("minion_id".into(), Value::String(identity.minion_id.clone()));
    fields.insert("dest_host".into(), Value::String(identity.dest_host.clone()));
    fields.insert("dest_ip".into(), Value::String(identity.dest_ip.clone()));
    for (key, value) in &identity.cloud_details {
        fields.insert(key.clone(), value.clone());
    }
    Ok(fields)
}
