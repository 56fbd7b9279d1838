// src/processor.rs
use std::thread;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::alert::{dedup_alerts, extract_alerts, RawAlert};
use crate::config::ConfigStore;
use crate::destination::{resolve_destinations, Destination};
use crate::dispatch::{dispatch, Transport};
use crate::error::{DeliveryError, PulsarError};
use crate::event::normalize;
use crate::identity::{enrich, Grains, Identity};

/// Everything a delivery cycle reads from the outside world.
pub struct CycleContext {
    pub store: ConfigStore,
    pub grains: Grains,
    pub minion_id: String,
}

#[derive(Debug)]
pub struct DeliveryFailure {
    pub url: String,
    /// Position of the event within the cycle.
    pub event: usize,
    pub error: DeliveryError,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub alerts: usize,
    pub events: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

/// Pull the alert batch out of a job return.
///
/// Accepts `{"return": [...]}` or a bare list. A missing or empty `return`
/// is an empty batch.
pub fn parse_job_return(raw: &str) -> Result<Vec<Value>, PulsarError> {
    let batch = match serde_json::from_str::<Value>(raw)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(crate::F_RETURN) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => vec![other],
        },
        other => vec![other],
    };
    Ok(batch)
}

/// Run one delivery cycle over one batch.
pub fn run_cycle(
    batch: &[Value],
    ctx: &CycleContext,
    transport: &dyn Transport,
) -> Result<CycleReport, PulsarError> {
    let mut report = CycleReport::default();
    if batch.is_empty() {
        debug!("empty batch, nothing to deliver");
        return Ok(report);
    }

    let destinations = resolve_destinations(&ctx.store);
    if destinations.is_empty() {
        info!("no logstash destinations configured, skipping delivery");
        return Ok(report);
    }

    let alerts = dedup_alerts(extract_alerts(batch));
    report.alerts = alerts.len();

    let mut events = Vec::with_capacity(alerts.len());
    for value in &alerts {
        match RawAlert::from_value(value) {
            Ok(alert) => events.extend(normalize(&alert)),
            Err(e) => warn!(error = %e, "skipping malformed alert"),
        }
    }
    report.events = events.len();
    if events.is_empty() {
        debug!(alerts = report.alerts, "batch normalized to zero events");
        return Ok(report);
    }

    let identity = Identity::resolve(&ctx.grains, &ctx.minion_id)?;
    let enriched = events
        .iter()
        .map(|e| enrich(e, &identity))
        .collect::<Result<Vec<Map<String, Value>>, _>>()
        .map_err(PulsarError::Enrich)?;

    let (delivered, failures) = deliver(&enriched, &destinations, &identity.dest_host, transport);
    report.delivered = delivered;
    report.failures = failures;

    info!(
        alerts = report.alerts,
        events = report.events,
        destinations = destinations.len(),
        delivered = report.delivered,
        failed = report.failures.len(),
        "pulsar delivery cycle finished"
    );
    Ok(report)
}

/// One worker per destination; a slow or failing destination only stalls itself.
fn deliver(
    events: &[Map<String, Value>],
    destinations: &[Destination],
    host: &str,
    transport: &dyn Transport,
) -> (usize, Vec<DeliveryFailure>) {
    thread::scope(|scope| {
        let workers: Vec<_> = destinations
            .iter()
            .map(|dest| {
                let handle = scope.spawn(move || {
                    let mut delivered = 0;
                    let mut failures = Vec::new();
                    for (idx, event) in events.iter().enumerate() {
                        match dispatch(event, dest, host, transport) {
                            Ok(()) => delivered += 1,
                            Err(error) => {
                                warn!(url = %dest.url(), event = idx, error = %error, "delivery failed");
                                failures.push(DeliveryFailure { url: dest.url(), event: idx, error });
                            }
                        }
                    }
                    (delivered, failures)
                });
                (dest, handle)
            })
            .collect();

        let mut delivered = 0;
        let mut failures = Vec::new();
        for (dest, handle) in workers {
            match handle.join() {
                Ok((ok, mut failed)) => {
                    delivered += ok;
                    failures.append(&mut failed);
                }
                Err(_) => warn!(url = %dest.url(), "delivery worker panicked"),
            }
        }
        (delivered, failures)
    })
}
