// src/main.rs
mod actions;
mod alert;
mod config;
mod destination;
mod dispatch;
mod error;
mod event;
mod identity;
mod path;
mod processor;

use std::{fs, io, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{load_file, ConfigStore};
use dispatch::HttpTransport;
use identity::Grains;
use processor::{parse_job_return, run_cycle, CycleContext};

pub const CONFIG_FILE: &str = "/etc/hubble/hubble";
pub const GRAINS_FILE: &str = "/etc/hubble/grains";

pub const KEY_DELIMITER: char = ':';
pub const KEY_ID: &str = "id";
pub const KEY_LOGSTASH: &str = "hubblestack:returner:logstash";
pub const KEY_LEGACY_PASSWORD: &str = "hubblestack:returner:logstash:password";
pub const KEY_LEGACY_INDEXER: &str = "hubblestack:returner:logstash:indexer";
pub const KEY_LEGACY_PORT: &str = "hubblestack:returner:logstash:port";
pub const KEY_LEGACY_USER: &str = "hubblestack:returner:logstash:user";
pub const KEY_LEGACY_SOURCETYPE: &str = "hubblestack:pulsar:returner:logstash:sourcetype";
pub const KEY_LEGACY_CUSTOM_FIELDS: &str = "hubblestack:pulsar:returner:logstash:custom_fields";
pub const KEY_LEGACY_INDEXER_SSL: &str = "hubblestack:pulsar:returner:logstash:indexer_ssl";
pub const KEY_LEGACY_PROXY: &str = "hubblestack:pulsar:returner:logstash:proxy";
pub const KEY_LEGACY_TIMEOUT: &str = "hubblestack:pulsar:returner:logstash:timeout";

pub const F_RETURN: &str = "return";
pub const F_CHANGE: &str = "change";
pub const CHANGE_TYPE: &str = "filesystem";
pub const WIN_DIRECTORY_HASH: &str = "Item is a directory";

/// Ship a batch of pulsar FIM alerts to the configured Logstash HTTP inputs.
#[derive(Parser, Debug)]
#[command(name = "pulsar-returner", version)]
struct Cli {
    /// Config store (YAML or JSON).
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Grains file with fqdn, ipv4, fqdn_ip4 and cloud_details.
    #[arg(long, default_value = GRAINS_FILE)]
    grains: PathBuf,

    /// Minion id; falls back to the config store `id`, then the grains fqdn.
    #[arg(long)]
    id: Option<String>,

    /// Job return JSON; read from stdin when omitted.
    batch: Option<PathBuf>,
}

fn minion_id(cli_id: Option<String>, store: &ConfigStore, grains: &Grains) -> Result<String> {
    if let Some(id) = cli_id.filter(|id| !id.is_empty()) {
        return Ok(id);
    }
    if let Some(id) = store.get_str(KEY_ID).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    match grains.fqdn.as_deref().filter(|f| !f.is_empty()) {
        Some(fqdn) => Ok(fqdn.to_string()),
        None => bail!("no minion id: pass --id or set `{KEY_ID}` in {CONFIG_FILE}"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store = ConfigStore::load(&cli.config).context("failed to load config store")?;
    let grains: Grains = load_file(&cli.grains).context("failed to load grains")?;
    let minion_id = minion_id(cli.id, &store, &grains)?;

    let raw = match &cli.batch {
        Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("failed to read job return from stdin")?,
    };
    let batch = parse_job_return(&raw)?;

    let transport = HttpTransport::new()?;
    let ctx = CycleContext { store, grains, minion_id };
    let report = run_cycle(&batch, &ctx, &transport)?;

    for failure in &report.failures {
        error!(url = %failure.url, event = failure.event, error = %failure.error, "event not delivered");
    }
    if !report.failures.is_empty() {
        bail!("{} deliveries failed", report.failures.len());
    }
    Ok(())
}
