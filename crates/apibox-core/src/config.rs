use std::path::Path;

use rand::seq::SliceRandom;
use serde::Deserialize;

use crate::allowlist::AllowList;

/// Small fixed table consulted when `iri_server_port` is left empty.
const WELL_KNOWN_NODES: &[&str] = &[
    "https://nodes.iota.org:443",
    "https://nodes.thetangle.org:443",
    "https://iotanode.us:443",
];

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    listen_port: u16,
    #[serde(default)]
    iri_server_port: String,
    #[serde(default)]
    allowed_request: Vec<String>,
    #[serde(default)]
    allowed_worker: Vec<String>,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    standalone: bool,
    #[serde(default)]
    tokens: Vec<String>,
    #[serde(default)]
    limit: i64,
}

/// Fully-validated, immutable startup configuration. Construction parses
/// both allow-lists eagerly: a malformed entry fails `Config::load` before
/// the server binds a socket.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub iri_server_url: String,
    pub allowed_request: AllowList,
    pub allowed_worker: AllowList,
    pub debug: bool,
    pub standalone: bool,
    pub tokens: Vec<String>,
    pub limit: i64,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
        let raw: RawConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> anyhow::Result<Self> {
        let allowed_request = AllowList::parse(&raw.allowed_request)
            .map_err(|e| anyhow::anyhow!("allowed_request: {e}"))?;
        let allowed_worker = AllowList::parse(&raw.allowed_worker)
            .map_err(|e| anyhow::anyhow!("allowed_worker: {e}"))?;

        let iri_server_url = if raw.iri_server_port.trim().is_empty() {
            WELL_KNOWN_NODES
                .choose(&mut rand::thread_rng())
                .expect("WELL_KNOWN_NODES is non-empty")
                .to_string()
        } else {
            raw.iri_server_port
        };

        Ok(Config {
            listen_port: raw.listen_port,
            iri_server_url,
            allowed_request,
            allowed_worker,
            debug: raw.debug,
            standalone: raw.standalone,
            tokens: raw.tokens,
            limit: raw.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backing_node_picks_a_well_known_default() {
        let raw = RawConfig {
            listen_port: 14265,
            iri_server_port: String::new(),
            allowed_request: vec![],
            allowed_worker: vec![],
            debug: false,
            standalone: true,
            tokens: vec![],
            limit: 0,
        };
        let cfg = Config::from_raw(raw).unwrap();
        assert!(WELL_KNOWN_NODES.contains(&cfg.iri_server_url.as_str()));
    }

    #[test]
    fn malformed_allow_list_entry_fails_to_load() {
        let raw = RawConfig {
            listen_port: 14265,
            iri_server_port: "http://127.0.0.1:1".to_string(),
            allowed_request: vec!["not-an-ip".to_string()],
            allowed_worker: vec![],
            debug: false,
            standalone: false,
            tokens: vec![],
            limit: 0,
        };
        assert!(Config::from_raw(raw).is_err());
    }
}
