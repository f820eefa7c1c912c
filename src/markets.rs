//! Static markets list.
//!
//! A JSON object keyed by cluster, each value a list of markets:
//!
//! ```json
//! { "mainnet": [ { "name": "SOL/USDC", "address": "8Bn...", "programId": "srm..." } ] }
//! ```

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::types::{MakerError, MarketDescriptor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketEntry {
    name: String,
    address: String,
    #[serde(default)]
    program_id: Option<String>,
    #[serde(default)]
    base_mint: Option<String>,
    #[serde(default)]
    quote_mint: Option<String>,
}

/// Read the markets file and return the entries for `cluster`.
pub fn load_markets(path: &Path, cluster: &str) -> Result<Vec<MarketDescriptor>, MakerError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        MakerError::Config(format!("cannot read markets file {}: {e}", path.display()))
    })?;
    parse_markets(&contents, cluster)
}

pub fn parse_markets(json: &str, cluster: &str) -> Result<Vec<MarketDescriptor>, MakerError> {
    let mut by_cluster: HashMap<String, Vec<MarketEntry>> = serde_json::from_str(json)
        .map_err(|e| MakerError::Config(format!("invalid markets file: {e}")))?;
    let entries = by_cluster
        .remove(cluster)
        .ok_or_else(|| MakerError::Config(format!("no markets listed for cluster {cluster:?}")))?;

    entries.into_iter().map(descriptor).collect()
}

/// Pick `name` from the list, or the first market when no name is given.
pub fn select_market(
    markets: &[MarketDescriptor],
    name: Option<&str>,
) -> Result<MarketDescriptor, MakerError> {
    let found = match name {
        Some(name) => markets.iter().find(|m| m.name == name),
        None => markets.first(),
    };
    found.cloned().ok_or_else(|| match name {
        Some(name) => MakerError::Config(format!("market {name:?} not in markets list")),
        None => MakerError::Config("markets list is empty".to_string()),
    })
}

fn descriptor(entry: MarketEntry) -> Result<MarketDescriptor, MakerError> {
    let key = |field: &str, value: &str| {
        Pubkey::from_str(value).map_err(|e| {
            MakerError::Config(format!("market {}: invalid {field} {value:?}: {e}", entry.name))
        })
    };
    let optional = |field: &str, value: &Option<String>| value.as_deref().map(|v| key(field, v)).transpose();

    Ok(MarketDescriptor {
        address: key("address", &entry.address)?,
        program_id: optional("programId", &entry.program_id)?,
        base_mint: optional("baseMint", &entry.base_mint)?,
        quote_mint: optional("quoteMint", &entry.quote_mint)?,
        name: entry.name.clone(),
    })
}
