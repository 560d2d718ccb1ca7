//! Configuration management.
//! Loads settings from a chain-profile .env file. Toggles are consumed once
//! at startup and passed into the governor/optimizer as immutable values.

use crate::types::{ChainId, VenueId};
use crate::validator::RiskPreset;
use alloy::primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::str::FromStr;

/// Trading pair to scan for dual-venue round trips.
#[derive(Debug, Clone, Deserialize)]
pub struct PairConfig {
    pub token0: Address,
    pub token1: Address,
    pub symbol: String,
}

/// Fixed three-hop cycle X -> Y -> Z -> X with one venue per hop.
#[derive(Debug, Clone, Deserialize)]
pub struct TriangleConfig {
    pub tokens: [Address; 3],
    pub venues: [VenueId; 3],
    pub label: String,
}

/// Bridge route for a token present on two chains.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeRouteConfig {
    pub token: Address,
    pub source_chain: ChainId,
    pub dest_chain: ChainId,
    pub bridge: String,
    pub transit_secs_estimate: u64,
    pub fee_bps: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: ChainId,
    /// Contributes 0..=5 to opportunity priority.
    pub preference: u8,
    pub block_time_ms: u64,
}

/// Flash-loan provider entry (kind, contract, liquidity ceiling).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: String,
    pub address: Address,
    pub max_liquidity_native: f64,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub chains: Vec<ChainConfig>,
    pub venues: Vec<VenueId>,
    pub pairs: Vec<PairConfig>,
    pub triangles: Vec<TriangleConfig>,
    pub bridge_routes: Vec<BridgeRouteConfig>,
    /// Token every reference price is quoted against.
    pub quote_token: Address,
    /// Candidate input amounts, native units.
    pub candidate_amounts_native: Vec<f64>,

    // Feature toggles
    pub enable_triangular: bool,
    pub enable_cross_chain: bool,
    pub live_mode: bool,

    // Risk policy
    pub cooldown_ms: u64,
    pub loss_threshold_native: f64,
    pub risk_preset: RiskPreset,
    pub trade_size_native: f64,

    // Scheduling / submission
    pub scan_interval_ms: u64,
    pub max_bridge_transit_secs: u64,
    pub grace_blocks: u64,
    pub max_submit_retries: u32,
    pub max_rpc_retries: u32,

    // Execution surface
    pub executor_address: Address,
    pub providers: Vec<ProviderConfig>,
}

pub fn native_to_wei(native: f64) -> U256 {
    U256::from((native * 1e18) as u128)
}

fn env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} not set", key))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim()).with_context(|| format!("invalid address '{}'", s))
}

/// Parse "addr:addr:SYMBOL,addr:addr:SYMBOL" pair lists.
fn parse_pairs(raw: &str) -> Result<Vec<PairConfig>> {
    let mut pairs = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("invalid trading pair format: '{}'", entry);
        }
        pairs.push(PairConfig {
            token0: parse_address(parts[0])?,
            token1: parse_address(parts[1])?,
            symbol: parts[2].to_string(),
        });
    }
    Ok(pairs)
}

/// Parse "addrX:addrY:addrZ:venue|venue|venue:LABEL" triangle lists.
fn parse_triangles(raw: &str) -> Result<Vec<TriangleConfig>> {
    let mut triangles = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 5 {
            bail!("invalid triangle format: '{}'", entry);
        }
        let venues: Vec<&str> = parts[3].split('|').collect();
        if venues.len() != 3 {
            bail!("triangle '{}' needs exactly 3 venues", entry);
        }
        triangles.push(TriangleConfig {
            tokens: [
                parse_address(parts[0])?,
                parse_address(parts[1])?,
                parse_address(parts[2])?,
            ],
            venues: [
                VenueId::new(venues[0]),
                VenueId::new(venues[1]),
                VenueId::new(venues[2]),
            ],
            label: parts[4].to_string(),
        });
    }
    Ok(triangles)
}

/// Parse "token:src_chain:dst_chain:bridge:transit_secs:fee_bps" route lists.
fn parse_bridge_routes(raw: &str) -> Result<Vec<BridgeRouteConfig>> {
    let mut routes = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 6 {
            bail!("invalid bridge route format: '{}'", entry);
        }
        routes.push(BridgeRouteConfig {
            token: parse_address(parts[0])?,
            source_chain: parts[1].parse().context("bad source chain id")?,
            dest_chain: parts[2].parse().context("bad dest chain id")?,
            bridge: parts[3].to_string(),
            transit_secs_estimate: parts[4].parse().context("bad transit estimate")?,
            fee_bps: parts[5].parse().context("bad bridge fee")?,
        });
    }
    Ok(routes)
}

/// Parse "name:chain_id:preference:block_time_ms" chain lists.
fn parse_chains(raw: &str) -> Result<Vec<ChainConfig>> {
    let mut chains = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 4 {
            bail!("invalid chain format: '{}'", entry);
        }
        chains.push(ChainConfig {
            name: parts[0].to_string(),
            chain_id: parts[1].parse().context("bad chain id")?,
            preference: parts[2].parse().context("bad chain preference")?,
            block_time_ms: parts[3].parse().context("bad block time")?,
        });
    }
    if chains.is_empty() {
        bail!("CHAINS is empty");
    }
    Ok(chains)
}

/// Parse "kind:address:max_liquidity_native" provider lists.
fn parse_providers(raw: &str) -> Result<Vec<ProviderConfig>> {
    let mut providers = Vec::new();
    for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
        let parts: Vec<&str> = entry.trim().split(':').collect();
        if parts.len() != 3 {
            bail!("invalid provider format: '{}'", entry);
        }
        let kind = parts[0].to_lowercase();
        if kind != "balancer" && kind != "aave" {
            bail!("unknown flash-loan provider kind '{}'", parts[0]);
        }
        providers.push(ProviderConfig {
            kind,
            address: parse_address(parts[1])?,
            max_liquidity_native: parts[2].parse().context("bad provider liquidity")?,
        });
    }
    if providers.is_empty() {
        bail!("FLASH_PROVIDERS is empty");
    }
    Ok(providers)
}

/// Load configuration from a specific .env file (e.g. `.env.polygon`).
pub fn load_config_from_file(path: &str) -> Result<BotConfig> {
    dotenv::from_filename(path).ok();
    load_config_from_env()
}

/// Load configuration from the current process environment.
pub fn load_config_from_env() -> Result<BotConfig> {
    let chains = parse_chains(&env("CHAINS")?)?;
    let venues: Vec<VenueId> = env("VENUES")?
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| VenueId::new(v.trim()))
        .collect();
    if venues.len() < 2 {
        bail!("need at least two venues for dual-venue scanning");
    }

    let pairs = parse_pairs(&env("TRADING_PAIRS")?)?;
    let triangles = parse_triangles(&env_or("TRIANGLES", ""))?;
    let bridge_routes = parse_bridge_routes(&env_or("BRIDGE_ROUTES", ""))?;

    let candidate_amounts_native: Vec<f64> = env_or("CANDIDATE_AMOUNTS_NATIVE", "0.5,1.0,2.0")
        .split(',')
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().parse().context("bad candidate amount"))
        .collect::<Result<_>>()?;

    let risk_preset = RiskPreset::parse(&env_or("RISK_PRESET", "standard"))
        .context("RISK_PRESET must be conservative|standard|aggressive")?;

    Ok(BotConfig {
        chains,
        venues,
        pairs,
        triangles,
        bridge_routes,
        quote_token: parse_address(&env("QUOTE_TOKEN")?)?,
        candidate_amounts_native,

        enable_triangular: env_bool("ENABLE_TRIANGULAR", false),
        enable_cross_chain: env_bool("ENABLE_CROSS_CHAIN", false),
        live_mode: env_bool("LIVE_MODE", false),

        cooldown_ms: env_or("COOLDOWN_MS", "15000").parse()?,
        loss_threshold_native: env_or("LOSS_THRESHOLD_NATIVE", "1.0").parse()?,
        risk_preset,
        trade_size_native: env_or("TRADE_SIZE_NATIVE", "10.0").parse()?,

        scan_interval_ms: env_or("SCAN_INTERVAL_MS", "3000").parse()?,
        max_bridge_transit_secs: env_or("MAX_BRIDGE_TRANSIT_SECS", "300").parse()?,
        grace_blocks: env_or("GRACE_BLOCKS", "1").parse()?,
        max_submit_retries: env_or("MAX_SUBMIT_RETRIES", "2").parse()?,
        max_rpc_retries: env_or("MAX_RPC_RETRIES", "3").parse()?,

        executor_address: parse_address(&env("EXECUTOR_ADDRESS")?)?,
        providers: parse_providers(&env("FLASH_PROVIDERS")?)?,
    })
}
