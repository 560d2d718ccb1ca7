//! Private relay and signer seams.
//!
//! Both are traits so the pipeline runs identically against a real relay
//! endpoint, a test double with call counters, or the dry-run stand-ins
//! below. Transactions reach the builder unsigned and leave through
//! `Signer::sign`; raw key material never passes through this crate.

use crate::error::BotError;
use crate::types::{BundleRequest, SignedTx, TxRequest};
use alloy::primitives::{keccak256, Address};
use async_trait::async_trait;
use tracing::info;

/// Outcome of a mandatory pre-submission simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    pub ok: bool,
    pub gas_used: u64,
    /// Revert reason when `ok` is false.
    pub revert_reason: Option<String>,
}

/// Opaque handle returned by a relay on acceptance; used to track the
/// bundle to resolution.
#[derive(Debug, Clone)]
pub struct BundleHandle {
    pub bundle_id: String,
    pub target_block: u64,
}

/// Terminal relay-side resolution of a submitted bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Included { block: u64, gas_used: u64 },
    /// The relay gave up on the bundle (target block passed unfilled).
    Dropped,
}

/// External signing boundary. Implementations hold the key; the bot only
/// ever sees the signed payload.
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;
    async fn sign(&self, tx: &TxRequest) -> Result<SignedTx, BotError>;
}

/// Private relay endpoint: simulate, submit, and watch for inclusion.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn simulate(&self, bundle: &BundleRequest) -> Result<SimulationReport, BotError>;

    async fn submit(&self, bundle: &BundleRequest) -> Result<BundleHandle, BotError>;

    /// Resolves once the relay knows the bundle's fate. The submitter puts
    /// a grace-window timeout around this call.
    async fn wait_for_inclusion(&self, handle: &BundleHandle) -> Result<Resolution, BotError>;
}

/// Signer stand-in for dry runs: "signs" by hashing the request payload.
/// Produces stable hashes for logs without touching key material.
pub struct DryRunSigner {
    address: Address,
}

impl DryRunSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Signer for DryRunSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, tx: &TxRequest) -> Result<SignedTx, BotError> {
        Ok(SignedTx {
            hash: keccak256(&tx.data),
            raw: tx.data.clone(),
        })
    }
}

/// Relay stand-in for dry runs: every simulation passes, nothing is
/// broadcast, and every bundle "lands" in its target block so the full
/// outcome path gets exercised.
pub struct DryRunRelay {
    sim_gas_used: u64,
}

impl DryRunRelay {
    pub fn new(sim_gas_used: u64) -> Self {
        Self { sim_gas_used }
    }
}

#[async_trait]
impl RelayClient for DryRunRelay {
    async fn simulate(&self, bundle: &BundleRequest) -> Result<SimulationReport, BotError> {
        info!(
            "[DRY RUN] simulated {} tx bundle for block {}",
            bundle.txs.len(),
            bundle.target_block
        );
        Ok(SimulationReport {
            ok: true,
            gas_used: self.sim_gas_used,
            revert_reason: None,
        })
    }

    async fn submit(&self, bundle: &BundleRequest) -> Result<BundleHandle, BotError> {
        info!(
            "[DRY RUN] would submit bundle targeting block {} (not broadcast)",
            bundle.target_block
        );
        Ok(BundleHandle {
            bundle_id: format!("dry-run-{}", bundle.target_block),
            target_block: bundle.target_block,
        })
    }

    async fn wait_for_inclusion(&self, handle: &BundleHandle) -> Result<Resolution, BotError> {
        Ok(Resolution::Included {
            block: handle.target_block,
            gas_used: self.sim_gas_used,
        })
    }
}
