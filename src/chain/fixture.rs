//! Deterministic offline `ChainReader` backend.
//!
//! Serves quotes from a fixed rate table instead of an RPC endpoint. This is
//! the dry-run backend wired up by `main` when live mode is off, and the
//! reader the test suite drives the pipeline with. Rates are constant-rate
//! (output = input * rate), so round trips are exactly reproducible. There
//! is deliberately no randomness here.

use super::{ChainReader, QuoteOutcome};
use crate::error::BotError;
use crate::types::{BlockInfo, ChainId, FeeData, VenueId};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

type RateKey = (VenueId, Address, Address);

/// Fixed-rate quote table for one chain. Rates are expressed as a rational
/// (numerator, denominator) so integer amounts stay exact.
pub struct FixtureReader {
    chain_id: ChainId,
    rates: HashMap<RateKey, (u128, u128)>,
    fee: FeeData,
    block: AtomicU64,
    block_gas: (u64, u64),
}

impl FixtureReader {
    pub fn new(chain_id: ChainId, fee: FeeData, start_block: u64) -> Self {
        Self {
            chain_id,
            rates: HashMap::new(),
            fee,
            block: AtomicU64::new(start_block),
            // ~40% full blocks, a quiet chain
            block_gas: (12_000_000, 30_000_000),
        }
    }

    /// Register a one-directional rate: quoting `token_in -> token_out` on
    /// `venue` returns `amount * num / den`.
    pub fn set_rate(
        &mut self,
        venue: &VenueId,
        token_in: Address,
        token_out: Address,
        num: u128,
        den: u128,
    ) {
        self.rates
            .insert((venue.clone(), token_in, token_out), (num, den));
    }

    /// Advance the reported head block (used to drive block triggers).
    pub fn advance_block(&self) -> u64 {
        self.block.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ChainReader for FixtureReader {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn quote(
        &self,
        venue: &VenueId,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<QuoteOutcome, BotError> {
        match self.rates.get(&(venue.clone(), token_in, token_out)) {
            Some((num, den)) => {
                let out = amount_in * U256::from(*num) / U256::from(*den);
                Ok(QuoteOutcome::Amount(out))
            }
            None => Ok(QuoteOutcome::Unavailable),
        }
    }

    async fn fee_data(&self) -> Result<FeeData, BotError> {
        Ok(self.fee)
    }

    async fn block_number(&self) -> Result<u64, BotError> {
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn block(&self, number: u64) -> Result<BlockInfo, BotError> {
        Ok(BlockInfo {
            number,
            gas_used: self.block_gas.0,
            gas_limit: self.block_gas.1,
        })
    }
}
