//! Flash-loan arbitrage bot: opportunity detection, validation, and
//! private-relay bundle submission across multiple chains.
//!
//! Pipeline: `scanner` finds candidates through the read-only
//! [`chain::ChainReader`] surface, `optimizer` proposes thresholds that
//! `validator` enforces, `risk` gates every execution behind the circuit
//! breaker and cooldown, and `bundle` carries the winner through
//! simulate -> submit -> resolve. `orchestrator` wires the stages together;
//! `audit` keeps the JSON trail.

pub mod audit;
pub mod bundle;
pub mod chain;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod orchestrator;
pub mod risk;
pub mod scanner;
pub mod types;
pub mod validator;

pub use config::BotConfig;
pub use error::{BotError, DenyReason};
pub use orchestrator::{Orchestrator, ScanTrigger, TriggerSource};
pub use risk::RiskGovernor;
pub use types::{ExecutionOutcome, Opportunity, OpportunityKind, ThresholdSet};
