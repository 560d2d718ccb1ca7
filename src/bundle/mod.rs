//! Bundle construction and private-relay submission.
//!
//! The builder turns a validated opportunity into a signed bundle; the
//! submitter drives it through simulate -> submit -> resolve. Public
//! mempool broadcast is deliberately absent from this module.

pub mod builder;
pub mod relay;
pub mod submitter;

pub use builder::{providers_from_config, BundleBuilder};
pub use relay::{
    BundleHandle, DryRunRelay, DryRunSigner, RelayClient, Resolution, Signer, SimulationReport,
};
pub use submitter::BundleSubmitter;
