//! Solanoid - client core for the Gravity ledger <-> EVM token bridge
//!
//! - [`decimal`]: fixed-point amounts rebased between token decimals
//! - [`wire`]: the swap operation byte layouts both chains agree on
//! - [`programs`]: instruction encodings of the Gravity, Nebula and port programs
//! - [`tx`]: building, signing and submitting multi-signer transactions
//! - [`awaiter`]: polling for an expected deposit on either chain

pub mod awaiter;
pub mod chain;
pub mod config;
pub mod decimal;
pub mod error;
pub mod metrics;
pub mod programs;
pub mod tx;
pub mod wire;

pub use error::{BridgeError, BridgeResult};
