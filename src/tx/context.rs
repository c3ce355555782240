//! Per-call signing context and invocation results

use crate::chain::{AccountMeta, AuxiliarySigner, Keypair, Pubkey};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The program an executor invokes and the accounts every call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramTarget {
    pub program_id: Pubkey,
    /// Main data account, always writable
    pub data_account: Pubkey,
    /// Multisig account, writable when present
    pub multisig_account: Option<Pubkey>,
}

impl ProgramTarget {
    pub fn new(program_id: Pubkey, data_account: Pubkey) -> Self {
        Self {
            program_id,
            data_account,
            multisig_account: None,
        }
    }

    pub fn with_multisig(mut self, multisig_account: Pubkey) -> Self {
        self.multisig_account = Some(multisig_account);
        self
    }
}

/// Who signs one invocation and which extra accounts it carries.
///
/// Contexts are immutable once built; a call never observes another
/// call's signers or accounts.
#[derive(Clone)]
pub struct CallContext {
    primary: Arc<Keypair>,
    signers: Vec<Arc<dyn AuxiliarySigner>>,
    extra_meta: Vec<AccountMeta>,
}

impl CallContext {
    pub fn new(primary: Arc<Keypair>) -> Self {
        Self {
            primary,
            signers: Vec::new(),
            extra_meta: Vec::new(),
        }
    }

    pub fn with_primary(mut self, primary: Arc<Keypair>) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_signers(mut self, signers: Vec<Arc<dyn AuxiliarySigner>>) -> Self {
        self.signers = signers;
        self
    }

    pub fn with_extra_meta(mut self, extra_meta: Vec<AccountMeta>) -> Self {
        self.extra_meta = extra_meta;
        self
    }

    /// Fee payer and first account of every instruction.
    pub fn primary(&self) -> &Keypair {
        &self.primary
    }

    pub fn signers(&self) -> &[Arc<dyn AuxiliarySigner>] {
        &self.signers
    }

    pub fn extra_meta(&self) -> &[AccountMeta] {
        &self.extra_meta
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signers: Vec<Pubkey> = self.signers.iter().map(|s| s.pubkey()).collect();
        f.debug_struct("CallContext")
            .field("primary", &self.primary.pubkey())
            .field("signers", &signers)
            .field("extra_meta", &self.extra_meta)
            .finish()
    }
}

/// Result of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    /// Hex of the message bytes that were signed
    pub serialized_message: String,
    /// Base58 signature the node returned
    pub tx_signature: String,
}
