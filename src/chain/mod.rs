//! Chain module - ledger primitives and RPC access
//!
//! This module provides:
//! - Account addresses and program-derived address search
//! - Ed25519 keypairs and the auxiliary signer capability
//! - Message compilation and the transaction wire format
//! - SPL token account decoding and associated token accounts
//! - JSON-RPC access to a ledger node

pub mod keypair;
pub mod message;
pub mod provider;
pub mod pubkey;
pub mod token_account;

pub use keypair::{AuxiliarySigner, Keypair, OracleSigner, Signature};
pub use message::{
    AccountMeta, CompiledInstruction, Hash, Instruction, Message, Transaction, PACKET_DATA_SIZE,
};
pub use provider::{AccountInfo, HttpLedgerRpc, LedgerRpc};
pub use pubkey::Pubkey;
pub use token_account::{
    associated_token_address, create_associated_token_account, TokenAccount,
    ASSOCIATED_TOKEN_PROGRAM_ID, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID,
};

/// System program: all-zero key.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new([0u8; 32]);
