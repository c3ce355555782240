//! IB-Port and LU-Port programs
//!
//! Both ports share one instruction set. They differ in the tag their
//! transfer requests carry once packed into a swap operation: the IB-Port
//! burns wrapped tokens and asks for a mint (`m`) on the other side, the
//! LU-Port locks native tokens and asks for an unlock (`u`).

use super::pack_keys;
use crate::chain::Pubkey;
use crate::error::{BridgeError, BridgeResult};
use crate::wire::{random_bytes, Action, SwapOperation};

use borsh::{BorshDeserialize, BorshSerialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    IbPort,
    LuPort,
}

impl PortKind {
    pub fn request_action(self) -> Action {
        match self {
            PortKind::IbPort => Action::Mint,
            PortKind::LuPort => Action::Unlock,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Debug, Clone)]
pub enum PortInstruction {
    InitWithOracles {
        nebula_data_account: Pubkey,
        token_data_account: Pubkey,
        token_mint: Pubkey,
        bft: u8,
        oracles: Vec<u8>,
    },
    /// Request a transfer to the other chain.
    CreateTransferRequest {
        /// f64 little-endian, length prefixed
        token_amount: Vec<u8>,
        receiver: [u8; 32],
        request_id: [u8; 16],
    },
    /// Oracle delivery of an encoded swap operation.
    AttachValue { byte_vector: Vec<u8> },
    ConfirmProcessedRequest { request_id: Vec<u8> },
    TransferTokenOwnership {
        new_authority: Pubkey,
        new_token: Pubkey,
    },
}

impl PortInstruction {
    pub fn init_with_oracles(
        nebula_data_account: Pubkey,
        token_data_account: Pubkey,
        token_mint: Pubkey,
        bft: u8,
        oracles: &[Pubkey],
    ) -> Self {
        Self::InitWithOracles {
            nebula_data_account,
            token_data_account,
            token_mint,
            bft,
            oracles: pack_keys(oracles),
        }
    }

    /// Transfer request with a fresh random request id.
    pub fn create_transfer_request(receiver: [u8; 32], amount: f64) -> Self {
        let request_id: [u8; 16] = random_bytes();
        debug!(
            "Transfer request {} for amount {}",
            hex::encode(request_id),
            amount
        );

        Self::CreateTransferRequest {
            token_amount: amount.to_le_bytes().to_vec(),
            receiver,
            request_id,
        }
    }

    pub fn attach_value(byte_vector: Vec<u8>) -> Self {
        Self::AttachValue { byte_vector }
    }

    /// Attach an operation in its wire encoding.
    pub fn attach_operation(operation: &SwapOperation) -> Self {
        Self::attach_value(operation.encode())
    }

    pub fn confirm_processed_request(request_id: &[u8]) -> Self {
        Self::ConfirmProcessedRequest {
            request_id: request_id.to_vec(),
        }
    }

    pub fn transfer_token_ownership(new_authority: Pubkey, new_token: Pubkey) -> Self {
        Self::TransferTokenOwnership {
            new_authority,
            new_token,
        }
    }

    /// The swap operation the oracles relay for a transfer request.
    pub fn to_swap_operation(&self, kind: PortKind) -> BridgeResult<SwapOperation> {
        match self {
            Self::CreateTransferRequest {
                token_amount,
                receiver,
                request_id,
            } => {
                let amount: [u8; 8] = token_amount.as_slice().try_into().map_err(|_| {
                    BridgeError::InvalidFormat {
                        expected: 8,
                        actual: token_amount.len(),
                    }
                })?;
                Ok(SwapOperation::ledger(
                    kind.request_action(),
                    *request_id,
                    f64::from_le_bytes(amount),
                    *receiver,
                ))
            }
            other => Err(BridgeError::Serialization(format!(
                "{other:?} is not a transfer request"
            ))),
        }
    }
}
