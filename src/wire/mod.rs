//! Swap operation wire format consumed by the bridge port programs
//!
//! Layout, with no length prefixes:
//!
//! ```text
//! ledger-bound:  tag(1) | swap_id(16) | amount f64 LE (8)      | receiver(32)
//! EVM-bound:     tag(1) | swap_id(32) | amount big-endian (var) | receiver(20)
//! ```
//!
//! Only the ledger-bound layout has a fixed size and can be decoded.

pub mod builder;

pub use builder::{
    CrossChainPayloadBuilder, DecimalConfig, EvmToLedgerBuilder, LedgerToEvmBuilder,
};

use crate::chain::Pubkey;
use crate::error::{BridgeError, BridgeResult};

use ethers::types::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use rand::rngs::OsRng;
use rand::RngCore;

/// Size of a decodable (ledger-bound) operation.
pub const LEDGER_OPERATION_LEN: usize = 1 + 16 + 8 + 32;

/// Which chain the operation is executed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ledger,
    Evm,
}

/// One-byte operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Mint,
    Unlock,
    Confirm,
    /// Decoding does not validate the tag.
    Other(u8),
}

impl Action {
    pub fn to_byte(self) -> u8 {
        match self {
            Action::Mint => b'm',
            Action::Unlock => b'u',
            Action::Confirm => b'c',
            Action::Other(b) => b,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        match b {
            b'm' => Action::Mint,
            b'u' => Action::Unlock,
            b'c' => Action::Confirm,
            other => Action::Other(other),
        }
    }
}

/// Random nonce the port program uses to reject double spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapId {
    Ledger([u8; 16]),
    Evm([u8; 32]),
}

impl SwapId {
    pub fn random(target: Target) -> Self {
        match target {
            Target::Ledger => SwapId::Ledger(random_bytes()),
            Target::Evm => SwapId::Evm(random_bytes()),
        }
    }

    pub fn target(&self) -> Target {
        match self {
            SwapId::Ledger(_) => Target::Ledger,
            SwapId::Evm(_) => Target::Evm,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SwapId::Ledger(id) => id,
            SwapId::Evm(id) => id,
        }
    }
}

/// Amount encoding differs per target chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    /// 8-byte little-endian float.
    Ledger(f64),
    /// Minimal big-endian integer bytes; zero encodes as no bytes.
    Evm(BigUint),
}

impl Amount {
    pub fn target(&self) -> Target {
        match self {
            Amount::Ledger(_) => Target::Ledger,
            Amount::Evm(_) => Target::Evm,
        }
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Amount::Ledger(value) => buf.extend_from_slice(&value.to_le_bytes()),
            Amount::Evm(value) if value.is_zero() => {}
            Amount::Evm(value) => buf.extend_from_slice(&value.to_bytes_be()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// 32-byte ledger field. May carry a zero-padded EVM address.
    Ledger([u8; 32]),
    Evm(Address),
}

impl Receiver {
    pub fn account(key: &Pubkey) -> Self {
        Receiver::Ledger(key.to_bytes())
    }

    /// EVM address in the first 20 bytes of a 32-byte ledger field.
    pub fn padded_evm(address: &Address) -> Self {
        let mut field = [0u8; 32];
        field[..20].copy_from_slice(address.as_bytes());
        Receiver::Ledger(field)
    }

    pub fn target(&self) -> Target {
        match self {
            Receiver::Ledger(_) => Target::Ledger,
            Receiver::Evm(_) => Target::Evm,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Receiver::Ledger(bytes) => bytes,
            Receiver::Evm(address) => address.as_bytes(),
        }
    }
}

/// One bridge action.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOperation {
    action: Action,
    swap_id: SwapId,
    amount: Amount,
    receiver: Receiver,
}

impl SwapOperation {
    /// Rejects operations whose fields target different chains.
    pub fn new(
        action: Action,
        swap_id: SwapId,
        amount: Amount,
        receiver: Receiver,
    ) -> BridgeResult<Self> {
        let target = swap_id.target();
        if amount.target() != target || receiver.target() != target {
            return Err(BridgeError::MixedEncoding(format!(
                "swap id targets {:?}, amount targets {:?}, receiver targets {:?}",
                target,
                amount.target(),
                receiver.target()
            )));
        }

        Ok(Self {
            action,
            swap_id,
            amount,
            receiver,
        })
    }

    pub fn ledger(action: Action, swap_id: [u8; 16], amount: f64, receiver: [u8; 32]) -> Self {
        Self {
            action,
            swap_id: SwapId::Ledger(swap_id),
            amount: Amount::Ledger(amount),
            receiver: Receiver::Ledger(receiver),
        }
    }

    pub fn evm(action: Action, swap_id: [u8; 32], amount: BigUint, receiver: Address) -> Self {
        Self {
            action,
            swap_id: SwapId::Evm(swap_id),
            amount: Amount::Evm(amount),
            receiver: Receiver::Evm(receiver),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn swap_id(&self) -> &SwapId {
        &self.swap_id
    }

    pub fn amount(&self) -> &Amount {
        &self.amount
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn target(&self) -> Target {
        self.swap_id.target()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 32 + 32 + 32);
        buf.push(self.action.to_byte());
        buf.extend_from_slice(self.swap_id.as_bytes());
        self.amount.encode_into(&mut buf);
        buf.extend_from_slice(self.receiver.as_bytes());
        buf
    }

    /// Decode the ledger-bound layout.
    ///
    /// Only the length is checked: any tag byte and any float bit pattern
    /// is accepted, and bytes past the first 57 are ignored.
    pub fn decode(buf: &[u8]) -> BridgeResult<Self> {
        if buf.len() < LEDGER_OPERATION_LEN {
            return Err(BridgeError::InvalidFormat {
                expected: LEDGER_OPERATION_LEN,
                actual: buf.len(),
            });
        }

        let mut swap_id = [0u8; 16];
        swap_id.copy_from_slice(&buf[1..17]);
        let mut amount = [0u8; 8];
        amount.copy_from_slice(&buf[17..25]);
        let mut receiver = [0u8; 32];
        receiver.copy_from_slice(&buf[25..57]);

        Ok(Self::ledger(
            Action::from_byte(buf[0]),
            swap_id,
            f64::from_le_bytes(amount),
            receiver,
        ))
    }
}

/// Re-tag an encoded operation as a confirmation, in place.
pub fn wrap_into_confirmed_request(buf: &mut [u8]) -> BridgeResult<()> {
    let tag = buf.first_mut().ok_or(BridgeError::InvalidFormat {
        expected: 1,
        actual: 0,
    })?;
    *tag = Action::Confirm.to_byte();
    Ok(())
}

pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn evm_receiver() -> Address {
        Address::from_str("0xbbc3d3f8c70c1a558bd0b5c25662aa3226b863e9").unwrap()
    }

    #[test]
    fn ledger_layout_is_57_bytes() {
        let op = SwapOperation::ledger(Action::Mint, [1u8; 16], 2.227, [2u8; 32]);
        let bytes = op.encode();

        assert_eq!(bytes.len(), LEDGER_OPERATION_LEN);
        assert_eq!(bytes[0], b'm');
        assert_eq!(&bytes[1..17], &[1u8; 16]);
        assert_eq!(&bytes[17..25], &2.227f64.to_le_bytes());
        assert_eq!(&bytes[25..], &[2u8; 32]);
    }

    #[test]
    fn evm_layout_uses_minimal_big_endian_amount() {
        let amount = BigUint::from(437_000_000_000_000u64);
        let op = SwapOperation::evm(Action::Unlock, [9u8; 32], amount.clone(), evm_receiver());
        let bytes = op.encode();

        let amount_bytes = amount.to_bytes_be();
        assert_eq!(bytes[0], b'u');
        assert_eq!(&bytes[1..33], &[9u8; 32]);
        assert_eq!(&bytes[33..33 + amount_bytes.len()], &amount_bytes[..]);
        assert_eq!(&bytes[33 + amount_bytes.len()..], evm_receiver().as_bytes());
        assert_eq!(bytes.len(), 1 + 32 + amount_bytes.len() + 20);
    }

    #[test]
    fn zero_evm_amount_encodes_as_no_bytes() {
        let op = SwapOperation::evm(Action::Mint, [0u8; 32], BigUint::zero(), evm_receiver());
        assert_eq!(op.encode().len(), 1 + 32 + 20);
    }

    #[test]
    fn ledger_round_trip() {
        let samples = [
            (Action::Mint, 0.0),
            (Action::Unlock, 2.227),
            (Action::Confirm, 1e-8),
            (Action::Other(b'x'), 123_456.789),
        ];
        for (action, amount) in samples {
            let receiver = Receiver::padded_evm(&evm_receiver());
            let op = SwapOperation::new(
                action,
                SwapId::random(Target::Ledger),
                Amount::Ledger(amount),
                receiver,
            )
            .unwrap();
            assert_eq!(SwapOperation::decode(&op.encode()).unwrap(), op);
        }
    }

    #[test]
    fn decode_rejects_every_short_buffer() {
        for len in 0..LEDGER_OPERATION_LEN {
            let err = SwapOperation::decode(&vec![0xffu8; len]).unwrap_err();
            assert!(matches!(
                err,
                BridgeError::InvalidFormat { expected: 57, actual } if actual == len
            ));
        }
    }

    #[test]
    fn decode_accepts_garbage_of_sufficient_length() {
        // Known gap: no semantic validation of tag or amount.
        for len in LEDGER_OPERATION_LEN..LEDGER_OPERATION_LEN + 8 {
            let op = SwapOperation::decode(&vec![0xffu8; len]).unwrap();
            assert_eq!(op.action(), Action::Other(0xff));
            assert!(matches!(op.amount(), Amount::Ledger(v) if v.is_nan()));
        }
    }

    #[test]
    fn mixed_encodings_are_rejected() {
        let err = SwapOperation::new(
            Action::Mint,
            SwapId::Ledger([0u8; 16]),
            Amount::Evm(BigUint::from(1u8)),
            Receiver::Ledger([0u8; 32]),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::MixedEncoding(_)));

        assert!(SwapOperation::new(
            Action::Mint,
            SwapId::Evm([0u8; 32]),
            Amount::Evm(BigUint::from(1u8)),
            Receiver::Ledger([0u8; 32]),
        )
        .is_err());
    }

    #[test]
    fn wrap_retags_in_place() {
        let op = SwapOperation::ledger(Action::Unlock, [4u8; 16], 1.5, [5u8; 32]);
        let mut bytes = op.encode();
        wrap_into_confirmed_request(&mut bytes).unwrap();

        assert_eq!(bytes[0], b'c');
        let decoded = SwapOperation::decode(&bytes).unwrap();
        assert_eq!(decoded.action(), Action::Confirm);
        assert_eq!(decoded.swap_id(), op.swap_id());

        assert!(wrap_into_confirmed_request(&mut []).is_err());
    }

    #[test]
    fn random_swap_ids_do_not_repeat() {
        let a = SwapId::random(Target::Ledger);
        let b = SwapId::random(Target::Ledger);
        assert_ne!(a, b);
        assert_eq!(SwapId::random(Target::Evm).as_bytes().len(), 32);
    }

    #[test]
    fn padded_evm_receiver_keeps_address_prefix() {
        let receiver = Receiver::padded_evm(&evm_receiver());
        assert_eq!(&receiver.as_bytes()[..20], evm_receiver().as_bytes());
        assert_eq!(&receiver.as_bytes()[20..], &[0u8; 12]);
    }
}
