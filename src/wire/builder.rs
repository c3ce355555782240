//! Swap operation builders for each bridge direction
//!
//! "Direct" moves value from the origin chain to the destination chain
//! (mint on the destination). "Reverse" returns it to the origin (unlock).

use super::{random_bytes, Action, SwapId, SwapOperation};
use crate::chain::Pubkey;
use crate::decimal::DecimalValue;

use ethers::types::Address;
use num_bigint::BigUint;
use tracing::debug;

/// Token precision on each side of a bridge pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecimalConfig {
    pub origin_decimals: u32,
    pub dest_decimals: u32,
}

impl DecimalConfig {
    pub fn new(origin_decimals: u32, dest_decimals: u32) -> Self {
        Self {
            origin_decimals,
            dest_decimals,
        }
    }
}

/// Builds both operations for one bridge direction.
///
/// Every build draws a fresh swap id and remembers it.
pub trait CrossChainPayloadBuilder {
    fn set_cfg(&mut self, cfg: DecimalConfig);

    fn build_for_direct(&mut self) -> SwapOperation;

    fn build_for_reverse(&mut self) -> SwapOperation;

    /// Swap id of the most recent build.
    fn last_swap_id(&self) -> Option<SwapId>;
}

/// EVM origin, ledger destination.
///
/// `amount` is in EVM base units. Direct mints on the ledger, reverse
/// unlocks on the EVM side.
#[derive(Debug, Clone)]
pub struct EvmToLedgerBuilder {
    cfg: DecimalConfig,
    amount: BigUint,
    ledger_receiver: Pubkey,
    evm_receiver: Address,
    last_swap_id: Option<SwapId>,
}

impl EvmToLedgerBuilder {
    pub fn new(amount: BigUint, ledger_receiver: Pubkey, evm_receiver: Address) -> Self {
        Self {
            cfg: DecimalConfig::default(),
            amount,
            ledger_receiver,
            evm_receiver,
            last_swap_id: None,
        }
    }
}

impl CrossChainPayloadBuilder for EvmToLedgerBuilder {
    fn set_cfg(&mut self, cfg: DecimalConfig) {
        self.cfg = cfg;
    }

    fn build_for_direct(&mut self) -> SwapOperation {
        let rebased = DecimalValue::from_base(self.amount.clone())
            .map_through(self.cfg.origin_decimals, self.cfg.dest_decimals);
        let amount = DecimalValue::from_base(rebased).to_float(self.cfg.dest_decimals);

        let id: [u8; 16] = random_bytes();
        self.last_swap_id = Some(SwapId::Ledger(id));

        debug!("Built ledger mint of {} for {}", amount, self.ledger_receiver);
        SwapOperation::ledger(Action::Mint, id, amount, self.ledger_receiver.to_bytes())
    }

    fn build_for_reverse(&mut self) -> SwapOperation {
        let id: [u8; 32] = random_bytes();
        self.last_swap_id = Some(SwapId::Evm(id));

        debug!("Built EVM unlock of {} for {:?}", self.amount, self.evm_receiver);
        SwapOperation::evm(Action::Unlock, id, self.amount.clone(), self.evm_receiver)
    }

    fn last_swap_id(&self) -> Option<SwapId> {
        self.last_swap_id
    }
}

/// Ledger origin, EVM destination.
///
/// `amount` is a human readable float at the ledger's precision. Direct
/// mints on the EVM side, reverse unlocks on the ledger.
#[derive(Debug, Clone)]
pub struct LedgerToEvmBuilder {
    cfg: DecimalConfig,
    amount: f64,
    evm_receiver: Address,
    ledger_receiver: Pubkey,
    last_swap_id: Option<SwapId>,
}

impl LedgerToEvmBuilder {
    pub fn new(amount: f64, evm_receiver: Address, ledger_receiver: Pubkey) -> Self {
        Self {
            cfg: DecimalConfig::default(),
            amount,
            evm_receiver,
            ledger_receiver,
            last_swap_id: None,
        }
    }
}

impl CrossChainPayloadBuilder for LedgerToEvmBuilder {
    fn set_cfg(&mut self, cfg: DecimalConfig) {
        self.cfg = cfg;
    }

    fn build_for_direct(&mut self) -> SwapOperation {
        let amount = DecimalValue::from_float(self.amount, self.cfg.origin_decimals)
            .map_through(self.cfg.origin_decimals, self.cfg.dest_decimals);

        let id: [u8; 32] = random_bytes();
        self.last_swap_id = Some(SwapId::Evm(id));

        debug!("Built EVM mint of {} for {:?}", amount, self.evm_receiver);
        SwapOperation::evm(Action::Mint, id, amount, self.evm_receiver)
    }

    fn build_for_reverse(&mut self) -> SwapOperation {
        let id: [u8; 16] = random_bytes();
        self.last_swap_id = Some(SwapId::Ledger(id));

        debug!("Built ledger unlock of {} for {}", self.amount, self.ledger_receiver);
        SwapOperation::ledger(
            Action::Unlock,
            id,
            self.amount,
            self.ledger_receiver.to_bytes(),
        )
    }

    fn last_swap_id(&self) -> Option<SwapId> {
        self.last_swap_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{Amount, Receiver};
    use std::str::FromStr;

    fn evm_address() -> Address {
        Address::from_str("0x7ac6bd5a4bd2d1b4a8d6b2a19c1f8e2d6ad4b0e1").unwrap()
    }

    #[test]
    fn ledger_to_evm_direct_rebases_up() {
        let mut builder = LedgerToEvmBuilder::new(2.227, evm_address(), Pubkey::new([1u8; 32]));
        builder.set_cfg(DecimalConfig::new(8, 18));

        let op = builder.build_for_direct();
        assert_eq!(op.action(), Action::Mint);
        assert_eq!(
            op.amount(),
            &Amount::Evm(BigUint::from(2_227_000_000_000_000_000u128))
        );
        assert_eq!(op.receiver(), &Receiver::Evm(evm_address()));
        assert_eq!(builder.last_swap_id(), Some(*op.swap_id()));
    }

    #[test]
    fn ledger_to_evm_reverse_unlocks_on_ledger() {
        let ledger_receiver = Pubkey::new([3u8; 32]);
        let mut builder = LedgerToEvmBuilder::new(0.5, evm_address(), ledger_receiver);
        builder.set_cfg(DecimalConfig::new(8, 18));

        let op = builder.build_for_reverse();
        let bytes = op.encode();
        assert_eq!(bytes.len(), crate::wire::LEDGER_OPERATION_LEN);
        assert_eq!(bytes[0], b'u');
        assert_eq!(op.amount(), &Amount::Ledger(0.5));
        assert_eq!(op.receiver(), &Receiver::account(&ledger_receiver));
    }

    #[test]
    fn evm_to_ledger_direct_rebases_down() {
        let mut builder = EvmToLedgerBuilder::new(
            BigUint::from(437_000_000_000_000u64),
            Pubkey::new([5u8; 32]),
            evm_address(),
        );
        builder.set_cfg(DecimalConfig::new(18, 8));

        let op = builder.build_for_direct();
        assert_eq!(op.action(), Action::Mint);
        match op.amount() {
            Amount::Ledger(v) => assert!((v - 0.000437).abs() < 1e-12),
            other => panic!("unexpected amount {other:?}"),
        }
        assert!(matches!(op.swap_id(), SwapId::Ledger(_)));
    }

    #[test]
    fn evm_to_ledger_reverse_keeps_raw_amount() {
        let amount = BigUint::from(437_000_000_000_000u64);
        let mut builder =
            EvmToLedgerBuilder::new(amount.clone(), Pubkey::new([5u8; 32]), evm_address());
        builder.set_cfg(DecimalConfig::new(18, 8));

        let op = builder.build_for_reverse();
        assert_eq!(op.action(), Action::Unlock);
        assert_eq!(op.amount(), &Amount::Evm(amount));
        assert_eq!(op.receiver(), &Receiver::Evm(evm_address()));
    }

    #[test]
    fn each_build_draws_a_new_swap_id() {
        let mut builder = LedgerToEvmBuilder::new(1.0, evm_address(), Pubkey::new([1u8; 32]));
        assert_eq!(builder.last_swap_id(), None);

        let first = *builder.build_for_direct().swap_id();
        let second = *builder.build_for_direct().swap_id();
        assert_ne!(first, second);
        assert_eq!(builder.last_swap_id(), Some(second));
    }
}
