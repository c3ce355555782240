//! Gravity consensus program

use super::pack_keys;
use crate::chain::Pubkey;

use borsh::{BorshDeserialize, BorshSerialize};

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Debug, Clone)]
pub enum GravityInstruction {
    /// Instruction 0: set the first consul set
    Init {
        bft: u8,
        init_round: u64,
        consuls: Vec<u8>,
    },
    /// Instruction 1: rotate consuls; signed by the current set
    UpdateConsuls {
        bft: u8,
        last_round: u64,
        consuls: Vec<u8>,
    },
}

impl GravityInstruction {
    pub fn init(bft: u8, init_round: u64, consuls: &[Pubkey]) -> Self {
        Self::Init {
            bft,
            init_round,
            consuls: pack_keys(consuls),
        }
    }

    pub fn update_consuls(bft: u8, last_round: u64, consuls: &[Pubkey]) -> Self {
        Self::UpdateConsuls {
            bft,
            last_round,
            consuls: pack_keys(consuls),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_layout() {
        let ix = GravityInstruction::init(3, 7, &[Pubkey::new([1u8; 32])]);
        let data = borsh::to_vec(&ix).unwrap();

        assert_eq!(data[0], 0);
        assert_eq!(data[1], 3);
        assert_eq!(&data[2..10], &7u64.to_le_bytes());
        assert_eq!(&data[10..14], &32u32.to_le_bytes());
        assert_eq!(&data[14..], &[1u8; 32]);
    }

    #[test]
    fn update_consuls_is_instruction_one() {
        let ix = GravityInstruction::update_consuls(1, 42, &[]);
        let data = borsh::to_vec(&ix).unwrap();
        assert_eq!(data, [&[1u8, 1][..], &42u64.to_le_bytes(), &[0, 0, 0, 0]].concat());
    }
}
