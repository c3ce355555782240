//! Nebula oracle program

use super::pack_keys;
use crate::chain::Pubkey;

use borsh::{BorshDeserialize, BorshSerialize};

/// Kind of value a nebula carries to its subscribers.
#[derive(BorshSerialize, BorshDeserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum NebulaDataType {
    Int64,
    String,
    Bytes,
}

#[derive(BorshSerialize, BorshDeserialize, PartialEq, Debug, Clone)]
pub enum NebulaInstruction {
    Init {
        bft: u8,
        data_type: NebulaDataType,
        gravity_program_id: Pubkey,
        oracles: Vec<u8>,
    },
    UpdateOracles {
        bft: u8,
        oracles: Vec<u8>,
        new_round: u64,
    },
    SendHashValue {
        data_hash: [u8; 64],
    },
    SendValueToSubs {
        data_value: [u8; 64],
        data_type: NebulaDataType,
        pulse_id: u64,
        subscription_id: [u8; 16],
    },
    Subscribe {
        subscriber: Pubkey,
        min_confirmations: u8,
        reward: u64,
        subscription_id: [u8; 16],
    },
}

impl NebulaInstruction {
    pub fn init(
        bft: u8,
        data_type: NebulaDataType,
        gravity_program_id: Pubkey,
        oracles: &[Pubkey],
    ) -> Self {
        Self::Init {
            bft,
            data_type,
            gravity_program_id,
            oracles: pack_keys(oracles),
        }
    }

    pub fn update_oracles(bft: u8, oracles: &[Pubkey], new_round: u64) -> Self {
        Self::UpdateOracles {
            bft,
            oracles: pack_keys(oracles),
            new_round,
        }
    }

    pub fn send_hash_value(data_hash: [u8; 64]) -> Self {
        Self::SendHashValue { data_hash }
    }

    pub fn send_value_to_subs(
        data_value: [u8; 64],
        data_type: NebulaDataType,
        pulse_id: u64,
        subscription_id: [u8; 16],
    ) -> Self {
        Self::SendValueToSubs {
            data_value,
            data_type,
            pulse_id,
            subscription_id,
        }
    }

    pub fn subscribe(
        subscriber: Pubkey,
        min_confirmations: u8,
        reward: u64,
        subscription_id: [u8; 16],
    ) -> Self {
        Self::Subscribe {
            subscriber,
            min_confirmations,
            reward,
            subscription_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_numbers() {
        let cases = [
            (NebulaInstruction::init(1, NebulaDataType::Bytes, Pubkey::default(), &[]), 0u8),
            (NebulaInstruction::update_oracles(1, &[], 2), 1),
            (NebulaInstruction::send_hash_value([0u8; 64]), 2),
            (
                NebulaInstruction::send_value_to_subs([0u8; 64], NebulaDataType::Int64, 0, [0u8; 16]),
                3,
            ),
            (NebulaInstruction::subscribe(Pubkey::default(), 1, 0, [0u8; 16]), 4),
        ];
        for (ix, tag) in cases {
            assert_eq!(borsh::to_vec(&ix).unwrap()[0], tag, "{ix:?}");
        }
    }

    #[test]
    fn send_value_to_subs_layout() {
        let ix = NebulaInstruction::send_value_to_subs(
            [0xab; 64],
            NebulaDataType::Bytes,
            9,
            [0xcd; 16],
        );
        let data = borsh::to_vec(&ix).unwrap();

        assert_eq!(data.len(), 1 + 64 + 1 + 8 + 16);
        assert_eq!(&data[1..65], &[0xab; 64]);
        assert_eq!(data[65], 2);
        assert_eq!(&data[66..74], &9u64.to_le_bytes());
        assert_eq!(&data[74..], &[0xcd; 16]);
    }

    #[test]
    fn subscribe_round_trip() {
        let ix = NebulaInstruction::subscribe(Pubkey::new([4u8; 32]), 2, 1_000, [7u8; 16]);
        let data = borsh::to_vec(&ix).unwrap();
        assert_eq!(data.len(), 1 + 32 + 1 + 8 + 16);
        assert_eq!(NebulaInstruction::try_from_slice(&data).unwrap(), ix);
    }
}
