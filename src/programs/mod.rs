//! Instruction payloads for the bridge programs
//!
//! Each program takes a borsh enum whose variant index is the instruction
//! number. The executor serialises these and attaches the account list.

pub mod gravity;
pub mod nebula;
pub mod ports;

pub use gravity::GravityInstruction;
pub use nebula::{NebulaDataType, NebulaInstruction};
pub use ports::{PortInstruction, PortKind};

use crate::chain::Pubkey;
use crate::error::BridgeResult;

/// Seed of the port's token authority PDA.
pub const PORT_PDA_SEED: &[u8] = b"ibport";

/// Token authority the port program signs mints and unlocks with.
pub fn port_authority(port_program: &Pubkey) -> BridgeResult<(Pubkey, u8)> {
    Pubkey::find_program_address(&[PORT_PDA_SEED], port_program)
}

/// Consul and oracle sets travel as concatenated 32-byte keys.
pub(crate) fn pack_keys(keys: &[Pubkey]) -> Vec<u8> {
    keys.iter().flat_map(|k| k.to_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_keys_concatenates() {
        let packed = pack_keys(&[Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32])]);
        assert_eq!(packed.len(), 64);
        assert_eq!(&packed[..32], &[1u8; 32]);
        assert_eq!(&packed[32..], &[2u8; 32]);
    }

    #[test]
    fn port_authority_is_off_curve() {
        let program = Pubkey::new([9u8; 32]);
        let (authority, bump) = port_authority(&program).unwrap();
        assert!(!authority.is_on_curve());
        assert_eq!(
            Pubkey::create_program_address(&[PORT_PDA_SEED], &[bump], &program).unwrap(),
            authority
        );
    }
}
