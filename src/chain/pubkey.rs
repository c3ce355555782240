//! Ledger account addresses and program-derived address search

use crate::error::{BridgeError, BridgeResult};

use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Marker appended to every program-derived address preimage.
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum length of a single PDA seed.
pub const MAX_SEED_LEN: usize = 32;

/// A 32-byte ledger account address, rendered as base58.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Whether the bytes decompress to a point on the ed25519 curve.
    pub fn is_on_curve(&self) -> bool {
        curve25519_dalek::edwards::CompressedEdwardsY(self.0)
            .decompress()
            .is_some()
    }

    /// Search bumps 255..=0 for the first off-curve address for `seeds`.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> BridgeResult<(Pubkey, u8)> {
        for bump in (0u8..=255).rev() {
            match Self::create_program_address(seeds, &[bump], program_id) {
                Ok(address) => return Ok((address, bump)),
                Err(BridgeError::InvalidAddress(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(BridgeError::InvalidAddress(
            "could not find valid PDA bump seed".to_string(),
        ))
    }

    /// `sha256(seeds || bump || program_id || marker)`, rejected when on curve.
    pub fn create_program_address(
        seeds: &[&[u8]],
        bump_seed: &[u8],
        program_id: &Pubkey,
    ) -> BridgeResult<Pubkey> {
        let mut hasher = Sha256::new();
        for seed in seeds {
            if seed.len() > MAX_SEED_LEN {
                return Err(BridgeError::Config(format!(
                    "PDA seed of {} bytes exceeds {}",
                    seed.len(),
                    MAX_SEED_LEN
                )));
            }
            hasher.update(seed);
        }
        hasher.update(bump_seed);
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);

        let address = Pubkey(hasher.finalize().into());
        if address.is_on_curve() {
            return Err(BridgeError::InvalidAddress(
                "derived address lies on the ed25519 curve".to_string(),
            ));
        }
        Ok(address)
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| BridgeError::InvalidAddress(format!("base58 decode failed for {s}: {e}")))?;

        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            BridgeError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self.to_base58())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TOKEN_PROGRAM_ID;

    #[test]
    fn system_program_is_all_ones() {
        assert_eq!(
            Pubkey::default().to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn parse_round_trip() {
        let address = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let key: Pubkey = address.parse().unwrap();
        assert_eq!(key, TOKEN_PROGRAM_ID);
        assert_eq!(key.to_string(), address);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "3yZe7d".parse::<Pubkey>().unwrap_err();
        assert!(matches!(err, BridgeError::InvalidAddress(_)));
    }

    #[test]
    fn parse_rejects_bad_alphabet() {
        assert!("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl".parse::<Pubkey>().is_err());
    }

    #[test]
    fn pda_is_off_curve_and_deterministic() {
        let program: Pubkey = "AH3QKaj942UUxDjaRaGh7hvdadsD8yfU9LRTa9KXfJkZ"
            .parse()
            .unwrap();
        let (pda, bump) = Pubkey::find_program_address(&[b"ibport"], &program).unwrap();
        assert!(!pda.is_on_curve());

        let (again, again_bump) = Pubkey::find_program_address(&[b"ibport"], &program).unwrap();
        assert_eq!(pda, again);
        assert_eq!(bump, again_bump);

        let recreated = Pubkey::create_program_address(&[b"ibport"], &[bump], &program).unwrap();
        assert_eq!(recreated, pda);
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let seed = [7u8; 33];
        let err = Pubkey::find_program_address(&[&seed], &Pubkey::default()).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn borsh_writes_raw_32_bytes() {
        let key = Pubkey::new([9u8; 32]);
        let bytes = borsh::to_vec(&key).unwrap();
        assert_eq!(bytes, vec![9u8; 32]);
    }
}
