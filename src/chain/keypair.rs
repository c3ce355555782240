//! Ed25519 keypairs and the auxiliary signer capability

use super::message::AccountMeta;
use super::pubkey::Pubkey;
use crate::error::{BridgeError, BridgeResult};

use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroize;

/// A 64-byte ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_base58())
    }
}

/// A ledger keypair. The secret half is zeroized on drop by ed25519-dalek.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// From a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// From the 64-byte `secret || public` layout used by ledger key files.
    pub fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        if bytes.len() != 64 {
            return Err(BridgeError::Signing(format!(
                "keypair must be 64 bytes, got {}",
                bytes.len()
            )));
        }

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);
        seed.zeroize();

        if keypair.pubkey().as_bytes()[..] != bytes[32..] {
            return Err(BridgeError::Signing(
                "public half does not match secret half".to_string(),
            ));
        }
        Ok(keypair)
    }

    /// From a base58 encoded 64-byte keypair.
    pub fn from_base58(encoded: &str) -> BridgeResult<Self> {
        let mut bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| BridgeError::Signing(format!("base58 decode failed: {e}")))?;
        let keypair = Self::from_bytes(&bytes);
        bytes.zeroize();
        keypair
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

/// An extra party that must sign a transaction, e.g. one oracle of the
/// BFT set. Quorum is enforced on chain, not here.
pub trait AuxiliarySigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    fn sign(&self, message: &[u8]) -> Signature;

    /// The account entry this signer occupies in the instruction.
    fn meta(&self) -> AccountMeta {
        AccountMeta::new_readonly(self.pubkey(), true)
    }
}

/// Oracle (consul) signer backed by a local keypair.
#[derive(Debug)]
pub struct OracleSigner {
    keypair: Keypair,
}

impl OracleSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_base58(encoded: &str) -> BridgeResult<Self> {
        Keypair::from_base58(encoded).map(Self::new)
    }
}

impl AuxiliarySigner for OracleSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}
