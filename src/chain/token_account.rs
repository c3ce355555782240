//! SPL token account state as stored on the ledger

use super::message::{AccountMeta, Instruction};
use super::pubkey::Pubkey;
use super::SYSTEM_PROGRAM_ID;
use crate::error::{BridgeError, BridgeResult};

use serde::Serialize;

/// SPL Token Program: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79, 0xac,
    0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff, 0x00, 0xa9,
]);

/// Associated Token Account Program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d, 0x83,
    0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9, 0xf8, 0x59,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: Pubkey = Pubkey::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1, 0x7f,
    0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00, 0x00, 0x00,
]);

/// Packed length of a token account.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountState {
    Uninitialized,
    Initialized,
    Frozen,
}

/// Decoded token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAccount {
    #[serde(serialize_with = "as_base58")]
    pub mint: Pubkey,
    #[serde(serialize_with = "as_base58")]
    pub owner: Pubkey,
    pub amount: u64,
    #[serde(skip)]
    pub delegate: Option<Pubkey>,
    pub state: AccountState,
    pub is_native: Option<u64>,
    pub delegated_amount: u64,
    #[serde(skip)]
    pub close_authority: Option<Pubkey>,
}

impl TokenAccount {
    /// Unpack the 165-byte layout. Trailing bytes are ignored.
    pub fn unpack(data: &[u8]) -> BridgeResult<Self> {
        if data.len() < TOKEN_ACCOUNT_LEN {
            return Err(BridgeError::InvalidFormat {
                expected: TOKEN_ACCOUNT_LEN,
                actual: data.len(),
            });
        }

        let state = match data[108] {
            0 => AccountState::Uninitialized,
            1 => AccountState::Initialized,
            2 => AccountState::Frozen,
            other => {
                return Err(BridgeError::Serialization(format!(
                    "unknown token account state {other}"
                )))
            }
        };

        Ok(Self {
            mint: read_pubkey(data, 0),
            owner: read_pubkey(data, 32),
            amount: read_u64(data, 64),
            delegate: read_coption(data, 72, 4, read_pubkey)?,
            state,
            is_native: read_coption(data, 109, 4, read_u64)?,
            delegated_amount: read_u64(data, 121),
            close_authority: read_coption(data, 129, 4, read_pubkey)?,
        })
    }
}

/// Token account the associated token program assigns to `owner` for `mint`.
///
/// Seeds are `[owner, token_program, mint]` under the associated token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> BridgeResult<Pubkey> {
    Pubkey::find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Instruction creating the associated token account of `wallet` for `mint`,
/// paid for by `funding`. Returns the instruction and the new account address.
pub fn create_associated_token_account(
    funding: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
) -> BridgeResult<(Instruction, Pubkey)> {
    let associated = associated_token_address(wallet, mint)?;

    let instruction = Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*funding, true),
            AccountMeta::new(associated, false),
            AccountMeta::new_readonly(*wallet, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSVAR_RENT_ID, false),
        ],
        data: Vec::new(),
    };

    Ok((instruction, associated))
}

fn read_pubkey(data: &[u8], at: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[at..at + 32]);
    Pubkey::new(bytes)
}

fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// COption: u32 LE tag (0 none / 1 some) followed by the value.
fn read_coption<T>(
    data: &[u8],
    at: usize,
    tag_len: usize,
    read: impl Fn(&[u8], usize) -> T,
) -> BridgeResult<Option<T>> {
    match &data[at..at + tag_len] {
        [0, 0, 0, 0] => Ok(None),
        [1, 0, 0, 0] => Ok(Some(read(data, at + tag_len))),
        tag => Err(BridgeError::Serialization(format!(
            "invalid COption tag {tag:?}"
        ))),
    }
}

fn as_base58<S: serde::Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&key.to_base58())
}

#[cfg(test)]
pub(crate) fn pack_for_tests(mint: Pubkey, owner: Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[..32].copy_from_slice(mint.as_bytes());
    data[32..64].copy_from_slice(owner.as_bytes());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data[108] = 1;
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_plain_account() {
        let mint = Pubkey::new([1u8; 32]);
        let owner = Pubkey::new([2u8; 32]);
        let data = pack_for_tests(mint, owner, 437_000);

        let account = TokenAccount::unpack(&data).unwrap();
        assert_eq!(account.mint, mint);
        assert_eq!(account.owner, owner);
        assert_eq!(account.amount, 437_000);
        assert_eq!(account.state, AccountState::Initialized);
        assert_eq!(account.delegate, None);
        assert_eq!(account.is_native, None);
    }

    #[test]
    fn unpack_with_delegate() {
        let mut data = pack_for_tests(Pubkey::new([1u8; 32]), Pubkey::new([2u8; 32]), 5);
        data[72] = 1;
        data[76..108].copy_from_slice(&[3u8; 32]);
        data[121..129].copy_from_slice(&4u64.to_le_bytes());

        let account = TokenAccount::unpack(&data).unwrap();
        assert_eq!(account.delegate, Some(Pubkey::new([3u8; 32])));
        assert_eq!(account.delegated_amount, 4);
    }

    #[test]
    fn short_data_is_invalid_format() {
        let err = TokenAccount::unpack(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidFormat {
                expected: 165,
                actual: 100
            }
        ));
    }

    #[test]
    fn well_known_program_ids() {
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_base58(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
        assert_eq!(
            SYSVAR_RENT_ID.to_base58(),
            "SysvarRent111111111111111111111111111111111"
        );
    }

    #[test]
    fn associated_address_of_usdc_holder() {
        let owner: Pubkey = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM".parse().unwrap();
        let usdc: Pubkey = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".parse().unwrap();

        let ata = associated_token_address(&owner, &usdc).unwrap();
        assert_eq!(ata.to_base58(), "FGETo8T8wMcN2wCjav8VK6eh3dLk63evNDPxzLSJra8B");
        assert!(!ata.is_on_curve());

        let other_mint = Pubkey::new([5u8; 32]);
        assert_ne!(associated_token_address(&owner, &other_mint).unwrap(), ata);
    }

    #[test]
    fn create_associated_account_layout() {
        let funding = Pubkey::new([1u8; 32]);
        let wallet = Pubkey::new([2u8; 32]);
        let mint = Pubkey::new([3u8; 32]);

        let (ix, associated) = create_associated_token_account(&funding, &wallet, &mint).unwrap();
        assert_eq!(associated, associated_token_address(&wallet, &mint).unwrap());
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM_ID);
        assert!(ix.data.is_empty());

        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                funding,
                associated,
                wallet,
                mint,
                SYSTEM_PROGRAM_ID,
                TOKEN_PROGRAM_ID,
                SYSVAR_RENT_ID
            ]
        );
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
        assert!(ix.accounts[2..].iter().all(|m| !m.is_signer && !m.is_writable));
    }

    #[test]
    fn bad_state_is_rejected() {
        let mut data = pack_for_tests(Pubkey::default(), Pubkey::default(), 0);
        data[108] = 7;
        assert!(TokenAccount::unpack(&data).is_err());
    }
}
