//! Ledger message compilation and transaction wire format.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use super::keypair::Signature;
use super::pubkey::Pubkey;
use crate::error::{BridgeError, BridgeResult};

use std::collections::HashMap;

/// Largest serialized transaction the ledger accepts (IPv6 MTU minus headers).
pub const PACKET_DATA_SIZE: usize = 1232;

/// Recent blockhash, the transaction recency token.
pub type Hash = [u8; 32];

/// Encode a `u16` in the ledger's compact-u16 (LEB128-style) format.
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> BridgeResult<(u16, usize)> {
    let mut value: u32 = 0;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            BridgeError::Serialization("unexpected end of data while decoding compact-u16".into())
        })?;
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        consumed += 1;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    u16::try_from(value)
        .map(|v| (v, consumed))
        .map_err(|_| BridgeError::Serialization("compact-u16 value overflow".into()))
}

/// One account reference of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// Account references replaced with indices into `Message::account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    /// Canonical order: writable signers (fee payer first), read-only
    /// signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

impl Message {
    /// Compile instructions for a single fee payer.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> BridgeResult<Self> {
        struct Entry {
            pubkey: Pubkey,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(Entry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        // Fee payer pays rent and fees, so it is always a writable signer.
        upsert(*fee_payer, true, true);

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort keeps insertion order within a category, so the fee
        // payer stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize + 1 {
            return Err(BridgeError::Serialization(format!(
                "{} accounts exceed the u8 index space",
                entries.len()
            )));
        }

        let count = |f: fn(&Entry) -> bool| entries.iter().filter(|e| f(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| -> BridgeResult<u8> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| BridgeError::Serialization(format!("account {key} not in message")))
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<BridgeResult<Vec<u8>>>()?;

            compiled.push(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Self {
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    /// Keys that must sign, in signature-slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    /// The canonical bytes every signer signs.
    pub fn serialize(&self) -> BridgeResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&encode_compact_u16(checked_len(self.account_keys.len())?));
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&encode_compact_u16(checked_len(self.instructions.len())?));
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            buf.extend_from_slice(&encode_compact_u16(checked_len(ix.account_indices.len())?));
            buf.extend_from_slice(&ix.account_indices);
            buf.extend_from_slice(&encode_compact_u16(checked_len(ix.data.len())?));
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

fn checked_len(len: usize) -> BridgeResult<u16> {
    u16::try_from(len)
        .map_err(|_| BridgeError::Serialization(format!("length {len} exceeds compact-u16")))
}

/// A message plus one signature per required signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub signatures: Vec<Signature>,
    pub message: Message,
}

impl Transaction {
    /// Place signatures into the slots the message header dictates.
    ///
    /// Every required signer must be present in `signatures`; entries for
    /// keys that are not required signers are dropped.
    pub fn assemble(message: Message, signatures: &HashMap<Pubkey, Signature>) -> BridgeResult<Self> {
        let ordered = message
            .signer_keys()
            .iter()
            .map(|key| {
                signatures
                    .get(key)
                    .copied()
                    .ok_or_else(|| BridgeError::Signing(format!("missing signature for {key}")))
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        Ok(Self {
            signatures: ordered,
            message,
        })
    }

    pub fn serialize(&self) -> BridgeResult<Vec<u8>> {
        let message = self.message.serialize()?;
        let mut wire = Vec::with_capacity(3 + 64 * self.signatures.len() + message.len());
        wire.extend_from_slice(&encode_compact_u16(checked_len(self.signatures.len())?));
        for sig in &self.signatures {
            wire.extend_from_slice(&sig.0);
        }
        wire.extend_from_slice(&message);
        Ok(wire)
    }

    /// Size on the wire without signing, for batch packing.
    pub fn wire_size(message: &Message) -> BridgeResult<usize> {
        let signers = message.num_required_signatures as usize;
        Ok(encode_compact_u16(checked_len(signers)?).len() + 64 * signers + message.serialize()?.len())
    }

    /// The first signature identifies the transaction.
    pub fn id(&self) -> Option<String> {
        self.signatures.first().map(Signature::to_base58)
    }
}
