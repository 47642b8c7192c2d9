//! Hand-built ledger message compilation and wire format.
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
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! The message is the exact byte string every signer signs. Signature slot
//! `i` belongs to `account_keys[i]` for `i < num_required_sigs`.

use ed25519_dalek::{Signature, VerifyingKey};

use crate::address::Address;
use crate::error::SolError;

/// Length of one Ed25519 signature on the wire.
pub const SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in the ledger's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
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

/// Decode a compact-u16 value from the front of `data`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;

    for (consumed, &byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * consumed);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, consumed + 1))
                .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()));
        }
    }

    if data.len() < 3 {
        Err(SolError::SerializationError(
            "unexpected end of data while decoding compact-u16".into(),
        ))
    } else {
        Err(SolError::SerializationError(
            "compact-u16 longer than 3 bytes".into(),
        ))
    }
}

fn push_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    buf.extend_from_slice(&encode_compact_u16(len));
    Ok(())
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(address: Address, is_signer: bool) -> Self {
        Self {
            address,
            is_signer,
            is_writable: false,
        }
    }
}

/// An instruction before it is compiled into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled instruction where account references are replaced by u8
/// indices into the message's `account_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

/// A compiled, unsigned message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Number of required signatures (the first N account keys sign).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,
    /// All account keys in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Address>,
    pub recent_blockhash: [u8; 32],
    pub instructions: Vec<CompiledInstruction>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

impl Message {
    /// Compile instructions into a message paid for by `fee_payer`.
    ///
    /// The fee payer is always a writable signer at index 0. An account
    /// referenced more than once gets the union of its permission bits.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Address,
        recent_blockhash: [u8; 32],
    ) -> Result<Self, SolError> {
        struct AccountEntry {
            address: Address,
            is_signer: bool,
            is_writable: bool,
        }

        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |address: Address, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.address == address) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    address,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        upsert(*fee_payer, true, true);
        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.address, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        // Stable sort: the fee payer was inserted first with the lowest rank,
        // so it stays at index 0.
        entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
            (true, true) => 0u8,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        });

        if entries.len() > u8::MAX as usize {
            return Err(SolError::TransactionBuildError(format!(
                "{} accounts exceeds the limit of {}",
                entries.len(),
                u8::MAX
            )));
        }

        let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Address> = entries.iter().map(|e| e.address).collect();
        let index_of = |address: &Address| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == address)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    SolError::TransactionBuildError(format!("{address} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(instructions.len());
        for ix in instructions {
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.address))
                .collect::<Result<Vec<_>, _>>()?;
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

    /// The addresses that must sign, in signature-slot order.
    pub fn signer_keys(&self) -> &[Address] {
        let n = (self.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(3 + 1 + 32 * (self.account_keys.len() + 1) + 64);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        push_len(&mut buf, self.account_keys.len(), "account keys")?;
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        push_len(&mut buf, self.instructions.len(), "instructions")?;
        for ix in &self.instructions {
            buf.push(ix.program_id_index);
            push_len(&mut buf, ix.account_indices.len(), "instruction accounts")?;
            buf.extend_from_slice(&ix.account_indices);
            push_len(&mut buf, ix.data.len(), "instruction data bytes")?;
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Prefix serialized message bytes with their signatures.
pub fn serialize_wire(
    signatures: &[[u8; SIGNATURE_LEN]],
    message: &[u8],
) -> Result<Vec<u8>, SolError> {
    let mut wire = Vec::with_capacity(3 + SIGNATURE_LEN * signatures.len() + message.len());
    push_len(&mut wire, signatures.len(), "signatures")?;
    for signature in signatures {
        wire.extend_from_slice(signature);
    }
    wire.extend_from_slice(message);
    Ok(wire)
}

/// Split a wire transaction into its signature slots and message bytes.
pub fn split_wire(raw: &[u8]) -> Result<(Vec<[u8; SIGNATURE_LEN]>, &[u8]), SolError> {
    let (num_sigs, compact_len) = decode_compact_u16(raw)?;

    let sigs_end = compact_len + num_sigs as usize * SIGNATURE_LEN;
    if sigs_end > raw.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }

    let signatures = raw[compact_len..sigs_end]
        .chunks_exact(SIGNATURE_LEN)
        .map(|chunk| {
            let mut slot = [0u8; SIGNATURE_LEN];
            slot.copy_from_slice(chunk);
            slot
        })
        .collect();

    Ok((signatures, &raw[sigs_end..]))
}

/// Check `signature` over `message` against the Ed25519 key at `address`.
///
/// Program-derived addresses are not valid keys and never verify.
pub fn verify_signature(address: &Address, message: &[u8], signature: &[u8; SIGNATURE_LEN]) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(address.as_bytes()) else {
        return false;
    };
    key.verify_strict(message, &Signature::from_bytes(signature))
        .is_ok()
}
