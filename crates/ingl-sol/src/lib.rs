//! Ledger primitives for the Ingl client.
//!
//! Addresses, program-derived address search, well-known program ids, and
//! the compact transaction wire format, implemented by hand without pulling
//! in `solana-sdk`. Ed25519 comes from `ed25519-dalek`, curve checks from
//! `curve25519-dalek`, and Base58 from `bs58`.

pub mod address;
pub mod error;
pub mod pda;
pub mod programs;
pub mod transaction;

pub use address::Address;
pub use error::SolError;
pub use pda::{create_program_address, find_program_address, MAX_SEEDS, MAX_SEED_LEN};
pub use programs::derive_associated_token_address;
pub use transaction::{
    decode_compact_u16, encode_compact_u16, serialize_wire, split_wire, verify_signature,
    AccountMeta, CompiledInstruction, Instruction, Message, SIGNATURE_LEN,
};
