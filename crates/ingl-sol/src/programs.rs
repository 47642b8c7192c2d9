//! Well-known program and sysvar ids, and associated token account derivation.
//!
//! Base58 cannot be decoded in a `const` context, so every id is spelled out
//! as its raw bytes; the tests pin each one to its Base58 form.

use crate::address::Address;
use crate::error::SolError;
use crate::pda::find_program_address;

/// System Program: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

/// SPL Token Program: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Address = Address::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb,
    0x79, 0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85,
    0x7e, 0xff, 0x00, 0xa9,
]);

/// Associated Token Account Program: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Address = Address::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e,
    0x0d, 0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8,
    0xdb, 0xe9, 0xf8, 0x59,
]);

/// Metaplex Token Metadata Program: `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const TOKEN_METADATA_PROGRAM_ID: Address = Address::new([
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04,
    0xc3, 0xcd, 0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc,
    0x03, 0xf8, 0x29, 0x46,
]);

/// Vote Program: `Vote111111111111111111111111111111111111111`
pub const VOTE_PROGRAM_ID: Address = Address::new([
    0x07, 0x61, 0x48, 0x1d, 0x35, 0x74, 0x74, 0xbb, 0x7c, 0x4d, 0x76, 0x24, 0xeb, 0xd3,
    0xbd, 0xb3, 0xd8, 0x35, 0x5e, 0x73, 0xd1, 0x10, 0x43, 0xfc, 0x0d, 0xa3, 0x53, 0x80,
    0x00, 0x00, 0x00, 0x00,
]);

/// Stake Program: `Stake11111111111111111111111111111111111111`
pub const STAKE_PROGRAM_ID: Address = Address::new([
    0x06, 0xa1, 0xd8, 0x17, 0x91, 0x37, 0x54, 0x2a, 0x98, 0x34, 0x37, 0xbd, 0xfe, 0x2a,
    0x7a, 0xb2, 0x55, 0x7f, 0x53, 0x5c, 0x8a, 0x78, 0x72, 0x2b, 0x68, 0xa4, 0x9d, 0xc0,
    0x00, 0x00, 0x00, 0x00,
]);

/// Stake config account: `StakeConfig11111111111111111111111111111111`
pub const STAKE_CONFIG_ID: Address = Address::new([
    0x06, 0xa1, 0xd8, 0x17, 0xa5, 0x02, 0x05, 0x0b, 0x68, 0x07, 0x91, 0xe6, 0xce, 0x6d,
    0xb8, 0x8e, 0x1e, 0x5b, 0x71, 0x50, 0xf6, 0x1f, 0xc6, 0x79, 0x0a, 0x4e, 0xb4, 0xd1,
    0x00, 0x00, 0x00, 0x00,
]);

/// BPF Upgradeable Loader: `BPFLoaderUpgradeab1e11111111111111111111111`
pub const BPF_UPGRADEABLE_LOADER_ID: Address = Address::new([
    0x02, 0xa8, 0xf6, 0x91, 0x4e, 0x88, 0xa1, 0xb0, 0xe2, 0x10, 0x15, 0x3e, 0xf7, 0x63,
    0xae, 0x2b, 0x00, 0xc2, 0xb9, 0x3d, 0x16, 0xc1, 0x24, 0xd2, 0xc0, 0x53, 0x7a, 0x10,
    0x04, 0x80, 0x00, 0x00,
]);

/// Compute Budget Program: `ComputeBudget111111111111111111111111111111`
pub const COMPUTE_BUDGET_PROGRAM_ID: Address = Address::new([
    0x03, 0x06, 0x46, 0x6f, 0xe5, 0x21, 0x17, 0x32, 0xff, 0xec, 0xad, 0xba, 0x72, 0xc3,
    0x9b, 0xe7, 0xbc, 0x8c, 0xe5, 0xbb, 0xc5, 0xf7, 0x12, 0x6b, 0x2c, 0x43, 0x9b, 0x3a,
    0x40, 0x00, 0x00, 0x00,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: Address = Address::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a,
    0xf1, 0x7f, 0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a,
    0x00, 0x00, 0x00, 0x00,
]);

/// Clock sysvar: `SysvarC1ock11111111111111111111111111111111`
pub const SYSVAR_CLOCK_ID: Address = Address::new([
    0x06, 0xa7, 0xd5, 0x17, 0x18, 0xc7, 0x74, 0xc9, 0x28, 0x56, 0x63, 0x98, 0x69, 0x1d,
    0x5e, 0xb6, 0x8b, 0x5e, 0xb8, 0xa3, 0x9b, 0x4b, 0x6d, 0x5c, 0x73, 0x55, 0x5b, 0x21,
    0x00, 0x00, 0x00, 0x00,
]);

/// Stake history sysvar: `SysvarStakeHistory1111111111111111111111111`
pub const SYSVAR_STAKE_HISTORY_ID: Address = Address::new([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x35, 0x84, 0xd0, 0xfe, 0xed, 0x9b, 0xb3, 0x43, 0x1d,
    0x13, 0x20, 0x6b, 0xe5, 0x44, 0x28, 0x1b, 0x57, 0xb8, 0x56, 0x6c, 0xc5, 0x37, 0x5f,
    0xf4, 0x00, 0x00, 0x00,
]);

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a PDA with seeds `[wallet, token_program_id, mint]` under the
/// Associated Token Account program.
pub fn derive_associated_token_address(
    wallet: &Address,
    mint: &Address,
) -> Result<Address, SolError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}
