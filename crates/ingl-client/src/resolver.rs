//! Program account addresses.
//!
//! Every account the program reads lives at an address derived from fixed
//! seeds, so the client recomputes them instead of storing them. Numbered
//! accounts (vote accounts, proposals) use the counter as a 4-byte
//! big-endian seed.

use ingl_sol::programs::TOKEN_METADATA_PROGRAM_ID;
use ingl_sol::{derive_associated_token_address, find_program_address, Address};

use crate::error::ClientError;

pub const INGL_CONFIG_SEED: &[u8] = b"ingl_config";
pub const URIS_ACCOUNT_SEED: &[u8] = b"uris_account";
pub const GENERAL_ACCOUNT_SEED: &[u8] = b"general_account";
pub const INGL_NFT_COLLECTION_KEY: &[u8] = b"ingl_nft_collection";
pub const INGL_MINT_AUTHORITY_KEY: &[u8] = b"ingl_mint_authority";
pub const COLLECTION_HOLDER_KEY: &[u8] = b"collection_holder";
pub const VOTE_ACCOUNT_KEY: &[u8] = b"vote_account";
pub const AUTHORIZED_WITHDRAWER_KEY: &[u8] = b"authorized_withdrawer";
pub const STAKE_ACCOUNT_KEY: &[u8] = b"stake_account";
pub const PD_POOL_ACCOUNT_KEY: &[u8] = b"pd_pool_account";
pub const GEM_ACCOUNT_CONST: &[u8] = b"gem_account";
pub const INGL_PROGRAM_AUTHORITY_KEY: &[u8] = b"ingl_program_authority";
pub const INGL_PROPOSAL_KEY: &[u8] = b"ingl_proposal";
pub const T_STAKE_ACCOUNT_KEY: &[u8] = b"t_stake_account_key";
pub const T_WITHDRAW_KEY: &[u8] = b"t_withdraw_key";
pub const BUFFER_AUTHORITY_KEY: &[u8] = b"authority";

const METADATA_PREFIX: &[u8] = b"metadata";
const EDITION_SUFFIX: &[u8] = b"edition";

fn derive(seeds: &[&[u8]], owner: &Address) -> Result<Address, ClientError> {
    Ok(find_program_address(seeds, owner)?.0)
}

/// Addresses of the accounts owned by one deployment of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAccounts {
    program_id: Address,
}

impl ProgramAccounts {
    pub fn new(program_id: Address) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> Address {
        self.program_id
    }

    fn singleton(&self, seed: &[u8]) -> Result<Address, ClientError> {
        derive(&[seed], &self.program_id)
    }

    pub fn config(&self) -> Result<Address, ClientError> {
        self.singleton(INGL_CONFIG_SEED)
    }

    pub fn uris(&self) -> Result<Address, ClientError> {
        self.singleton(URIS_ACCOUNT_SEED)
    }

    pub fn general(&self) -> Result<Address, ClientError> {
        self.singleton(GENERAL_ACCOUNT_SEED)
    }

    pub fn collection_mint(&self) -> Result<Address, ClientError> {
        self.singleton(INGL_NFT_COLLECTION_KEY)
    }

    pub fn mint_authority(&self) -> Result<Address, ClientError> {
        self.singleton(INGL_MINT_AUTHORITY_KEY)
    }

    pub fn collection_holder(&self) -> Result<Address, ClientError> {
        self.singleton(COLLECTION_HOLDER_KEY)
    }

    pub fn authorized_withdrawer(&self) -> Result<Address, ClientError> {
        self.singleton(AUTHORIZED_WITHDRAWER_KEY)
    }

    pub fn stake(&self) -> Result<Address, ClientError> {
        self.singleton(STAKE_ACCOUNT_KEY)
    }

    pub fn pd_pool(&self) -> Result<Address, ClientError> {
        self.singleton(PD_POOL_ACCOUNT_KEY)
    }

    pub fn t_stake(&self) -> Result<Address, ClientError> {
        self.singleton(T_STAKE_ACCOUNT_KEY)
    }

    pub fn t_withdraw(&self) -> Result<Address, ClientError> {
        self.singleton(T_WITHDRAW_KEY)
    }

    pub fn program_authority(&self) -> Result<Address, ClientError> {
        self.singleton(INGL_PROGRAM_AUTHORITY_KEY)
    }

    /// The per-gem data account of `mint`.
    pub fn gem(&self, mint: &Address) -> Result<Address, ClientError> {
        derive(&[GEM_ACCOUNT_CONST, mint.as_bytes()], &self.program_id)
    }

    pub fn vote_account(&self, numeration: u32) -> Result<Address, ClientError> {
        derive(&[VOTE_ACCOUNT_KEY, &numeration.to_be_bytes()], &self.program_id)
    }

    pub fn proposal(&self, numeration: u32) -> Result<Address, ClientError> {
        derive(&[INGL_PROPOSAL_KEY, &numeration.to_be_bytes()], &self.program_id)
    }

    /// Find the numeration of an existing vote account.
    ///
    /// With `numeration` given the address is derived directly and `target`
    /// is not consulted. Otherwise `target` is searched for from
    /// `counter_hint` downwards.
    pub fn resolve_vote_account(
        &self,
        target: Option<&Address>,
        numeration: Option<u32>,
        counter_hint: u32,
    ) -> Result<(Address, u32), ClientError> {
        resolve_numbered(target, numeration, counter_hint, |n| self.vote_account(n))
    }

    /// Find the numeration of an existing governance proposal.
    pub fn resolve_proposal(
        &self,
        target: Option<&Address>,
        numeration: Option<u32>,
        counter_hint: u32,
    ) -> Result<(Address, u32), ClientError> {
        resolve_numbered(target, numeration, counter_hint, |n| self.proposal(n))
    }
}

/// Buffer authority PDA of an upgradeable `program`, owned by `program`.
pub fn buffer_authority(program: &Address) -> Result<Address, ClientError> {
    derive(&[BUFFER_AUTHORITY_KEY, program.as_bytes()], program)
}

/// Upgrade authority PDA of an upgradeable `program`, owned by `program`.
pub fn upgrade_authority(program: &Address) -> Result<Address, ClientError> {
    derive(&[INGL_PROGRAM_AUTHORITY_KEY, program.as_bytes()], program)
}

/// Metaplex metadata account of `mint`.
pub fn metadata(mint: &Address) -> Result<Address, ClientError> {
    derive(
        &[
            METADATA_PREFIX,
            TOKEN_METADATA_PROGRAM_ID.as_bytes(),
            mint.as_bytes(),
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Metaplex master edition account of `mint`.
pub fn edition(mint: &Address) -> Result<Address, ClientError> {
    derive(
        &[
            METADATA_PREFIX,
            TOKEN_METADATA_PROGRAM_ID.as_bytes(),
            mint.as_bytes(),
            EDITION_SUFFIX,
        ],
        &TOKEN_METADATA_PROGRAM_ID,
    )
}

/// Associated token account holding `mint` for `wallet`.
pub fn associated_token(wallet: &Address, mint: &Address) -> Result<Address, ClientError> {
    Ok(derive_associated_token_address(wallet, mint)?)
}

fn resolve_numbered(
    target: Option<&Address>,
    numeration: Option<u32>,
    counter_hint: u32,
    derive: impl Fn(u32) -> Result<Address, ClientError>,
) -> Result<(Address, u32), ClientError> {
    match (numeration, target) {
        (Some(n), _) => Ok((derive(n)?, n)),
        (None, Some(target)) => {
            let n = find_numeration(target, counter_hint, derive)?;
            Ok((*target, n))
        }
        (None, None) => Err(ClientError::InvalidArgument(
            "either a numeration or an account address is required".into(),
        )),
    }
}

/// Walk numerations from `upper_bound` down to 0, re-deriving each
/// candidate, and return the first whose address equals `target`.
///
/// `upper_bound` is inclusive. It usually comes from a counter the caller
/// read earlier and is only a hint: a stale or forged counter makes the
/// search miss, it never makes it return a wrong numeration.
pub fn find_numeration(
    target: &Address,
    upper_bound: u32,
    derive: impl Fn(u32) -> Result<Address, ClientError>,
) -> Result<u32, ClientError> {
    for n in (0..=upper_bound).rev() {
        if derive(n)? == *target {
            tracing::trace!(%target, numeration = n, "resolved numbered account");
            return Ok(n);
        }
    }
    Err(ClientError::NotFound(format!(
        "no numeration in 0..={upper_bound} derives {target}"
    )))
}
