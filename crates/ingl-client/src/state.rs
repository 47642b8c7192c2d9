//! Program account layouts.
//!
//! The client only reads these; field order is the program's storage order.
//! Every layout starts with the program's validation phrase for that
//! account kind.

use ingl_codec::{codec_struct, OrderedMap};
use ingl_sol::Address;

use crate::error::ClientError;

/// Byte offset of the funds location (the vote account a gem is delegated
/// to) inside a gem account.
pub const GEM_FUNDS_LOCATION_OFFSET: usize = 20;

codec_struct! {
    /// Program-wide counters kept in the general account.
    pub struct GlobalGems {
        pub validation_phrase: u32,
        /// Number of vote accounts created so far.
        pub counter: u32,
        pub total_raised: u64,
        pub pd_pool_total: u64,
        pub delegated_total: u64,
        pub dealloced_total: u64,
        pub is_proposal_ongoing: bool,
        pub proposal_numeration: u32,
        pub pending_delegation_total: u64,
        pub upgrade_proposal_numeration: u32,
        pub validator_list: Vec<Address>,
    }
}

codec_struct! {
    pub struct VoteRewards {
        pub validation_phrase: u32,
        pub epoch_number: u64,
        pub total_reward: u64,
        pub total_stake: u64,
    }
}

codec_struct! {
    pub struct RebalancingData {
        pub pending_validator_rewards: u64,
        pub unclaimed_validator_rewards: u64,
        pub is_rebalancing_active: bool,
    }
}

codec_struct! {
    pub struct InglVoteAccountData {
        pub validation_phrase: u32,
        pub total_delegated: u64,
        pub last_withdraw_epoch: u64,
        pub dealloced: u64,
        pub rebalancing_data: RebalancingData,
        pub validator_id: Address,
        pub last_total_staked: u64,
        pub is_t_stake_initialized: bool,
        pub pending_delegation_total: u64,
        pub vote_rewards: Vec<VoteRewards>,
    }
}

codec_struct! {
    pub struct ValidatorProposal {
        pub validation_phrase: u32,
        pub validator_ids: Vec<Address>,
        pub date_created: u32,
        pub date_finalized: Option<u32>,
        pub votes: Vec<u32>,
        pub winner: Option<Address>,
    }
}

codec_struct! {
    pub struct UpgradeVote {
        pub vote: bool,
        pub validator_id: Address,
    }
}

codec_struct! {
    pub struct ProgramUpgradeData {
        pub validation_phrase: u32,
        pub buffer_address: Address,
        pub code_link: String,
        pub is_still_ongoing: bool,
        /// Keyed by the voting gem's mint.
        pub votes: OrderedMap<Address, UpgradeVote>,
    }
}

codec_struct! {
    pub struct ValidatorConfig {
        pub validation_phrase: u32,
        pub is_validator_id_switchable: bool,
        pub max_primary_stake: u64,
        pub nft_holders_share: u8,
        pub initial_redemption_fee: u8,
        pub unit_stake: u64,
        pub redemption_fee_duration: u32,
        pub proposal_quorum: u8,
        pub creator_royalties: u16,
        pub commission: u8,
        pub validator_id: Address,
        pub validator_name: String,
        pub twitter_handle: String,
        pub discord_invite: String,
        pub website: String,
    }
}

/// Read the 32-byte address stored at `offset` in raw account data.
pub fn read_address_at(data: &[u8], offset: usize) -> Result<Address, ClientError> {
    let end = offset
        .checked_add(32)
        .ok_or_else(|| ClientError::AccountData(format!("offset {offset} overflows")))?;
    let bytes = data.get(offset..end).ok_or_else(|| {
        ClientError::AccountData(format!(
            "account data is {} bytes; no address at offset {offset}",
            data.len()
        ))
    })?;
    Ok(Address::try_from_slice(bytes)?)
}

/// Decode an account layout, ignoring any trailing allocation slack.
pub fn decode_account<T: ingl_codec::Decode>(data: &[u8]) -> Result<T, ClientError> {
    ingl_codec::decode::<T>(data)
        .map(|(value, _)| value)
        .map_err(|e| ClientError::AccountData(e.to_string()))
}
