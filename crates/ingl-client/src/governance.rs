//! Governance proposal payloads.
//!
//! A proposal is a two-level union. The outer [`GovernanceType`] picks what
//! is governed; configuration and vote-account proposals then carry an inner
//! union naming the exact change. On the wire the inner bytes follow the
//! outer bytes directly:
//!
//! ```text
//! 0x00 ConfigAccount          ++ ConfigAccountType
//! 0x01 ProgramUpgrade{buffer_account, code_link}
//! 0x02 VoteAccountGovernance  ++ VoteAccountGovernance
//! ```

use ingl_codec::{CodecError, Decode, Encode, Reader};
use ingl_sol::Address;

use crate::error::ClientError;
use crate::instruction::{check_at_least, check_max, MIN_STAKE_LAMPORTS};

/// Largest redemption fee window the program accepts: two years, in seconds.
pub const MAX_REDEMPTION_FEE_DURATION: u32 = 63_072_000;
pub const MAX_INITIAL_REDEMPTION_FEE: u8 = 25;

/// The outer selector of a governance proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernanceType {
    ConfigAccount,
    ProgramUpgrade {
        buffer_account: Address,
        code_link: String,
    },
    VoteAccountGovernance,
}

impl GovernanceType {
    fn discriminant(&self) -> u8 {
        match self {
            Self::ConfigAccount => 0,
            Self::ProgramUpgrade { .. } => 1,
            Self::VoteAccountGovernance => 2,
        }
    }
}

/// A change to one field of the validator configuration account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigAccountType {
    MaxPrimaryStake(u64),
    NftHolderShare(u8),
    InitialRedemptionFee(u8),
    RedemptionFeeDuration(u32),
    ValidatorName(String),
    TwitterHandle(String),
    DiscordInvite(String),
}

impl ConfigAccountType {
    fn validate(&self) -> Result<(), ClientError> {
        match self {
            Self::MaxPrimaryStake(v) => check_at_least("max_primary_stake", *v, MIN_STAKE_LAMPORTS),
            Self::NftHolderShare(v) => check_max("nft_holder_share", *v, 100),
            Self::InitialRedemptionFee(v) => {
                check_max("initial_redemption_fee", *v, MAX_INITIAL_REDEMPTION_FEE)
            }
            Self::RedemptionFeeDuration(v) => {
                check_max("redemption_fee_duration", *v, MAX_REDEMPTION_FEE_DURATION)
            }
            Self::ValidatorName(_) | Self::TwitterHandle(_) | Self::DiscordInvite(_) => Ok(()),
        }
    }
}

impl Encode for ConfigAccountType {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::MaxPrimaryStake(v) => {
                out.push(0);
                v.encode(out)
            }
            Self::NftHolderShare(v) => {
                out.push(1);
                v.encode(out)
            }
            Self::InitialRedemptionFee(v) => {
                out.push(2);
                v.encode(out)
            }
            Self::RedemptionFeeDuration(v) => {
                out.push(3);
                v.encode(out)
            }
            Self::ValidatorName(s) => {
                out.push(4);
                s.encode(out)
            }
            Self::TwitterHandle(s) => {
                out.push(5);
                s.encode(out)
            }
            Self::DiscordInvite(s) => {
                out.push(6);
                s.encode(out)
            }
        }
    }
}

impl Decode for ConfigAccountType {
    const MIN_LEN: usize = 2;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(match reader.read_discriminant("ConfigAccountType", 7)? {
            0 => Self::MaxPrimaryStake(u64::decode(reader)?),
            1 => Self::NftHolderShare(u8::decode(reader)?),
            2 => Self::InitialRedemptionFee(u8::decode(reader)?),
            3 => Self::RedemptionFeeDuration(u32::decode(reader)?),
            4 => Self::ValidatorName(String::decode(reader)?),
            5 => Self::TwitterHandle(String::decode(reader)?),
            _ => Self::DiscordInvite(String::decode(reader)?),
        })
    }
}

/// A change to the validator's vote account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteAccountGovernance {
    ValidatorId(Address),
    Commission(u8),
}

impl Encode for VoteAccountGovernance {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::ValidatorId(id) => {
                out.push(0);
                id.encode(out)
            }
            Self::Commission(v) => {
                out.push(1);
                v.encode(out)
            }
        }
    }
}

impl Decode for VoteAccountGovernance {
    const MIN_LEN: usize = 2;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(match reader.read_discriminant("VoteAccountGovernance", 2)? {
            0 => Self::ValidatorId(Address::decode(reader)?),
            _ => Self::Commission(u8::decode(reader)?),
        })
    }
}

/// A complete, well-formed proposal: the outer kind plus its inner payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Governance {
    ConfigAccount(ConfigAccountType),
    ProgramUpgrade {
        buffer_account: Address,
        code_link: String,
    },
    VoteAccount(VoteAccountGovernance),
}

impl Governance {
    /// Pair an outer kind with its inner payload.
    ///
    /// Exactly the payload the kind takes must be supplied: a config change
    /// for `ConfigAccount`, a vote-account change for
    /// `VoteAccountGovernance`, and neither for `ProgramUpgrade`.
    pub fn new(
        kind: GovernanceType,
        config: Option<ConfigAccountType>,
        vote_account: Option<VoteAccountGovernance>,
    ) -> Result<Self, ClientError> {
        let governance = match (kind, config, vote_account) {
            (GovernanceType::ConfigAccount, Some(config), None) => Self::ConfigAccount(config),
            (GovernanceType::VoteAccountGovernance, None, Some(change)) => {
                Self::VoteAccount(change)
            }
            (
                GovernanceType::ProgramUpgrade {
                    buffer_account,
                    code_link,
                },
                None,
                None,
            ) => Self::ProgramUpgrade {
                buffer_account,
                code_link,
            },
            (kind, config, vote_account) => {
                return Err(ClientError::InvalidArgument(format!(
                    "governance kind {} does not take the supplied payload (config: {}, vote account: {})",
                    kind.discriminant(),
                    config.is_some(),
                    vote_account.is_some()
                )))
            }
        };
        governance.validate()?;
        Ok(governance)
    }

    /// The outer selector of this proposal.
    pub fn kind(&self) -> GovernanceType {
        match self {
            Self::ConfigAccount(_) => GovernanceType::ConfigAccount,
            Self::ProgramUpgrade {
                buffer_account,
                code_link,
            } => GovernanceType::ProgramUpgrade {
                buffer_account: *buffer_account,
                code_link: code_link.clone(),
            },
            Self::VoteAccount(_) => GovernanceType::VoteAccountGovernance,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        match self {
            Self::ConfigAccount(change) => change.validate(),
            Self::VoteAccount(VoteAccountGovernance::Commission(v)) => check_max("commission", *v, 100),
            Self::VoteAccount(VoteAccountGovernance::ValidatorId(_)) => Ok(()),
            Self::ProgramUpgrade { code_link, .. } => {
                if code_link.is_empty() {
                    return Err(ClientError::InvalidArgument(
                        "program upgrade proposals need a code link".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Encode for Governance {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::ConfigAccount(change) => {
                out.push(0);
                change.encode(out)
            }
            Self::ProgramUpgrade {
                buffer_account,
                code_link,
            } => {
                out.push(1);
                buffer_account.encode(out)?;
                code_link.encode(out)
            }
            Self::VoteAccount(change) => {
                out.push(2);
                change.encode(out)
            }
        }
    }
}

impl Decode for Governance {
    const MIN_LEN: usize = 3;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(match reader.read_discriminant("GovernanceType", 3)? {
            0 => Self::ConfigAccount(ConfigAccountType::decode(reader)?),
            1 => Self::ProgramUpgrade {
                buffer_account: Address::decode(reader)?,
                code_link: String::decode(reader)?,
            },
            _ => Self::VoteAccount(VoteAccountGovernance::decode(reader)?),
        })
    }
}
