//! The program's instruction set.
//!
//! Every instruction is one opcode byte (its declaration index below)
//! followed by its payload in codec layout. The opcode table is the wire
//! contract with the deployed program and must only ever be appended to.
//!
//! Build instructions through the factory functions: they reject arguments
//! the program would refuse before any bytes are produced.

use std::fmt::Display;

use ingl_codec::{codec_struct, CodecError, Decode, Encode, Reader};

use crate::error::ClientError;
use crate::governance::{
    Governance, MAX_INITIAL_REDEMPTION_FEE, MAX_REDEMPTION_FEE_DURATION,
};

pub const MAX_LOG_LEVEL: u8 = 5;
/// One SOL. Stake and unit backing amounts below this are refused.
pub const MIN_STAKE_LAMPORTS: u64 = 1_000_000_000;
/// Rarity thresholds are cumulative out of this total.
pub const RARITY_TOTAL: u16 = 10_000;
pub const MAX_CREATOR_ROYALTIES: u16 = 500;
pub const MIN_PROGRAM_UPGRADE_THRESHOLD: u8 = 65;

codec_struct! {
    /// Arguments of the one-time validator initialisation.
    pub struct InitArgs {
        pub log_level: u8,
        pub init_commission: u8,
        pub max_primary_stake: u64,
        pub nft_holder_share: u8,
        pub initial_redemption_fee: u8,
        pub is_validator_id_switchable: bool,
        pub unit_backing: u64,
        pub redemption_fee_duration: u32,
        pub program_upgrade_threshold: u8,
        pub creator_royalties: u16,
        /// Cumulative thresholds, one per rarity tier, ending at 10_000.
        pub rarities: Vec<u16>,
        pub rarity_names: Vec<String>,
        pub twitter_handle: String,
        pub discord_invite: String,
        pub validator_name: String,
        pub collection_uri: String,
        pub website: String,
    }
}

impl InitArgs {
    pub fn validate(&self) -> Result<(), ClientError> {
        check_log_level(self.log_level)?;
        check_max("init_commission", self.init_commission, 100)?;
        check_at_least("max_primary_stake", self.max_primary_stake, MIN_STAKE_LAMPORTS)?;
        check_max("nft_holder_share", self.nft_holder_share, 100)?;
        check_max(
            "initial_redemption_fee",
            self.initial_redemption_fee,
            MAX_INITIAL_REDEMPTION_FEE,
        )?;
        if self.initial_redemption_fee > 0 && !self.is_validator_id_switchable {
            return Err(ClientError::InvalidArgument(
                "initial_redemption_fee must be 0 when the validator id is not switchable".into(),
            ));
        }
        check_at_least("unit_backing", self.unit_backing, MIN_STAKE_LAMPORTS)?;
        check_max(
            "redemption_fee_duration",
            self.redemption_fee_duration,
            MAX_REDEMPTION_FEE_DURATION,
        )?;
        check_at_least(
            "program_upgrade_threshold",
            self.program_upgrade_threshold,
            MIN_PROGRAM_UPGRADE_THRESHOLD,
        )?;
        check_max("program_upgrade_threshold", self.program_upgrade_threshold, 100)?;
        check_max("creator_royalties", self.creator_royalties, MAX_CREATOR_ROYALTIES)?;
        check_rarities(&self.rarities, &self.rarity_names)
    }
}

fn check_rarities(rarities: &[u16], names: &[String]) -> Result<(), ClientError> {
    if rarities.is_empty() {
        return Err(ClientError::InvalidArgument("rarities must not be empty".into()));
    }
    if rarities.len() != names.len() {
        return Err(ClientError::InvalidArgument(format!(
            "{} rarities but {} rarity names",
            rarities.len(),
            names.len()
        )));
    }
    if rarities.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(ClientError::InvalidArgument(
            "rarities must be non-decreasing".into(),
        ));
    }
    if rarities.last() != Some(&RARITY_TOTAL) {
        return Err(ClientError::InvalidArgument(format!(
            "rarities must end at {RARITY_TOTAL}"
        )));
    }
    Ok(())
}

pub(crate) fn check_max<T: PartialOrd + Display>(
    name: &str,
    value: T,
    max: T,
) -> Result<(), ClientError> {
    if value > max {
        return Err(ClientError::InvalidArgument(format!(
            "{name} {value} exceeds {max}"
        )));
    }
    Ok(())
}

pub(crate) fn check_at_least<T: PartialOrd + Display>(
    name: &str,
    value: T,
    min: T,
) -> Result<(), ClientError> {
    if value < min {
        return Err(ClientError::InvalidArgument(format!(
            "{name} {value} is below {min}"
        )));
    }
    Ok(())
}

fn check_log_level(log_level: u8) -> Result<(), ClientError> {
    check_max("log_level", log_level, MAX_LOG_LEVEL)
}

fn narrow<T: TryFrom<usize>>(name: &str, value: usize) -> Result<T, ClientError> {
    T::try_from(value).map_err(|_| {
        ClientError::InvalidArgument(format!("{name} {value} does not fit its field"))
    })
}

/// Every instruction the program accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InglInstruction {
    MintNft { log_level: u8 },
    Init(InitArgs),
    Redeem { log_level: u8 },
    NftWithdraw { cnt: u32, log_level: u8 },
    ProcessRewards { log_level: u8 },
    InitRebalance { log_level: u8 },
    FinalizeRebalance { log_level: u8 },
    UploadUris { uris: Vec<String>, rarity: u8, log_level: u8 },
    ResetUris { log_level: u8 },
    UnDelegateNft { log_level: u8 },
    DelegateNft { log_level: u8 },
    CreateVoteAccount { log_level: u8 },
    InitGovernance { governance: Governance, log_level: u8 },
    VoteGovernance { numeration: u32, vote: bool, cnt: u8, log_level: u8 },
    FinalizeGovernance { numeration: u32, log_level: u8 },
    ExecuteGovernance { numeration: u32, log_level: u8 },
}

const OPCODE_COUNT: u8 = 16;

impl InglInstruction {
    // -- Factories ---------------------------------------------------------

    pub fn mint_nft(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::MintNft { log_level })
    }

    pub fn init(args: InitArgs) -> Result<Self, ClientError> {
        args.validate()?;
        Ok(Self::Init(args))
    }

    pub fn redeem(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::Redeem { log_level })
    }

    /// Withdraw rewards for `cnt` gems; the transaction must list that many
    /// gem account triples.
    pub fn nft_withdraw(cnt: usize, log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        if cnt == 0 {
            return Err(ClientError::InvalidArgument(
                "nft_withdraw needs at least one gem".into(),
            ));
        }
        Ok(Self::NftWithdraw {
            cnt: narrow("cnt", cnt)?,
            log_level,
        })
    }

    pub fn process_rewards(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::ProcessRewards { log_level })
    }

    pub fn init_rebalance(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::InitRebalance { log_level })
    }

    pub fn finalize_rebalance(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::FinalizeRebalance { log_level })
    }

    pub fn upload_uris(uris: Vec<String>, rarity: u8, log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        if uris.is_empty() {
            return Err(ClientError::InvalidArgument("uris must not be empty".into()));
        }
        narrow::<u32>("uris length", uris.len())?;
        Ok(Self::UploadUris {
            uris,
            rarity,
            log_level,
        })
    }

    pub fn reset_uris(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::ResetUris { log_level })
    }

    pub fn undelegate_nft(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::UnDelegateNft { log_level })
    }

    pub fn delegate_nft(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::DelegateNft { log_level })
    }

    pub fn create_vote_account(log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::CreateVoteAccount { log_level })
    }

    pub fn init_governance(governance: Governance, log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        governance.validate()?;
        Ok(Self::InitGovernance {
            governance,
            log_level,
        })
    }

    /// Vote on proposal `numeration` with `cnt` gems.
    pub fn vote_governance(
        numeration: u32,
        vote: bool,
        cnt: usize,
        log_level: u8,
    ) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        if cnt == 0 {
            return Err(ClientError::InvalidArgument(
                "vote_governance needs at least one gem".into(),
            ));
        }
        Ok(Self::VoteGovernance {
            numeration,
            vote,
            cnt: narrow("cnt", cnt)?,
            log_level,
        })
    }

    pub fn finalize_governance(numeration: u32, log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::FinalizeGovernance {
            numeration,
            log_level,
        })
    }

    pub fn execute_governance(numeration: u32, log_level: u8) -> Result<Self, ClientError> {
        check_log_level(log_level)?;
        Ok(Self::ExecuteGovernance {
            numeration,
            log_level,
        })
    }

    // -- Accessors ---------------------------------------------------------

    pub fn opcode(&self) -> u8 {
        match self {
            Self::MintNft { .. } => 0,
            Self::Init(_) => 1,
            Self::Redeem { .. } => 2,
            Self::NftWithdraw { .. } => 3,
            Self::ProcessRewards { .. } => 4,
            Self::InitRebalance { .. } => 5,
            Self::FinalizeRebalance { .. } => 6,
            Self::UploadUris { .. } => 7,
            Self::ResetUris { .. } => 8,
            Self::UnDelegateNft { .. } => 9,
            Self::DelegateNft { .. } => 10,
            Self::CreateVoteAccount { .. } => 11,
            Self::InitGovernance { .. } => 12,
            Self::VoteGovernance { .. } => 13,
            Self::FinalizeGovernance { .. } => 14,
            Self::ExecuteGovernance { .. } => 15,
        }
    }

    pub fn log_level(&self) -> u8 {
        match self {
            Self::Init(args) => args.log_level,
            Self::MintNft { log_level }
            | Self::Redeem { log_level }
            | Self::NftWithdraw { log_level, .. }
            | Self::ProcessRewards { log_level }
            | Self::InitRebalance { log_level }
            | Self::FinalizeRebalance { log_level }
            | Self::UploadUris { log_level, .. }
            | Self::ResetUris { log_level }
            | Self::UnDelegateNft { log_level }
            | Self::DelegateNft { log_level }
            | Self::CreateVoteAccount { log_level }
            | Self::InitGovernance { log_level, .. }
            | Self::VoteGovernance { log_level, .. }
            | Self::FinalizeGovernance { log_level, .. }
            | Self::ExecuteGovernance { log_level, .. } => *log_level,
        }
    }
}

impl Encode for InglInstruction {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.push(self.opcode());
        match self {
            Self::Init(args) => args.encode(out),
            Self::NftWithdraw { cnt, log_level } => {
                cnt.encode(out)?;
                log_level.encode(out)
            }
            Self::UploadUris {
                uris,
                rarity,
                log_level,
            } => {
                uris.encode(out)?;
                rarity.encode(out)?;
                log_level.encode(out)
            }
            Self::InitGovernance {
                governance,
                log_level,
            } => {
                governance.encode(out)?;
                log_level.encode(out)
            }
            Self::VoteGovernance {
                numeration,
                vote,
                cnt,
                log_level,
            } => {
                numeration.encode(out)?;
                vote.encode(out)?;
                cnt.encode(out)?;
                log_level.encode(out)
            }
            Self::FinalizeGovernance {
                numeration,
                log_level,
            }
            | Self::ExecuteGovernance {
                numeration,
                log_level,
            } => {
                numeration.encode(out)?;
                log_level.encode(out)
            }
            Self::MintNft { log_level }
            | Self::Redeem { log_level }
            | Self::ProcessRewards { log_level }
            | Self::InitRebalance { log_level }
            | Self::FinalizeRebalance { log_level }
            | Self::ResetUris { log_level }
            | Self::UnDelegateNft { log_level }
            | Self::DelegateNft { log_level }
            | Self::CreateVoteAccount { log_level } => log_level.encode(out),
        }
    }
}

impl Decode for InglInstruction {
    const MIN_LEN: usize = 2;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let opcode = reader.read_discriminant("InglInstruction", OPCODE_COUNT)?;
        Ok(match opcode {
            0 => Self::MintNft {
                log_level: u8::decode(reader)?,
            },
            1 => Self::Init(InitArgs::decode(reader)?),
            2 => Self::Redeem {
                log_level: u8::decode(reader)?,
            },
            3 => Self::NftWithdraw {
                cnt: u32::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
            4 => Self::ProcessRewards {
                log_level: u8::decode(reader)?,
            },
            5 => Self::InitRebalance {
                log_level: u8::decode(reader)?,
            },
            6 => Self::FinalizeRebalance {
                log_level: u8::decode(reader)?,
            },
            7 => Self::UploadUris {
                uris: Vec::decode(reader)?,
                rarity: u8::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
            8 => Self::ResetUris {
                log_level: u8::decode(reader)?,
            },
            9 => Self::UnDelegateNft {
                log_level: u8::decode(reader)?,
            },
            10 => Self::DelegateNft {
                log_level: u8::decode(reader)?,
            },
            11 => Self::CreateVoteAccount {
                log_level: u8::decode(reader)?,
            },
            12 => Self::InitGovernance {
                governance: Governance::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
            13 => Self::VoteGovernance {
                numeration: u32::decode(reader)?,
                vote: bool::decode(reader)?,
                cnt: u8::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
            14 => Self::FinalizeGovernance {
                numeration: u32::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
            _ => Self::ExecuteGovernance {
                numeration: u32::decode(reader)?,
                log_level: u8::decode(reader)?,
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use ingl_codec::{decode, from_bytes};
    use ingl_sol::Address;

    use super::*;
    use crate::governance::{ConfigAccountType, GovernanceType};

    pub(crate) fn sample_init_args() -> InitArgs {
        InitArgs {
            log_level: 2,
            init_commission: 8,
            max_primary_stake: 500 * MIN_STAKE_LAMPORTS,
            nft_holder_share: 70,
            initial_redemption_fee: 10,
            is_validator_id_switchable: true,
            unit_backing: 2 * MIN_STAKE_LAMPORTS,
            redemption_fee_duration: 86_400 * 30,
            program_upgrade_threshold: 70,
            creator_royalties: 200,
            rarities: vec![7000, 9000, 10_000],
            rarity_names: vec!["Common".into(), "Rare".into(), "Mythic".into()],
            twitter_handle: "ingl".into(),
            discord_invite: "ingl-dao".into(),
            validator_name: "Ingl Validator".into(),
            collection_uri: "https://arweave.net/collection".into(),
            website: "https://ingl.io".into(),
        }
    }

    // -- Wire layout --------------------------------------------------------

    #[test]
    fn redeem_encodes_to_two_bytes() {
        let ix = InglInstruction::redeem(2).unwrap();
        let bytes = ix.to_bytes().unwrap();
        assert_eq!(bytes, vec![2, 0x02]);

        let (decoded, consumed) = decode::<InglInstruction>(&bytes).unwrap();
        assert_eq!(decoded, ix);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn vote_governance_layout() {
        let ix = InglInstruction::vote_governance(0x0102_0304, true, 3, 1).unwrap();
        assert_eq!(ix.to_bytes().unwrap(), vec![13, 4, 3, 2, 1, 1, 3, 1]);
    }

    #[test]
    fn init_governance_is_opcode_governance_then_log_level() {
        let governance = Governance::new(
            GovernanceType::ConfigAccount,
            Some(ConfigAccountType::RedemptionFeeDuration(3600)),
            None,
        )
        .unwrap();
        let ix = InglInstruction::init_governance(governance, 4).unwrap();
        let mut expected = vec![12, 0, 3];
        expected.extend_from_slice(&3600u32.to_le_bytes());
        expected.push(4);
        assert_eq!(ix.to_bytes().unwrap(), expected);
    }

    #[test]
    fn upload_uris_layout() {
        let ix = InglInstruction::upload_uris(vec!["u1".into()], 2, 0).unwrap();
        assert_eq!(
            ix.to_bytes().unwrap(),
            vec![7, 1, 0, 0, 0, 2, 0, 0, 0, b'u', b'1', 2, 0]
        );
    }

    #[test]
    fn init_roundtrip() {
        let ix = InglInstruction::init(sample_init_args()).unwrap();
        let bytes = ix.to_bytes().unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(from_bytes::<InglInstruction>(&bytes).unwrap(), ix);
    }

    #[test]
    fn every_opcode_roundtrips() {
        let governance = Governance::ProgramUpgrade {
            buffer_account: Address::new([4u8; 32]),
            code_link: "https://github.com/ingl".into(),
        };
        let all = vec![
            InglInstruction::mint_nft(0).unwrap(),
            InglInstruction::init(sample_init_args()).unwrap(),
            InglInstruction::redeem(1).unwrap(),
            InglInstruction::nft_withdraw(4, 2).unwrap(),
            InglInstruction::process_rewards(3).unwrap(),
            InglInstruction::init_rebalance(4).unwrap(),
            InglInstruction::finalize_rebalance(5).unwrap(),
            InglInstruction::upload_uris(vec!["a".into(), "b".into()], 1, 0).unwrap(),
            InglInstruction::reset_uris(1).unwrap(),
            InglInstruction::undelegate_nft(2).unwrap(),
            InglInstruction::delegate_nft(3).unwrap(),
            InglInstruction::create_vote_account(4).unwrap(),
            InglInstruction::init_governance(governance, 5).unwrap(),
            InglInstruction::vote_governance(7, false, 2, 0).unwrap(),
            InglInstruction::finalize_governance(7, 1).unwrap(),
            InglInstruction::execute_governance(7, 2).unwrap(),
        ];
        for (expected_opcode, ix) in all.into_iter().enumerate() {
            assert_eq!(ix.opcode() as usize, expected_opcode);
            let bytes = ix.to_bytes().unwrap();
            assert_eq!(bytes[0] as usize, expected_opcode);
            let (decoded, consumed) = decode::<InglInstruction>(&bytes).unwrap();
            assert_eq!(decoded, ix);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn unknown_opcode_fails() {
        let err = from_bytes::<InglInstruction>(&[16, 0]).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownVariant {
                type_name: "InglInstruction",
                discriminant: 16
            }
        );
    }

    #[test]
    fn truncated_payload_fails() {
        let err = from_bytes::<InglInstruction>(&[14, 1, 0]).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedInput { .. }));
    }

    #[test]
    fn bad_bool_fails() {
        let err = from_bytes::<InglInstruction>(&[13, 0, 0, 0, 0, 2, 1, 0]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding(_)));
    }

    // -- Argument ranges ----------------------------------------------------

    #[test]
    fn log_level_above_five_is_rejected() {
        assert!(matches!(
            InglInstruction::redeem(6),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(InglInstruction::redeem(5).is_ok());
    }

    #[test]
    fn counts_must_fit_their_width() {
        assert!(matches!(
            InglInstruction::vote_governance(1, true, 256, 0),
            Err(ClientError::InvalidArgument(_))
        ));
        assert!(InglInstruction::vote_governance(1, true, 255, 0).is_ok());
        assert!(matches!(
            InglInstruction::nft_withdraw(0, 0),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_uris_are_rejected() {
        assert!(matches!(
            InglInstruction::upload_uris(vec![], 0, 0),
            Err(ClientError::InvalidArgument(_))
        ));
    }

    #[test]
    fn init_ranges_are_enforced() {
        let cases: [fn(&mut InitArgs); 15] = [
            |a: &mut InitArgs| a.init_commission = 101,
            |a: &mut InitArgs| a.nft_holder_share = 101,
            |a: &mut InitArgs| a.initial_redemption_fee = 26,
            |a: &mut InitArgs| a.is_validator_id_switchable = false,
            |a: &mut InitArgs| a.max_primary_stake = MIN_STAKE_LAMPORTS - 1,
            |a: &mut InitArgs| a.unit_backing = 0,
            |a: &mut InitArgs| a.redemption_fee_duration = MAX_REDEMPTION_FEE_DURATION + 1,
            |a: &mut InitArgs| a.program_upgrade_threshold = 64,
            |a: &mut InitArgs| a.program_upgrade_threshold = 101,
            |a: &mut InitArgs| a.creator_royalties = 501,
            |a: &mut InitArgs| a.rarities = vec![],
            |a: &mut InitArgs| a.rarities = vec![9000, 7000, 10_000],
            |a: &mut InitArgs| a.rarities = vec![7000, 9000, 9999],
            |a: &mut InitArgs| {
                a.rarity_names.pop();
            },
            |a: &mut InitArgs| a.log_level = 6,
        ];
        for (index, mutate) in cases.into_iter().enumerate() {
            let mut args = sample_init_args();
            mutate(&mut args);
            assert!(
                matches!(InglInstruction::init(args), Err(ClientError::InvalidArgument(_))),
                "case {index} was accepted"
            );
        }
    }

    #[test]
    fn fee_without_switchable_id_is_fine_when_zero() {
        let mut args = sample_init_args();
        args.is_validator_id_switchable = false;
        args.initial_redemption_fee = 0;
        assert!(InglInstruction::init(args).is_ok());
    }
}
