//! One entry point per program instruction.
//!
//! Each entry point takes already-typed arguments, lists the accounts in the
//! order the program reads them, then assembles, signs and submits the
//! transaction. The first signer passed to [`ClientContext::send`] pays the
//! fee. Whatever the node answers is returned unchanged.

use std::sync::Arc;

use ingl_codec::Encode;
use ingl_sol::programs::{
    ASSOCIATED_TOKEN_PROGRAM_ID, BPF_UPGRADEABLE_LOADER_ID, STAKE_CONFIG_ID, STAKE_PROGRAM_ID,
    SYSTEM_PROGRAM_ID, SYSVAR_CLOCK_ID, SYSVAR_RENT_ID, SYSVAR_STAKE_HISTORY_ID,
    TOKEN_METADATA_PROGRAM_ID, TOKEN_PROGRAM_ID, VOTE_PROGRAM_ID,
};
use ingl_sol::{find_program_address, AccountMeta, Address, Instruction};

use crate::assembler::TransactionAssembler;
use crate::blockhash::BlockhashCache;
use crate::compute_budget;
use crate::config::{ConfigStore, InglConfig, TEAM_ACCOUNT};
use crate::device::DeviceTransport;
use crate::error::ClientError;
use crate::governance::Governance;
use crate::instruction::{InglInstruction, InitArgs};
use crate::resolver::{self, ProgramAccounts};
use crate::rpc::{LedgerRpc, Submission};
use crate::signer::{parse_pubkey_input, SignerSource, TransactionSigner};
use crate::state::{decode_account, read_address_at, GlobalGems, GEM_FUNDS_LOCATION_OFFSET};

fn writable(address: Address) -> AccountMeta {
    AccountMeta::writable(address, false)
}

fn readonly(address: Address) -> AccountMeta {
    AccountMeta::readonly(address, false)
}

fn signer(address: Address) -> AccountMeta {
    AccountMeta::writable(address, true)
}

/// A numbered program account named either by its numeration or by its
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberedAccount {
    Numeration(u32),
    Address(Address),
}

/// External accounts the validator registry needs during `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryAccounts {
    pub program: Address,
    pub config: Address,
    pub storage: Address,
}

/// What a passed proposal changes, and so which accounts executing it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceExecution {
    ConfigAccount,
    ProgramUpgrade {
        program: Address,
        buffer: Address,
        /// Receives the buffer's lamports.
        spill: Address,
    },
    VoteAccount {
        vote_account: Address,
        /// Set when the proposal replaces the validator identity.
        new_validator_id: Option<Address>,
    },
}

/// Everything an entry point needs besides its own arguments.
pub struct ClientContext {
    rpc: Arc<dyn LedgerRpc>,
    cache: Arc<BlockhashCache>,
    accounts: ProgramAccounts,
    device: Option<Arc<dyn DeviceTransport>>,
    heap_frame: Option<u32>,
    compute_unit_limit: Option<u32>,
    compute_unit_price: Option<u64>,
}

impl ClientContext {
    pub fn new(rpc: Arc<dyn LedgerRpc>, program_id: Address) -> Self {
        Self {
            rpc,
            cache: Arc::new(BlockhashCache::new()),
            accounts: ProgramAccounts::new(program_id),
            device: None,
            heap_frame: None,
            compute_unit_limit: None,
            compute_unit_price: None,
        }
    }

    pub fn from_config<S: ConfigStore>(rpc: Arc<dyn LedgerRpc>, config: &InglConfig<S>) -> Self {
        Self::new(rpc, config.program_id())
    }

    /// Share a block reference cache with other contexts.
    pub fn with_cache(mut self, cache: Arc<BlockhashCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_device(mut self, transport: Arc<dyn DeviceTransport>) -> Self {
        self.device = Some(transport);
        self
    }

    pub fn with_heap_frame(mut self, total_bytes: u32) -> Self {
        self.heap_frame = Some(total_bytes);
        self
    }

    pub fn with_compute_unit_limit(mut self, units: u32) -> Self {
        self.compute_unit_limit = Some(units);
        self
    }

    pub fn with_compute_unit_price(mut self, micro_lamports: u64) -> Self {
        self.compute_unit_price = Some(micro_lamports);
        self
    }

    pub fn accounts(&self) -> &ProgramAccounts {
        &self.accounts
    }

    pub fn cache(&self) -> &BlockhashCache {
        &self.cache
    }

    // -- inputs ----------------------------------------------------------

    /// Load the signer a human-supplied reference names.
    pub async fn signer(&self, reference: &str) -> Result<Arc<dyn TransactionSigner>, ClientError> {
        let source: SignerSource = reference.parse()?;
        source.resolve(self.device.as_ref()).await
    }

    pub async fn pubkey(&self, input: &str) -> Result<Address, ClientError> {
        parse_pubkey_input(input, self.device.as_ref()).await
    }

    async fn account_bytes(&self, address: &Address, what: &str) -> Result<Vec<u8>, ClientError> {
        self.rpc
            .fetch_account_bytes(address)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("{what} account {address}")))
    }

    /// The program's global counters.
    pub async fn global_gems(&self) -> Result<GlobalGems, ClientError> {
        let general = self.accounts.general()?;
        decode_account(&self.account_bytes(&general, "general").await?)
    }

    /// The vote account a gem's funds are delegated to.
    pub async fn gem_funds_location(&self, mint: &Address) -> Result<Address, ClientError> {
        let gem = self.accounts.gem(mint)?;
        let data = self.account_bytes(&gem, "gem").await?;
        read_address_at(&data, GEM_FUNDS_LOCATION_OFFSET)
    }

    /// Resolve a vote account, searching from the on-chain vote account
    /// counter when only its address is known.
    pub async fn resolve_vote_account(
        &self,
        account: NumberedAccount,
    ) -> Result<(Address, u32), ClientError> {
        match account {
            NumberedAccount::Numeration(n) => self.accounts.resolve_vote_account(None, Some(n), 0),
            NumberedAccount::Address(address) => {
                let hint = self.global_gems().await?.counter;
                self.accounts.resolve_vote_account(Some(&address), None, hint)
            }
        }
    }

    /// Resolve a governance proposal, searching from the on-chain proposal
    /// counter when only its address is known.
    pub async fn resolve_proposal(
        &self,
        account: NumberedAccount,
    ) -> Result<(Address, u32), ClientError> {
        match account {
            NumberedAccount::Numeration(n) => self.accounts.resolve_proposal(None, Some(n), 0),
            NumberedAccount::Address(address) => {
                let hint = self.global_gems().await?.proposal_numeration;
                self.accounts.resolve_proposal(Some(&address), None, hint)
            }
        }
    }

    // -- plumbing --------------------------------------------------------

    fn program_instruction(
        &self,
        instruction: &InglInstruction,
        accounts: Vec<AccountMeta>,
    ) -> Result<Instruction, ClientError> {
        Ok(Instruction {
            program_id: self.accounts.program_id(),
            accounts,
            data: instruction.to_bytes()?,
        })
    }

    /// Assemble, sign and submit `instructions`. `signers[0]` pays the fee.
    pub async fn send(
        &self,
        instructions: Vec<Instruction>,
        signers: &[&dyn TransactionSigner],
    ) -> Result<Submission, ClientError> {
        let fee_payer = signers
            .first()
            .ok_or_else(|| ClientError::InvalidArgument("a fee payer is required".into()))?;

        let mut assembler = TransactionAssembler::new(fee_payer.public_address());
        if let Some(bytes) = self.heap_frame {
            assembler.add_instruction(compute_budget::request_heap_frame(bytes))?;
        }
        if let Some(units) = self.compute_unit_limit {
            assembler.add_instruction(compute_budget::set_compute_unit_limit(units))?;
        }
        if let Some(price) = self.compute_unit_price {
            assembler.add_instruction(compute_budget::set_compute_unit_price(price))?;
        }
        assembler.add_instructions(instructions)?;

        assembler
            .fetch_block_reference(&self.cache, self.rpc.as_ref())
            .await?;
        assembler.sign(signers).await?;

        let result = assembler.submit(self.rpc.as_ref()).await;
        if let Err(ClientError::Rpc(err)) = &result {
            tracing::debug!(error = %err, "submission failed; dropping cached block reference");
            self.cache.invalidate().await;
        }
        result
    }

    async fn send_one(
        &self,
        instruction: &InglInstruction,
        accounts: Vec<AccountMeta>,
        signers: &[&dyn TransactionSigner],
    ) -> Result<Submission, ClientError> {
        tracing::debug!(
            opcode = instruction.opcode(),
            accounts = accounts.len(),
            "building program instruction"
        );
        let ix = self.program_instruction(instruction, accounts)?;
        self.send(vec![ix], signers).await
    }

    fn gem_triple(&self, owner: &Address, mint: &Address) -> Result<[AccountMeta; 3], ClientError> {
        Ok([
            writable(self.accounts.gem(mint)?),
            writable(*mint),
            writable(resolver::associated_token(owner, mint)?),
        ])
    }

    // -- gems ------------------------------------------------------------

    /// Mint a new gem into a fresh `mint` account.
    pub async fn mint_nft(
        &self,
        payer: &dyn TransactionSigner,
        mint: &dyn TransactionSigner,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::mint_nft(log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();
        let mint_key = mint.public_address();
        let collection_mint = acc.collection_mint()?;

        let accounts = vec![
            signer(payer_key),
            signer(mint_key),
            writable(acc.mint_authority()?),
            writable(resolver::associated_token(&payer_key, &mint_key)?),
            readonly(TOKEN_PROGRAM_ID),
            readonly(SYSVAR_RENT_ID),
            readonly(SYSTEM_PROGRAM_ID),
            writable(resolver::metadata(&mint_key)?),
            writable(acc.pd_pool()?),
            writable(acc.gem(&mint_key)?),
            writable(resolver::edition(&collection_mint)?),
            writable(resolver::edition(&mint_key)?),
            writable(collection_mint),
            writable(resolver::metadata(&collection_mint)?),
            readonly(acc.config()?),
            readonly(acc.uris()?),
            writable(acc.general()?),
            readonly(ASSOCIATED_TOKEN_PROGRAM_ID),
            readonly(TOKEN_METADATA_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer, mint]).await
    }

    /// Burn the gem minted at `mint` and return its backing to the payer.
    pub async fn redeem_nft(
        &self,
        payer: &dyn TransactionSigner,
        mint: &Address,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::redeem(log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();
        let vote_account = self.gem_funds_location(mint).await?;
        let collection_mint = acc.collection_mint()?;

        let accounts = vec![
            signer(payer_key),
            writable(*mint),
            writable(acc.pd_pool()?),
            writable(resolver::associated_token(&payer_key, mint)?),
            writable(acc.gem(mint)?),
            writable(resolver::metadata(mint)?),
            writable(resolver::edition(mint)?),
            writable(resolver::metadata(&collection_mint)?),
            readonly(TOKEN_PROGRAM_ID),
            readonly(acc.config()?),
            writable(acc.general()?),
            writable(vote_account),
            readonly(TOKEN_METADATA_PROGRAM_ID),
            readonly(SYSTEM_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn delegate_nft(
        &self,
        payer: &dyn TransactionSigner,
        mint: &Address,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::delegate_nft(log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();

        let accounts = vec![
            signer(payer_key),
            readonly(acc.config()?),
            readonly(*mint),
            writable(acc.gem(mint)?),
            readonly(resolver::associated_token(&payer_key, mint)?),
            writable(acc.general()?),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    /// Undelegate a gem from the vote account recorded in its gem account.
    pub async fn undelegate_nft(
        &self,
        payer: &dyn TransactionSigner,
        mint: &Address,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::undelegate_nft(log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();
        let vote_account = self.gem_funds_location(mint).await?;

        let accounts = vec![
            signer(payer_key),
            writable(vote_account),
            readonly(acc.config()?),
            readonly(*mint),
            writable(acc.gem(mint)?),
            readonly(resolver::associated_token(&payer_key, mint)?),
            writable(acc.general()?),
            readonly(SYSTEM_PROGRAM_ID),
            writable(acc.authorized_withdrawer()?),
            readonly(VOTE_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    // -- rewards ---------------------------------------------------------

    /// Withdraw accrued rewards for the payer's gems in `mints`.
    pub async fn nft_withdraw(
        &self,
        payer: &dyn TransactionSigner,
        vote_account: NumberedAccount,
        mints: &[Address],
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::nft_withdraw(mints.len(), log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();
        let (vote_key, _) = self.resolve_vote_account(vote_account).await?;

        let mut accounts = vec![
            signer(payer_key),
            writable(vote_key),
            writable(acc.general()?),
            writable(acc.authorized_withdrawer()?),
        ];
        for mint in mints {
            let [gem, mint, ata] = self.gem_triple(&payer_key, mint)?;
            accounts.extend([ata, mint, gem]);
        }
        accounts.push(readonly(SYSTEM_PROGRAM_ID));
        accounts.push(readonly(VOTE_PROGRAM_ID));
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn process_rewards(
        &self,
        payer: &dyn TransactionSigner,
        validator_id: &Address,
        vote_account: NumberedAccount,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::process_rewards(log_level)?;
        let acc = &self.accounts;
        let (vote_key, _) = self.resolve_vote_account(vote_account).await?;

        let accounts = vec![
            signer(payer.public_address()),
            writable(*validator_id),
            writable(vote_key),
            writable(acc.authorized_withdrawer()?),
            readonly(acc.config()?),
            writable(acc.general()?),
            writable(TEAM_ACCOUNT),
            readonly(SYSTEM_PROGRAM_ID),
            readonly(VOTE_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn init_rebalance(
        &self,
        payer: &dyn TransactionSigner,
        vote_account: NumberedAccount,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::init_rebalance(log_level)?;
        let acc = &self.accounts;
        let (vote_key, _) = self.resolve_vote_account(vote_account).await?;

        let accounts = vec![
            signer(payer.public_address()),
            writable(acc.t_stake()?),
            writable(acc.pd_pool()?),
            writable(acc.general()?),
            readonly(SYSVAR_CLOCK_ID),
            readonly(SYSVAR_RENT_ID),
            writable(acc.stake()?),
            readonly(acc.t_withdraw()?),
            readonly(vote_key),
            readonly(SYSVAR_STAKE_HISTORY_ID),
            readonly(STAKE_CONFIG_ID),
            readonly(STAKE_PROGRAM_ID),
            readonly(SYSTEM_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn finalize_rebalance(
        &self,
        payer: &dyn TransactionSigner,
        validator_id: &Address,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::finalize_rebalance(log_level)?;
        let acc = &self.accounts;

        let accounts = vec![
            signer(payer.public_address()),
            writable(*validator_id),
            writable(acc.t_stake()?),
            writable(acc.pd_pool()?),
            writable(acc.general()?),
            readonly(SYSVAR_CLOCK_ID),
            writable(acc.stake()?),
            readonly(acc.t_withdraw()?),
            readonly(SYSVAR_STAKE_HISTORY_ID),
            readonly(acc.config()?),
            readonly(STAKE_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    // -- validator setup -------------------------------------------------

    /// One-time setup of a validator's program accounts and gem collection.
    pub async fn init(
        &self,
        payer: &dyn TransactionSigner,
        validator_id: &Address,
        args: InitArgs,
        registry: &RegistryAccounts,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::init(args)?;
        let acc = &self.accounts;
        let collection_holder = acc.collection_holder()?;
        let collection_mint = acc.collection_mint()?;

        let accounts = vec![
            signer(payer.public_address()),
            writable(acc.config()?),
            writable(acc.general()?),
            writable(acc.uris()?),
            readonly(SYSVAR_RENT_ID),
            readonly(*validator_id),
            writable(collection_holder),
            writable(collection_mint),
            readonly(acc.mint_authority()?),
            writable(resolver::associated_token(&collection_holder, &collection_mint)?),
            writable(resolver::metadata(&collection_mint)?),
            writable(resolver::edition(&collection_mint)?),
            readonly(TOKEN_PROGRAM_ID),
            readonly(SYSTEM_PROGRAM_ID),
            writable(registry.config),
            readonly(acc.program_id()),
            writable(TEAM_ACCOUNT),
            writable(registry.storage),
            readonly(registry.program),
            readonly(ASSOCIATED_TOKEN_PROGRAM_ID),
            readonly(TOKEN_METADATA_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn upload_uris(
        &self,
        payer: &dyn TransactionSigner,
        uris: Vec<String>,
        rarity: u8,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::upload_uris(uris, rarity, log_level)?;
        let accounts = vec![
            signer(payer.public_address()),
            readonly(self.accounts.config()?),
            writable(self.accounts.uris()?),
            readonly(SYSTEM_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn reset_uris(
        &self,
        payer: &dyn TransactionSigner,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::reset_uris(log_level)?;
        let accounts = vec![
            signer(payer.public_address()),
            readonly(self.accounts.config()?),
            writable(self.accounts.uris()?),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    /// Create the next numbered vote account for `validator`.
    pub async fn create_vote_account(
        &self,
        validator: &dyn TransactionSigner,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let instruction = InglInstruction::create_vote_account(log_level)?;
        let acc = &self.accounts;
        let numeration = self.global_gems().await?.counter;
        let vote_account = acc.vote_account(numeration)?;
        tracing::debug!(numeration, %vote_account, "creating vote account");

        let accounts = vec![
            signer(validator.public_address()),
            writable(vote_account),
            readonly(SYSVAR_RENT_ID),
            readonly(SYSVAR_CLOCK_ID),
            readonly(TOKEN_PROGRAM_ID),
            writable(acc.stake()?),
            writable(acc.config()?),
            writable(acc.general()?),
            readonly(VOTE_PROGRAM_ID),
            readonly(STAKE_PROGRAM_ID),
            readonly(SYSTEM_PROGRAM_ID),
        ];
        self.send_one(&instruction, accounts, &[validator]).await
    }

    // -- governance ------------------------------------------------------

    /// Open a proposal, backed by the payer's gem at `mint`.
    pub async fn init_governance(
        &self,
        payer: &dyn TransactionSigner,
        mint: &Address,
        governance: Governance,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let buffer = match &governance {
            Governance::ProgramUpgrade { buffer_account, .. } => Some(*buffer_account),
            _ => None,
        };
        let instruction = InglInstruction::init_governance(governance, log_level)?;
        let acc = &self.accounts;
        let payer_key = payer.public_address();
        let vote_account = self.gem_funds_location(mint).await?;
        let numeration = self.global_gems().await?.proposal_numeration;
        let proposal = acc.proposal(numeration)?;
        tracing::debug!(numeration, %proposal, "opening proposal");

        let mut accounts = vec![
            signer(payer_key),
            readonly(vote_account),
            writable(proposal),
            writable(acc.general()?),
            readonly(*mint),
            readonly(resolver::associated_token(&payer_key, mint)?),
            writable(acc.gem(mint)?),
            readonly(acc.config()?),
        ];
        if let Some(buffer) = buffer {
            accounts.push(readonly(buffer));
        }
        accounts.push(readonly(SYSTEM_PROGRAM_ID));
        self.send_one(&instruction, accounts, &[payer]).await
    }

    /// Vote on a proposal with each of the payer's gems in `mints`.
    pub async fn vote_governance(
        &self,
        payer: &dyn TransactionSigner,
        proposal: NumberedAccount,
        vote: bool,
        mints: &[Address],
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let (proposal_key, numeration) = self.resolve_proposal(proposal).await?;
        let instruction = InglInstruction::vote_governance(numeration, vote, mints.len(), log_level)?;
        let payer_key = payer.public_address();

        let mut accounts = vec![signer(payer_key), writable(proposal_key)];
        for mint in mints {
            accounts.extend(self.gem_triple(&payer_key, mint)?);
        }
        accounts.push(readonly(SYSTEM_PROGRAM_ID));
        self.send_one(&instruction, accounts, &[payer]).await
    }

    pub async fn finalize_governance(
        &self,
        payer: &dyn TransactionSigner,
        proposal: NumberedAccount,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let (proposal_key, numeration) = self.resolve_proposal(proposal).await?;
        let instruction = InglInstruction::finalize_governance(numeration, log_level)?;
        let acc = &self.accounts;

        let accounts = vec![
            signer(payer.public_address()),
            readonly(SYSVAR_RENT_ID),
            readonly(SYSVAR_CLOCK_ID),
            writable(proposal_key),
            writable(acc.config()?),
            writable(acc.general()?),
        ];
        self.send_one(&instruction, accounts, &[payer]).await
    }

    /// Carry out a passed proposal.
    pub async fn execute_governance(
        &self,
        payer: &dyn TransactionSigner,
        proposal: NumberedAccount,
        execution: GovernanceExecution,
        log_level: u8,
    ) -> Result<Submission, ClientError> {
        let (proposal_key, numeration) = self.resolve_proposal(proposal).await?;
        let instruction = InglInstruction::execute_governance(numeration, log_level)?;
        let acc = &self.accounts;

        let mut accounts = vec![
            signer(payer.public_address()),
            readonly(SYSVAR_CLOCK_ID),
            writable(proposal_key),
            writable(acc.config()?),
            writable(acc.general()?),
        ];
        match execution {
            GovernanceExecution::ConfigAccount => {}
            GovernanceExecution::ProgramUpgrade {
                program,
                buffer,
                spill,
            } => {
                let (program_data, _) =
                    find_program_address(&[program.as_bytes()], &BPF_UPGRADEABLE_LOADER_ID)?;
                accounts.extend([
                    writable(program),
                    writable(buffer),
                    writable(spill),
                    writable(program_data),
                    readonly(resolver::upgrade_authority(&program)?),
                    readonly(SYSVAR_RENT_ID),
                    readonly(SYSVAR_CLOCK_ID),
                    readonly(BPF_UPGRADEABLE_LOADER_ID),
                ]);
            }
            GovernanceExecution::VoteAccount {
                vote_account,
                new_validator_id,
            } => {
                accounts.push(readonly(acc.authorized_withdrawer()?));
                accounts.push(writable(vote_account));
                if let Some(validator_id) = new_validator_id {
                    accounts.push(readonly(SYSVAR_CLOCK_ID));
                    accounts.push(readonly(validator_id));
                }
                accounts.push(readonly(VOTE_PROGRAM_ID));
            }
        }
        self.send_one(&instruction, accounts, &[payer]).await
    }
}

#[cfg(test)]
mod tests {
    use ingl_sol::split_wire;

    use super::*;
    use crate::governance::{ConfigAccountType, GovernanceType};
    use crate::instruction::tests::sample_init_args;
    use crate::signer::KeypairSigner;
    use crate::state::GlobalGems;
    use crate::testing::MockRpc;

    const PROGRAM: Address = Address::new([77u8; 32]);

    fn gems(counter: u32, proposal_numeration: u32) -> Vec<u8> {
        GlobalGems {
            validation_phrase: 1,
            counter,
            total_raised: 0,
            pd_pool_total: 0,
            delegated_total: 0,
            dealloced_total: 0,
            is_proposal_ongoing: false,
            proposal_numeration,
            pending_delegation_total: 0,
            upgrade_proposal_numeration: 0,
            validator_list: Vec::new(),
        }
        .to_bytes()
        .unwrap()
    }

    fn gem_data(vote_account: Address) -> Vec<u8> {
        let mut data = vec![0u8; 96];
        data[GEM_FUNDS_LOCATION_OFFSET..GEM_FUNDS_LOCATION_OFFSET + 32]
            .copy_from_slice(vote_account.as_bytes());
        data
    }

    fn context(rpc: MockRpc) -> (Arc<MockRpc>, ClientContext) {
        let rpc = Arc::new(rpc);
        let ctx = ClientContext::new(rpc.clone(), PROGRAM);
        (rpc, ctx)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn only_submission(rpc: &MockRpc) -> Vec<u8> {
        let submissions = rpc.submissions();
        assert_eq!(submissions.len(), 1);
        submissions[0].0.clone()
    }

    // -- gems ------------------------------------------------------------

    #[tokio::test]
    async fn redeem_uses_vote_account_from_gem_data() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let mint = Address::new([5u8; 32]);
        let vote = Address::new([66u8; 32]);
        let (rpc, ctx) = context(
            MockRpc::default().with_account(accounts.gem(&mint).unwrap(), gem_data(vote)),
        );
        let payer = KeypairSigner::from_secret(&[1u8; 32]);

        ctx.redeem_nft(&payer, &mint, 2).await.unwrap();

        let wire = only_submission(&rpc);
        let (sigs, message) = split_wire(&wire).unwrap();
        assert_eq!(sigs.len(), 1);
        assert!(message.ends_with(&[2, 2]));
        assert!(contains(message, vote.as_bytes()));
        assert!(contains(message, accounts.gem(&mint).unwrap().as_bytes()));
    }

    #[tokio::test]
    async fn redeem_without_gem_account_is_not_found() {
        let (rpc, ctx) = context(MockRpc::default());
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let err = ctx
            .redeem_nft(&payer, &Address::new([5u8; 32]), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert!(rpc.submissions().is_empty());
    }

    #[tokio::test]
    async fn mint_needs_both_signatures() {
        let (rpc, ctx) = context(MockRpc::default());
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let mint = KeypairSigner::from_secret(&[2u8; 32]);

        ctx.mint_nft(&payer, &mint, 0).await.unwrap();

        let wire = only_submission(&rpc);
        let (sigs, message) = split_wire(&wire).unwrap();
        assert_eq!(sigs.len(), 2);
        assert_eq!(&message[4..36], payer.public_address().as_bytes());
        assert!(message.ends_with(&[0, 0]));
    }

    #[tokio::test]
    async fn bad_log_level_fails_before_any_network_call() {
        let (rpc, ctx) = context(MockRpc::default());
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let err = ctx.delegate_nft(&payer, &Address::new([5u8; 32]), 9).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        assert_eq!(rpc.fetch_count(), 0);
    }

    // -- rewards ---------------------------------------------------------

    #[tokio::test]
    async fn withdraw_resolves_vote_account_by_address() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let vote = accounts.vote_account(2).unwrap();
        let (rpc, ctx) = context(
            MockRpc::default().with_account(accounts.general().unwrap(), gems(4, 0)),
        );
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let mints = [Address::new([8u8; 32]), Address::new([9u8; 32])];

        ctx.nft_withdraw(&payer, NumberedAccount::Address(vote), &mints, 1)
            .await
            .unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(message.ends_with(&[3, 2, 0, 0, 0, 1]));
        assert!(contains(message, vote.as_bytes()));
    }

    #[tokio::test]
    async fn unknown_vote_account_is_not_found() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let (_, ctx) = context(
            MockRpc::default().with_account(accounts.general().unwrap(), gems(4, 0)),
        );
        let err = ctx
            .resolve_vote_account(NumberedAccount::Address(Address::new([1u8; 32])))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    // -- validator setup -------------------------------------------------

    #[tokio::test]
    async fn create_vote_account_uses_next_numeration() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let (rpc, ctx) = context(
            MockRpc::default().with_account(accounts.general().unwrap(), gems(3, 0)),
        );
        let validator = KeypairSigner::from_secret(&[4u8; 32]);

        ctx.create_vote_account(&validator, 0).await.unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(contains(message, accounts.vote_account(3).unwrap().as_bytes()));
        assert!(message.ends_with(&[11, 0]));
    }

    #[tokio::test]
    async fn init_sends_validated_args() {
        let (rpc, ctx) = context(MockRpc::default());
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let registry = RegistryAccounts {
            program: Address::new([10u8; 32]),
            config: Address::new([11u8; 32]),
            storage: Address::new([12u8; 32]),
        };
        let args = sample_init_args();
        let expected = InglInstruction::Init(args.clone()).to_bytes().unwrap();

        ctx.init(&payer, &Address::new([13u8; 32]), args, &registry)
            .await
            .unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(message.ends_with(&expected));
        assert!(contains(message, TEAM_ACCOUNT.as_bytes()));
    }

    #[tokio::test]
    async fn compute_budget_instructions_come_first() {
        let rpc = Arc::new(MockRpc::default());
        let ctx = ClientContext::new(rpc.clone(), PROGRAM)
            .with_compute_unit_limit(400_000)
            .with_compute_unit_price(5);
        let payer = KeypairSigner::from_secret(&[1u8; 32]);

        ctx.reset_uris(&payer, 0).await.unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(contains(message, &[2, 0x80, 0x1a, 0x06, 0x00]));
        assert!(message.ends_with(&[8, 0]));
    }

    // -- governance ------------------------------------------------------

    #[tokio::test]
    async fn vote_resolves_proposal_numeration() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let proposal = accounts.proposal(1).unwrap();
        let (rpc, ctx) = context(
            MockRpc::default().with_account(accounts.general().unwrap(), gems(0, 2)),
        );
        let payer = KeypairSigner::from_secret(&[1u8; 32]);

        ctx.vote_governance(
            &payer,
            NumberedAccount::Address(proposal),
            true,
            &[Address::new([8u8; 32])],
            0,
        )
        .await
        .unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(message.ends_with(&[13, 1, 0, 0, 0, 1, 1, 0]));
    }

    #[tokio::test]
    async fn init_governance_targets_next_proposal() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let mint = Address::new([5u8; 32]);
        let vote = Address::new([66u8; 32]);
        let (rpc, ctx) = context(
            MockRpc::default()
                .with_account(accounts.gem(&mint).unwrap(), gem_data(vote))
                .with_account(accounts.general().unwrap(), gems(1, 7)),
        );
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let governance = Governance::new(
            GovernanceType::ConfigAccount,
            Some(ConfigAccountType::NftHolderShare(70)),
            None,
        )
        .unwrap();

        ctx.init_governance(&payer, &mint, governance, 0)
            .await
            .unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(contains(message, accounts.proposal(7).unwrap().as_bytes()));
        assert!(message.ends_with(&[12, 0, 1, 70, 0]));
    }

    #[tokio::test]
    async fn execute_upgrade_lists_upgrade_accounts() {
        let accounts = ProgramAccounts::new(PROGRAM);
        let (rpc, ctx) = context(MockRpc::default());
        let payer = KeypairSigner::from_secret(&[1u8; 32]);
        let program = Address::new([20u8; 32]);

        ctx.execute_governance(
            &payer,
            NumberedAccount::Numeration(4),
            GovernanceExecution::ProgramUpgrade {
                program,
                buffer: Address::new([21u8; 32]),
                spill: payer.public_address(),
            },
            0,
        )
        .await
        .unwrap();

        let wire = only_submission(&rpc);
        let (_, message) = split_wire(&wire).unwrap();
        assert!(contains(message, accounts.proposal(4).unwrap().as_bytes()));
        assert!(contains(
            message,
            resolver::upgrade_authority(&program).unwrap().as_bytes()
        ));
        assert!(message.ends_with(&[15, 4, 0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn node_rejection_drops_cached_reference() {
        let rpc = MockRpc::default();
        *rpc.submit_error.lock().unwrap() = Some(crate::rpc::RpcError::Server {
            code: -32002,
            message: "Blockhash not found".into(),
        });
        let (_, ctx) = context(rpc);
        let payer = KeypairSigner::from_secret(&[1u8; 32]);

        let err = ctx.reset_uris(&payer, 0).await.unwrap_err();
        assert!(matches!(err, ClientError::Rpc(_)));
        assert_eq!(ctx.cache().peek().await, None);
    }
}
