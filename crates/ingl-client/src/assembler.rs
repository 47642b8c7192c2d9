//! Transaction assembly.
//!
//! An assembler moves through
//! `Building -> AwaitingBlockReference -> CollectingSignatures -> ReadyToSubmit -> Submitted`.
//! The message is compiled once the block reference is fixed; from then on
//! the bytes every signer sees are identical. Signature slots follow the
//! message's signer order, whatever order the signers are invoked in.

use std::fmt;

use ingl_sol::{serialize_wire, verify_signature, Address, Instruction, Message, SIGNATURE_LEN};

use crate::blockhash::BlockhashCache;
use crate::error::ClientError;
use crate::rpc::{BlockReference, LedgerRpc, Submission};
use crate::signer::{SignerKind, TransactionSigner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Building,
    AwaitingBlockReference,
    CollectingSignatures,
    ReadyToSubmit,
    Submitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Building => "building",
            Stage::AwaitingBlockReference => "awaiting block reference",
            Stage::CollectingSignatures => "collecting signatures",
            Stage::ReadyToSubmit => "ready to submit",
            Stage::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

/// Compiled message plus its signature slots.
#[derive(Debug)]
struct Sealed {
    reference: BlockReference,
    message: Message,
    message_bytes: Vec<u8>,
    signatures: Vec<Option<[u8; SIGNATURE_LEN]>>,
}

#[derive(Debug)]
pub struct TransactionAssembler {
    fee_payer: Address,
    instructions: Vec<Instruction>,
    stage: Stage,
    sealed: Option<Sealed>,
}

impl TransactionAssembler {
    /// Start a transaction paid for by `fee_payer`, which always takes
    /// signature slot 0.
    pub fn new(fee_payer: Address) -> Self {
        Self {
            fee_payer,
            instructions: Vec::new(),
            stage: Stage::Building,
            sealed: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn fee_payer(&self) -> Address {
        self.fee_payer
    }

    fn expect_stage(&self, allowed: &[Stage], operation: &str) -> Result<(), ClientError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(ClientError::InvalidState(format!(
                "cannot {operation} while {}",
                self.stage
            )))
        }
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> Result<&mut Self, ClientError> {
        self.expect_stage(&[Stage::Building], "add an instruction")?;
        self.instructions.push(instruction);
        Ok(self)
    }

    pub fn add_instructions(
        &mut self,
        instructions: impl IntoIterator<Item = Instruction>,
    ) -> Result<&mut Self, ClientError> {
        self.expect_stage(&[Stage::Building], "add an instruction")?;
        self.instructions.extend(instructions);
        Ok(self)
    }

    /// Fix the block reference and compile the message.
    ///
    /// A failed fetch leaves the assembler in `AwaitingBlockReference`; the
    /// caller may call this again.
    pub async fn fetch_block_reference(
        &mut self,
        cache: &BlockhashCache,
        rpc: &dyn LedgerRpc,
    ) -> Result<BlockReference, ClientError> {
        self.expect_stage(
            &[Stage::Building, Stage::AwaitingBlockReference],
            "fetch a block reference",
        )?;
        if self.instructions.is_empty() {
            return Err(ClientError::InvalidState("transaction has no instructions".into()));
        }
        self.stage = Stage::AwaitingBlockReference;

        let reference = cache.get(rpc).await?;
        self.seal(reference)?;
        Ok(reference)
    }

    /// Fix a block reference obtained elsewhere.
    pub fn set_block_reference(&mut self, reference: BlockReference) -> Result<(), ClientError> {
        self.expect_stage(
            &[Stage::Building, Stage::AwaitingBlockReference],
            "set a block reference",
        )?;
        if self.instructions.is_empty() {
            return Err(ClientError::InvalidState("transaction has no instructions".into()));
        }
        self.seal(reference)
    }

    fn seal(&mut self, reference: BlockReference) -> Result<(), ClientError> {
        let message = Message::compile(&self.instructions, &self.fee_payer, reference.blockhash)?;
        let message_bytes = message.serialize()?;
        let signatures = vec![None; message.signer_keys().len()];
        tracing::debug!(
            signers = signatures.len(),
            accounts = message.account_keys.len(),
            message_len = message_bytes.len(),
            "compiled transaction message"
        );
        self.sealed = Some(Sealed {
            reference,
            message,
            message_bytes,
            signatures,
        });
        self.stage = Stage::CollectingSignatures;
        Ok(())
    }

    fn sealed(&self) -> Result<&Sealed, ClientError> {
        self.sealed
            .as_ref()
            .ok_or_else(|| ClientError::InvalidState("message is not compiled yet".into()))
    }

    /// The required signers in slot order. Empty until the message is compiled.
    pub fn required_signers(&self) -> &[Address] {
        self.sealed
            .as_ref()
            .map(|s| s.message.signer_keys())
            .unwrap_or_default()
    }

    /// The bytes every signer signs.
    pub fn message_bytes(&self) -> Result<&[u8], ClientError> {
        Ok(&self.sealed()?.message_bytes)
    }

    pub fn missing_signers(&self) -> Vec<Address> {
        let Some(sealed) = self.sealed.as_ref() else {
            return Vec::new();
        };
        sealed
            .message
            .signer_keys()
            .iter()
            .zip(&sealed.signatures)
            .filter(|(_, sig)| sig.is_none())
            .map(|(address, _)| *address)
            .collect()
    }

    /// Collected signatures in slot order; `None` marks an empty slot.
    pub fn signatures(&self) -> Vec<Option<[u8; SIGNATURE_LEN]>> {
        self.sealed
            .as_ref()
            .map(|s| s.signatures.clone())
            .unwrap_or_default()
    }

    fn slot_of(&self, address: &Address) -> Result<usize, ClientError> {
        self.required_signers()
            .iter()
            .position(|k| k == address)
            .ok_or(ClientError::UnknownSigner(*address))
    }

    /// Place a signature produced elsewhere into `signer`'s slot.
    pub fn add_signature(
        &mut self,
        signer: &Address,
        signature: [u8; SIGNATURE_LEN],
    ) -> Result<(), ClientError> {
        self.expect_stage(
            &[Stage::CollectingSignatures, Stage::ReadyToSubmit],
            "add a signature",
        )?;
        let slot = self.slot_of(signer)?;
        self.store_signature(slot, signer, signature)
    }

    fn store_signature(
        &mut self,
        slot: usize,
        signer: &Address,
        signature: [u8; SIGNATURE_LEN],
    ) -> Result<(), ClientError> {
        let sealed = self
            .sealed
            .as_mut()
            .ok_or_else(|| ClientError::InvalidState("message is not compiled yet".into()))?;
        if !verify_signature(signer, &sealed.message_bytes, &signature) {
            return Err(ClientError::SignerRejected(format!(
                "signature from {signer} does not verify against the message"
            )));
        }
        sealed.signatures[slot] = Some(signature);
        if sealed.signatures.iter().all(Option::is_some) {
            self.stage = Stage::ReadyToSubmit;
        }
        Ok(())
    }

    /// Collect signatures from `signers`.
    ///
    /// Every signer must be a required signer of the message. In-memory
    /// signers run first and hardware signers last; within each group they
    /// run in slot order. A signer failure stops collection and is returned
    /// as is; signatures gathered before it are kept, and the assembler stays
    /// in `CollectingSignatures` so the call can be retried. The same holds
    /// when the returned future is dropped mid-way.
    pub async fn sign(&mut self, signers: &[&dyn TransactionSigner]) -> Result<(), ClientError> {
        self.expect_stage(
            &[Stage::CollectingSignatures, Stage::ReadyToSubmit],
            "sign",
        )?;

        let mut plan = Vec::with_capacity(signers.len());
        for signer in signers {
            let address = signer.public_address();
            let slot = self.slot_of(&address)?;
            plan.push((signer.kind() == SignerKind::Hardware, slot, *signer));
        }
        plan.sort_by_key(|(hardware, slot, _)| (*hardware, *slot));

        for (_, slot, signer) in plan {
            let address = signer.public_address();
            let message = self.message_bytes()?.to_vec();
            let signature = signer.sign(&message).await?;
            self.store_signature(slot, &address, signature)?;
            tracing::debug!(
                signer = %address,
                slot,
                kind = ?signer.kind(),
                "collected signature"
            );
        }
        Ok(())
    }

    /// The signed wire transaction. Fails unless every slot is filled.
    pub fn serialize(&self) -> Result<Vec<u8>, ClientError> {
        let sealed = self.sealed()?;
        let required = sealed.signatures.len();
        let filled: Vec<[u8; SIGNATURE_LEN]> = sealed.signatures.iter().flatten().copied().collect();
        if filled.len() != required {
            return Err(ClientError::IncompleteSignatures {
                missing: required - filled.len(),
                required,
            });
        }
        Ok(serialize_wire(&filled, &sealed.message_bytes)?)
    }

    /// Hand the signed transaction to the node.
    ///
    /// Whatever the node answers, including an error, is returned unchanged
    /// and the assembler becomes `Submitted`.
    pub async fn submit(&mut self, rpc: &dyn LedgerRpc) -> Result<Submission, ClientError> {
        self.expect_stage(
            &[Stage::CollectingSignatures, Stage::ReadyToSubmit],
            "submit",
        )?;
        let wire = self.serialize()?;
        let last_valid_block_height = self.sealed()?.reference.last_valid_block_height;
        self.stage = Stage::Submitted;
        self.sealed = None;

        tracing::info!(
            fee_payer = %self.fee_payer,
            wire_len = wire.len(),
            last_valid_block_height,
            "submitting transaction"
        );
        let submission = rpc.submit(wire, last_valid_block_height).await?;
        tracing::info!(signature = %submission.signature, "transaction accepted");
        Ok(submission)
    }
}
