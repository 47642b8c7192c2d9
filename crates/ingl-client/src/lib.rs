//! Client for the Ingl validator program.
//!
//! Builds the program's instructions, resolves its derived accounts, signs
//! with local keypairs or a hardware device, and submits through a
//! caller-supplied [`LedgerRpc`].

pub mod assembler;
pub mod blockhash;
pub mod compute_budget;
pub mod config;
pub mod device;
pub mod error;
pub mod governance;
pub mod instruction;
pub mod processor;
pub mod resolver;
pub mod rpc;
pub mod signer;
pub mod state;

#[cfg(test)]
mod testing;

pub use assembler::{Stage, TransactionAssembler};
pub use blockhash::BlockhashCache;
pub use config::{Cluster, ConfigStore, InglConfig, JsonConfigStore, MemoryConfigStore};
pub use device::{CommandTransport, DerivationPath, DeviceError, DeviceTransport};
pub use error::ClientError;
pub use governance::{ConfigAccountType, Governance, GovernanceType, VoteAccountGovernance};
pub use instruction::{InglInstruction, InitArgs};
pub use processor::{ClientContext, GovernanceExecution, NumberedAccount, RegistryAccounts};
pub use resolver::ProgramAccounts;
pub use rpc::{BlockReference, LedgerRpc, RpcError, Submission};
pub use signer::{HardwareSigner, KeypairSigner, SignerKind, SignerSource, TransactionSigner};
