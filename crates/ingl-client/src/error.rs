use ingl_codec::CodecError;
use ingl_sol::{Address, SolError};
use thiserror::Error;

use crate::rpc::RpcError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid signer input: {0}")]
    InvalidSignerInput(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("signer rejected: {0}")]
    SignerRejected(String),

    #[error("incomplete signatures: {missing} of {required} required signatures missing")]
    IncompleteSignatures { missing: usize, required: usize },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0} is not a required signer of this transaction")]
    UnknownSigner(Address),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("account data error: {0}")]
    AccountData(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("ledger error: {0}")]
    Sol(#[from] SolError),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}
