//! The network collaborator.
//!
//! The client never talks HTTP itself; whoever embeds it supplies a
//! [`LedgerRpc`] that reaches a node.

use async_trait::async_trait;
use ingl_sol::Address;
use thiserror::Error;

/// A recent blockhash together with the last block height at which a
/// transaction referencing it is still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub blockhash: [u8; 32],
    pub last_valid_block_height: u64,
}

/// What the node returned for an accepted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Transaction signature as reported by the node.
    pub signature: String,
}

/// Failures reported by the network collaborator. The client passes these
/// through without interpreting them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("rpc server error {code}: {message}")]
    Server { code: i64, message: String },
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn fetch_block_reference(&self) -> Result<BlockReference, RpcError>;

    /// Send a signed wire transaction. `last_valid_block_height` lets the
    /// node drop it once the block reference expires.
    async fn submit(
        &self,
        wire: Vec<u8>,
        last_valid_block_height: u64,
    ) -> Result<Submission, RpcError>;

    /// Raw account data, or `None` when no account lives at `address`.
    async fn fetch_account_bytes(&self, address: &Address) -> Result<Option<Vec<u8>>, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_server_error() {
        let err = RpcError::Server {
            code: -32002,
            message: "Transaction simulation failed".into(),
        };
        assert_eq!(
            err.to_string(),
            "rpc server error -32002: Transaction simulation failed"
        );
    }

    #[test]
    fn display_transport_error() {
        let err = RpcError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "rpc transport error: connection refused");
    }
}
