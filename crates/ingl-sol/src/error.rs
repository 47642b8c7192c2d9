use thiserror::Error;

/// Ledger primitive errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid seeds: {0}")]
    InvalidSeeds(String),

    #[error("no valid program address found for the given seeds")]
    NoValidAddressFound,

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_address() {
        let err = SolError::InvalidAddress("bad decode".into());
        assert_eq!(err.to_string(), "invalid address: bad decode");
    }

    #[test]
    fn display_invalid_seeds() {
        let err = SolError::InvalidSeeds("seed 0 is 40 bytes".into());
        assert_eq!(err.to_string(), "invalid seeds: seed 0 is 40 bytes");
    }

    #[test]
    fn display_no_valid_address_found() {
        assert_eq!(
            SolError::NoValidAddressFound.to_string(),
            "no valid program address found for the given seeds"
        );
    }

    #[test]
    fn display_transaction_build_error() {
        let err = SolError::TransactionBuildError("too many accounts".into());
        assert_eq!(err.to_string(), "transaction build error: too many accounts");
    }

    #[test]
    fn display_serialization_error() {
        let err = SolError::SerializationError("compact-u16 overflow".into());
        assert_eq!(err.to_string(), "serialization error: compact-u16 overflow");
    }

    #[test]
    fn debug_format_works() {
        let err = SolError::InvalidPrivateKey("fail".into());
        let debug = format!("{:?}", err);
        assert!(debug.contains("InvalidPrivateKey"));
    }
}
