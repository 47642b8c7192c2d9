use thiserror::Error;

/// Binary codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("unknown variant {discriminant} for {type_name}")]
    UnknownVariant {
        type_name: &'static str,
        discriminant: u8,
    },

    #[error("duplicate map key at entry {0}")]
    DuplicateKey(usize),

    #[error("length {0} does not fit a 4-byte prefix")]
    LengthOverflow(usize),
}
