//! 32-byte ledger addresses.
//!
//! An address is either the raw Ed25519 public key of a key pair, or a
//! program-derived address that deliberately falls off the curve. Both print
//! as Base58 using the standard Bitcoin alphabet from the `bs58` crate.

use std::fmt;
use std::str::FromStr;

use ingl_codec::{CodecError, Decode, Encode, Reader};

use crate::error::SolError;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether these bytes decompress to an Ed25519 point.
    ///
    /// Key-pair addresses are always on the curve; program-derived addresses
    /// never are.
    pub fn is_on_curve(&self) -> bool {
        curve25519_dalek::edwards::CompressedEdwardsY(self.0)
            .decompress()
            .is_some()
    }

    /// Build an address from a slice that must be exactly 32 bytes long.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, SolError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            SolError::InvalidAddress(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;
        Self::try_from_slice(&bytes)
    }
}

impl Encode for Address {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.0.encode(out)
    }
}

impl Decode for Address {
    const MIN_LEN: usize = 32;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self(reader.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The System Program address is 32 zero bytes, which encodes to
    /// "11111111111111111111111111111111" in Base58.
    #[test]
    fn system_program_address() {
        let addr = Address::new([0u8; 32]);
        assert_eq!(addr.to_string(), "11111111111111111111111111111111");
    }

    #[test]
    fn roundtrip_encode_decode() {
        let text = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let address: Address = text.parse().unwrap();
        assert_eq!(address.to_string(), text);
    }

    #[test]
    fn pubkey_bytes_survive_base58() {
        let pubkey: [u8; 32] = [
            0x0e, 0xf2, 0x35, 0x68, 0x3f, 0xbc, 0xb4, 0x92, 0xf1, 0x12, 0x66, 0x7c, 0xc6,
            0x22, 0xaf, 0x04, 0x0d, 0x13, 0x96, 0xab, 0x2b, 0x12, 0x3f, 0x8f, 0xc1, 0xa1,
            0xe1, 0x22, 0x64, 0xfe, 0xd6, 0xb7,
        ];
        let recovered: Address = Address::new(pubkey).to_string().parse().unwrap();
        assert_eq!(recovered.to_bytes(), pubkey);
    }

    #[test]
    fn parse_garbage_returns_error() {
        assert!("not-a-valid-address!!!".parse::<Address>().is_err());
    }

    #[test]
    fn parse_too_short_returns_error() {
        // "1" decodes to a single zero byte, which is not 32 bytes.
        let err = "1".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn signing_key_address_is_on_curve() {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[0x42u8; 32]);
        let address = Address::new(signing_key.verifying_key().to_bytes());
        assert!(address.is_on_curve());
    }

    #[test]
    fn codec_writes_raw_bytes() {
        let address = Address::new([7u8; 32]);
        let bytes = address.to_bytes().to_vec();
        assert_eq!(Encode::to_bytes(&address).unwrap(), bytes);
        assert_eq!(ingl_codec::from_bytes::<Address>(&bytes).unwrap(), address);
    }

    #[test]
    fn debug_shows_base58() {
        let debug = format!("{:?}", Address::new([0u8; 32]));
        assert_eq!(debug, "Address(11111111111111111111111111111111)");
    }
}
