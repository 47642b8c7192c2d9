//! Canonical binary codec for program instruction and account payloads.
//!
//! The layout is the one the on-chain program decodes, byte for byte:
//!
//! ```text
//! u8 / u16 / u32 / u64   little-endian, fixed width
//! bool                   one byte, 0x00 or 0x01
//! [u8; N]                N raw bytes
//! Vec<T>                 u32 LE element count, then each element
//! String                 u32 LE byte length, then UTF-8 bytes
//! Option<T>              one presence byte (0/1), then T when present
//! enum                   one discriminant byte (declaration order), then payload
//! OrderedMap<K, V>       u32 LE entry count, then key/value pairs
//! ```
//!
//! Encoding never inspects a schema at runtime: each type implements
//! [`Encode`] / [`Decode`] and the layout follows from the type. Plain
//! structs get both impls from [`codec_struct!`].

pub mod error;
mod macros;
pub mod map;
mod primitives;
pub mod reader;

pub use error::CodecError;
pub use map::OrderedMap;
pub use reader::Reader;

/// A value with a canonical byte encoding.
pub trait Encode {
    /// Append the encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError>;

    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// A value that can be read back from its canonical encoding.
pub trait Decode: Sized {
    /// Fewest bytes any value of this type occupies. Sequence decoding uses
    /// it to reject element counts the remaining input cannot hold.
    const MIN_LEN: usize;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError>;
}

/// Decode one value from the front of `bytes`.
///
/// Returns the value and the number of bytes it occupied. Trailing bytes
/// are left alone.
pub fn decode<T: Decode>(bytes: &[u8]) -> Result<(T, usize), CodecError> {
    let mut reader = Reader::new(bytes);
    let value = T::decode(&mut reader)?;
    Ok((value, reader.position()))
}

/// Decode one value that must span all of `bytes`.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    let (value, consumed) = decode(bytes)?;
    if consumed != bytes.len() {
        return Err(CodecError::MalformedEncoding(format!(
            "{} trailing bytes after value",
            bytes.len() - consumed
        )));
    }
    Ok(value)
}

/// Write a 4-byte little-endian length prefix.
pub fn encode_len(len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}
