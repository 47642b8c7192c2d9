//! Bounds-checked cursor over an input buffer.

use crate::error::CodecError;

/// A forward-only cursor that never reads past the end of its buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail with `TruncatedInput` unless at least `needed` bytes remain.
    pub fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(CodecError::TruncatedInput { needed, remaining });
        }
        Ok(())
    }

    /// Consume exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a 4-byte little-endian length prefix.
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = u32::from_le_bytes(self.read_array::<4>()?);
        Ok(len as usize)
    }

    /// Read a union discriminant, rejecting anything at or above `variant_count`.
    pub fn read_discriminant(
        &mut self,
        type_name: &'static str,
        variant_count: u8,
    ) -> Result<u8, CodecError> {
        let discriminant = self.read_u8()?;
        if discriminant >= variant_count {
            return Err(CodecError::UnknownVariant {
                type_name,
                discriminant,
            });
        }
        Ok(discriminant)
    }
}
