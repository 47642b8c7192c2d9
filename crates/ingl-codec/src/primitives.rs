use crate::error::CodecError;
use crate::reader::Reader;
use crate::{encode_len, Decode, Encode};

macro_rules! impl_int {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
                    out.extend_from_slice(&self.to_le_bytes());
                    Ok(())
                }
            }

            impl Decode for $ty {
                const MIN_LEN: usize = std::mem::size_of::<$ty>();

                fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
                    Ok(<$ty>::from_le_bytes(reader.read_array()?))
                }
            }
        )*
    };
}

impl_int!(u8, u16, u32, u64);

impl Encode for bool {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.push(u8::from(*self));
        Ok(())
    }
}

impl Decode for bool {
    const MIN_LEN: usize = 1;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::MalformedEncoding(format!(
                "bool byte 0x{other:02x}"
            ))),
        }
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        out.extend_from_slice(self);
        Ok(())
    }
}

impl<const N: usize> Decode for [u8; N] {
    const MIN_LEN: usize = N;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        reader.read_array()
    }
}

impl Encode for str {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_len(self.len(), out)?;
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }
}

impl Encode for String {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.as_str().encode(out)
    }
}

impl Decode for String {
    const MIN_LEN: usize = 4;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let len = reader.read_len()?;
        let bytes = reader.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::InvalidEncoding(format!("string is not UTF-8: {e}")))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_len(self.len(), out)?;
        for item in self {
            item.encode(out)?;
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    const MIN_LEN: usize = 4;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = reader.read_len()?;
        let needed = count.saturating_mul(T::MIN_LEN);
        reader.ensure(needed)?;

        let mut items = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            items.push(T::decode(reader)?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Some(value) => {
                out.push(1);
                value.encode(out)
            }
            None => {
                out.push(0);
                Ok(())
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    const MIN_LEN: usize = 1;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(reader)?)),
            other => Err(CodecError::MalformedEncoding(format!(
                "option presence byte 0x{other:02x}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{decode, from_bytes, CodecError, Encode};

    // -- integers -------------------------------------------------------------

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(0x0102u16.to_bytes().unwrap(), vec![0x02, 0x01]);
        assert_eq!(0x01020304u32.to_bytes().unwrap(), vec![4, 3, 2, 1]);
        assert_eq!(
            1_000_000_000u64.to_bytes().unwrap(),
            1_000_000_000u64.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn short_integer_is_truncated() {
        let err = from_bytes::<u64>(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedInput {
                needed: 8,
                remaining: 3
            }
        );
    }

    // -- bool -----------------------------------------------------------------

    #[test]
    fn bool_bytes() {
        assert_eq!(true.to_bytes().unwrap(), vec![1]);
        assert_eq!(false.to_bytes().unwrap(), vec![0]);
        assert!(from_bytes::<bool>(&[1]).unwrap());
    }

    #[test]
    fn bool_rejects_other_bytes() {
        let err = from_bytes::<bool>(&[2]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding(_)));
    }

    // -- strings --------------------------------------------------------------

    #[test]
    fn string_is_length_prefixed() {
        let bytes = "ingl".to_string().to_bytes().unwrap();
        assert_eq!(bytes, vec![4, 0, 0, 0, b'i', b'n', b'g', b'l']);
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let err = from_bytes::<String>(&[2, 0, 0, 0, 0xc3, 0x28]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEncoding(_)));
    }

    #[test]
    fn string_with_short_body_is_truncated() {
        let err = from_bytes::<String>(&[5, 0, 0, 0, b'a']).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedInput { .. }));
    }

    // -- sequences ------------------------------------------------------------

    #[test]
    fn vec_u16_layout() {
        let bytes = vec![7000u16, 9900, 10000].to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 3 * 2);
        assert_eq!(&bytes[..4], &[3, 0, 0, 0]);
        assert_eq!(&bytes[4..6], &7000u16.to_le_bytes());
    }

    #[test]
    fn vec_count_larger_than_input_is_truncated() {
        // Declares 1000 u32 elements but carries only one.
        let mut bytes = 1000u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        let err = from_bytes::<Vec<u32>>(&bytes).unwrap_err();
        assert_eq!(
            err,
            CodecError::TruncatedInput {
                needed: 4000,
                remaining: 4
            }
        );
    }

    #[test]
    fn nested_vec_of_strings() {
        let names = vec!["common".to_string(), "rare".to_string()];
        let bytes = names.to_bytes().unwrap();
        let (decoded, consumed) = decode::<Vec<String>>(&bytes).unwrap();
        assert_eq!(decoded, names);
        assert_eq!(consumed, bytes.len());
    }

    // -- fixed arrays ---------------------------------------------------------

    #[test]
    fn array_is_raw_bytes() {
        let key = [0xabu8; 32];
        let bytes = key.to_bytes().unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(from_bytes::<[u8; 32]>(&bytes).unwrap(), key);
    }

    // -- options --------------------------------------------------------------

    #[test]
    fn option_presence_flag() {
        assert_eq!(None::<u32>.to_bytes().unwrap(), vec![0]);
        assert_eq!(Some(5u8).to_bytes().unwrap(), vec![1, 5]);
        assert_eq!(from_bytes::<Option<u8>>(&[1, 5]).unwrap(), Some(5));
    }

    #[test]
    fn option_rejects_bad_flag() {
        let err = from_bytes::<Option<u8>>(&[3, 5]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding(_)));
    }
}
