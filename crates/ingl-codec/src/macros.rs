/// Declare a plain struct whose encoding is its fields in declaration order.
///
/// ```
/// ingl_codec::codec_struct! {
///     pub struct Point {
///         pub x: u32,
///         pub y: u32,
///     }
/// }
///
/// use ingl_codec::Encode;
/// let bytes = Point { x: 1, y: 2 }.to_bytes().unwrap();
/// assert_eq!(bytes, [1, 0, 0, 0, 2, 0, 0, 0]);
/// ```
#[macro_export]
macro_rules! codec_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Encode for $name {
            fn encode(&self, out: &mut Vec<u8>) -> Result<(), $crate::CodecError> {
                $( $crate::Encode::encode(&self.$field, out)?; )*
                Ok(())
            }
        }

        impl $crate::Decode for $name {
            const MIN_LEN: usize = 0 $( + <$ty as $crate::Decode>::MIN_LEN )*;

            fn decode(reader: &mut $crate::Reader<'_>) -> Result<Self, $crate::CodecError> {
                Ok(Self {
                    $( $field: <$ty as $crate::Decode>::decode(reader)?, )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{from_bytes, CodecError, Encode};

    crate::codec_struct! {
        struct Sample {
            flag: bool,
            count: u16,
            tags: Vec<String>,
            owner: Option<[u8; 4]>,
        }
    }

    #[test]
    fn fields_encode_in_declaration_order() {
        let sample = Sample {
            flag: true,
            count: 0x0102,
            tags: vec!["a".into()],
            owner: None,
        };
        let bytes = sample.to_bytes().unwrap();
        assert_eq!(bytes, vec![1, 0x02, 0x01, 1, 0, 0, 0, 1, 0, 0, 0, b'a', 0]);
        assert_eq!(from_bytes::<Sample>(&bytes).unwrap(), sample);
    }

    #[test]
    fn min_len_sums_fields() {
        use crate::Decode;
        assert_eq!(Sample::MIN_LEN, 1 + 2 + 4 + 1);
    }

    #[test]
    fn short_input_is_truncated() {
        let err = from_bytes::<Sample>(&[1, 0]).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedInput { .. }));
    }
}
