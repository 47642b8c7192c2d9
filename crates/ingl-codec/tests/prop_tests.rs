use proptest::prelude::*;

use ingl_codec::{decode, from_bytes, CodecError, Encode, OrderedMap};

proptest! {
    /// Strings decode to the same text and consume the whole buffer.
    #[test]
    fn string_roundtrip(text in ".{0,64}") {
        let bytes = text.to_bytes().unwrap();
        let (decoded, consumed) = decode::<String>(&bytes).unwrap();
        prop_assert_eq!(decoded, text);
        prop_assert_eq!(consumed, bytes.len());
    }

    /// Sequences of optional integers roundtrip exactly.
    #[test]
    fn vec_of_options_roundtrip(values in prop::collection::vec(prop::option::of(any::<u32>()), 0..32)) {
        let bytes = values.to_bytes().unwrap();
        let decoded: Vec<Option<u32>> = from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded, values);
    }

    /// Trailing garbage is ignored by `decode` and reported by `from_bytes`.
    #[test]
    fn trailing_bytes_are_not_consumed(value in any::<u64>(), tail in prop::collection::vec(any::<u8>(), 1..8)) {
        let mut bytes = value.to_bytes().unwrap();
        let body_len = bytes.len();
        bytes.extend_from_slice(&tail);

        let (decoded, consumed) = decode::<u64>(&bytes).unwrap();
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(consumed, body_len);
        prop_assert!(matches!(from_bytes::<u64>(&bytes), Err(CodecError::MalformedEncoding(_))));
    }

    /// Any strict prefix of a valid encoding fails as truncated input.
    #[test]
    fn prefixes_are_truncated(values in prop::collection::vec(any::<u16>(), 1..16), cut in 1usize..8) {
        let bytes = values.to_bytes().unwrap();
        let cut = cut.min(bytes.len());
        let err = from_bytes::<Vec<u16>>(&bytes[..bytes.len() - cut]).unwrap_err();
        let is_truncated = matches!(err, CodecError::TruncatedInput { .. });
        prop_assert!(is_truncated);
    }

    /// Maps built through `insert` never contain duplicates and roundtrip.
    #[test]
    fn map_roundtrip(pairs in prop::collection::vec((any::<[u8; 4]>(), any::<bool>()), 0..16)) {
        let mut map = OrderedMap::new();
        for (key, value) in pairs {
            map.insert(key, value);
        }
        let bytes = map.to_bytes().unwrap();
        let decoded: OrderedMap<[u8; 4], bool> = from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded, map);
    }
}
