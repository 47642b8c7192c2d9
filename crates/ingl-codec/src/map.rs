//! Insertion-ordered key/value map with a canonical encoding.
//!
//! Program accounts store maps as a count followed by key/value pairs. The
//! program never sorts them, so the encoder must not either: pairs are
//! written in insertion order and a key may appear only once.

use crate::error::CodecError;
use crate::reader::Reader;
use crate::{encode_len, Decode, Encode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw pairs without checking them. Duplicate keys are caught at
    /// encode time.
    pub fn from_entries(entries: Vec<(K, V)>) -> Self {
        Self { entries }
    }

    /// Insert or replace. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Index of the first entry whose key already appeared earlier.
    fn first_duplicate(&self) -> Option<usize> {
        (1..self.entries.len()).find(|&i| {
            self.entries[..i]
                .iter()
                .any(|(k, _)| *k == self.entries[i].0)
        })
    }
}

impl<K: Encode + PartialEq, V: Encode> Encode for OrderedMap<K, V> {
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        if let Some(index) = self.first_duplicate() {
            return Err(CodecError::DuplicateKey(index));
        }
        encode_len(self.entries.len(), out)?;
        for (key, value) in &self.entries {
            key.encode(out)?;
            value.encode(out)?;
        }
        Ok(())
    }
}

impl<K: Decode + PartialEq, V: Decode> Decode for OrderedMap<K, V> {
    const MIN_LEN: usize = 4;

    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = reader.read_len()?;
        reader.ensure(count.saturating_mul(K::MIN_LEN + V::MIN_LEN))?;

        let mut map = OrderedMap::new();
        for index in 0..count {
            let key = K::decode(reader)?;
            let value = V::decode(reader)?;
            if map.insert(key, value).is_some() {
                return Err(CodecError::DuplicateKey(index));
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_bytes;

    #[test]
    fn preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert(9u8, 1u32);
        map.insert(3u8, 2u32);
        let bytes = map.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(bytes[4], 9);
        assert_eq!(bytes[9], 3);
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut map = OrderedMap::new();
        assert_eq!(map.insert(1u8, 10u8), None);
        assert_eq!(map.insert(1u8, 20u8), Some(10));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&20));
    }

    #[test]
    fn encode_rejects_duplicate_keys() {
        let map = OrderedMap::from_entries(vec![(1u8, 1u8), (2, 2), (1, 3)]);
        assert_eq!(map.to_bytes().unwrap_err(), CodecError::DuplicateKey(2));
    }

    #[test]
    fn decode_rejects_duplicate_keys() {
        let bytes = [2, 0, 0, 0, 7, 1, 7, 2];
        let err = from_bytes::<OrderedMap<u8, u8>>(&bytes).unwrap_err();
        assert_eq!(err, CodecError::DuplicateKey(1));
    }

    #[test]
    fn roundtrip_with_fixed_keys() {
        let mut map = OrderedMap::new();
        map.insert([1u8; 32], true);
        map.insert([2u8; 32], false);
        let bytes = map.to_bytes().unwrap();
        let decoded: OrderedMap<[u8; 32], bool> = from_bytes(&bytes).unwrap();
        assert_eq!(decoded, map);
    }
}
