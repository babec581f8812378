//! Byte codecs for disk-backed stores

use super::{StorageError, StorageResult};
use crate::model::{Id, Label, LabelIds, StoredTriple};
use serde::{de::DeserializeOwned, Serialize};

/// Turns values into bytes and back
///
/// Plain function pointers, so a codec is `Copy` and can be shared freely
/// between stores.
pub struct Codec<T> {
    pub encode: fn(&T) -> StorageResult<Vec<u8>>,
    pub decode: fn(&[u8]) -> StorageResult<T>,
}

impl<T> Clone for Codec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Codec<T> {}

impl<T: Serialize + DeserializeOwned> Codec<T> {
    /// General purpose bincode codec
    pub fn bincode() -> Self {
        Self {
            encode: |value| Ok(bincode::serialize(value)?),
            decode: |bytes| Ok(bincode::deserialize(bytes)?),
        }
    }
}

impl Codec<Id> {
    /// Raw big-endian id bytes; preserves id order in key space
    pub fn id() -> Self {
        Self {
            encode: |id| Ok(id.encode()),
            decode: |bytes| Ok(Id::decode(bytes)?),
        }
    }
}

impl Codec<Label> {
    /// Raw UTF-8 bytes
    pub fn label() -> Self {
        Self {
            encode: |label| Ok(label.as_bytes().to_vec()),
            decode: |bytes| {
                Label::from_utf8(bytes.to_vec()).map_err(|e| StorageError::Codec(e.to_string()))
            },
        }
    }
}

impl Codec<LabelIds> {
    pub fn label_ids() -> Self {
        Self {
            encode: |ids| Ok(ids.encode()),
            decode: |bytes| Ok(LabelIds::decode(bytes)?),
        }
    }
}

impl Codec<StoredTriple> {
    pub fn stored_triple() -> Self {
        Self {
            encode: |triple| Ok(triple.encode()),
            decode: |bytes| Ok(StoredTriple::decode(bytes)?),
        }
    }
}

impl Codec<String> {
    /// Raw UTF-8 bytes
    pub fn utf8() -> Self {
        Self {
            encode: |value| Ok(value.as_bytes().to_vec()),
            decode: |bytes| String::from_utf8(bytes.to_vec()).map_err(|e| StorageError::Codec(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    #[test]
    fn test_label_codec() {
        let codec = Codec::label();
        let bytes = (codec.encode)(&Label::new("http://example.org/a")).unwrap();
        assert_eq!(bytes, b"http://example.org/a");
        assert_eq!((codec.decode)(&bytes).unwrap().as_str(), "http://example.org/a");
        assert!(matches!((codec.decode)(&[0xFF, 0xFE]), Err(StorageError::Codec(_))));
    }

    #[test]
    fn test_triple_codec_uses_fixed_layout() {
        let codec = Codec::stored_triple();
        let triple = StoredTriple {
            role: Role::Data,
            items: [LabelIds::fresh(Id::from_u64(1).unwrap()); 3],
        };
        let bytes = (codec.encode)(&triple).unwrap();
        assert_eq!(bytes.len(), StoredTriple::ENCODED_LEN);
        assert_eq!((codec.decode)(&bytes).unwrap(), triple);
    }

    #[test]
    fn test_bincode_codec() {
        let codec: Codec<Option<String>> = Codec::bincode();
        let bytes = (codec.encode)(&Some("en".to_string())).unwrap();
        assert_eq!((codec.decode)(&bytes).unwrap(), Some("en".to_string()));
        assert!(matches!((codec.decode)(&[]), Err(StorageError::Serialization(_))));
    }
}
