//! Fixed-width identifiers
//!
//! An [`Id`] is a big-endian counter value of [`ID_LEN`] bytes. Because the
//! encoding is big-endian, byte-lexicographic order of the encoded form is
//! the same as the order in which ids were generated, which lets ids be
//! used directly as sortable on-disk keys.
//!
//! The all-zero id is reserved as "invalid/unset". Ids are handed out by
//! [`Id::inc`] and never reused. With four bytes there are `2^32 - 1`
//! usable ids per counter; incrementing past [`Id::MAX`] is reported as
//! [`IdError::CapacityExhausted`]. If that ever happens, `ID_LEN` has to
//! be increased.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Size of an encoded [`Id`] in bytes
pub const ID_LEN: usize = 4;

/// Identifier errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The counter cannot be incremented any further
    #[error("id capacity exhausted: all {} ids are in use", Id::MAX.as_u64())]
    CapacityExhausted,

    /// A decode buffer was too short
    #[error("invalid id encoding: need {needed} bytes, got {got}")]
    InvalidLength { needed: usize, got: usize },

    /// An integer does not fit into an id
    #[error("value {0} does not fit into an id")]
    OutOfRange(u64),
}

pub type IdResult<T> = Result<T, IdError>;

/// Unique identifier of a label, datum or triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default)]
pub struct Id([u8; ID_LEN]);

impl Id {
    /// The invalid id
    pub const ZERO: Id = Id([0; ID_LEN]);

    /// The largest id that [`Id::inc`] can produce
    pub const MAX: Id = Id([0xFF; ID_LEN]);

    /// Resets this id to the invalid value
    pub fn reset(&mut self) {
        *self = Id::ZERO;
    }

    /// Increments this id in place and returns the new value.
    ///
    /// On overflow the id is left unchanged.
    pub fn inc(&mut self) -> IdResult<Id> {
        let mut next = self.0;
        for byte in next.iter_mut().rev() {
            *byte = byte.wrapping_add(1);
            if *byte != 0 {
                self.0 = next;
                return Ok(*self);
            }
        }
        Err(IdError::CapacityExhausted)
    }

    /// Checks if this id is valid, i.e. not zero
    pub fn is_valid(&self) -> bool {
        // most ids are small, so the last byte is the likeliest to be set
        self.0.iter().rev().any(|b| *b != 0)
    }

    /// Builds the id with numerical value `value`
    pub fn from_u64(value: u64) -> IdResult<Id> {
        if value > Id::MAX.as_u64() {
            return Err(IdError::OutOfRange(value));
        }
        let bytes = value.to_be_bytes();
        let mut data = [0; ID_LEN];
        data.copy_from_slice(&bytes[bytes.len() - ID_LEN..]);
        Ok(Id(data))
    }

    /// Numerical value of this id, i.e. how often `inc` was called on zero to reach it
    pub fn as_u64(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    /// Raw big-endian bytes
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        &self.0
    }

    /// Writes the encoded id into the first [`ID_LEN`] bytes of `dest`
    pub fn encode_into(&self, dest: &mut [u8]) -> IdResult<()> {
        if dest.len() < ID_LEN {
            return Err(IdError::InvalidLength {
                needed: ID_LEN,
                got: dest.len(),
            });
        }
        dest[..ID_LEN].copy_from_slice(&self.0);
        Ok(())
    }

    /// Encodes this id into a fresh buffer
    pub fn encode(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Decodes an id from the first [`ID_LEN`] bytes of `src`
    pub fn decode(src: &[u8]) -> IdResult<Id> {
        if src.len() < ID_LEN {
            return Err(IdError::InvalidLength {
                needed: ID_LEN,
                got: src.len(),
            });
        }
        let mut data = [0; ID_LEN];
        data.copy_from_slice(&src[..ID_LEN]);
        Ok(Id(data))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.as_u64())
    }
}

/// Encodes ids back to back into a new buffer.
///
/// Used for composite keys such as `predicate ‖ subject ‖ object`.
pub fn encode_ids(ids: &[Id]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(ids.len() * ID_LEN);
    for id in ids {
        bytes.extend_from_slice(&id.0);
    }
    bytes
}

/// Like [`encode_ids`], but writes into an existing buffer
pub fn encode_ids_into(dest: &mut [u8], ids: &[Id]) -> IdResult<()> {
    let needed = ids.len() * ID_LEN;
    if dest.len() < needed {
        return Err(IdError::InvalidLength {
            needed,
            got: dest.len(),
        });
    }
    for (chunk, id) in dest.chunks_exact_mut(ID_LEN).zip(ids) {
        chunk.copy_from_slice(&id.0);
    }
    Ok(())
}

/// Decodes a buffer produced by [`encode_ids`].
///
/// `src` must be a whole number of ids long.
pub fn decode_ids(src: &[u8]) -> IdResult<Vec<Id>> {
    if src.len() % ID_LEN != 0 {
        return Err(IdError::InvalidLength {
            needed: src.len().next_multiple_of(ID_LEN),
            got: src.len(),
        });
    }
    src.chunks_exact(ID_LEN).map(Id::decode).collect()
}

/// Decodes only the id at position `index` of a buffer produced by [`encode_ids`]
pub fn decode_id_at(src: &[u8], index: usize) -> IdResult<Id> {
    let start = index * ID_LEN;
    if src.len() < start + ID_LEN {
        return Err(IdError::InvalidLength {
            needed: start + ID_LEN,
            got: src.len(),
        });
    }
    Id::decode(&src[start..])
}
