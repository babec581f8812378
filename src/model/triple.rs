//! Stored and resolved triples

use super::id::{Id, ID_LEN};
use super::types::{Datum, Label, Role};
use std::cmp::Ordering;
use thiserror::Error;

/// Canonical and literal id of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LabelIds {
    /// Id normalized for identities; used for all lookups
    pub canonical: Id,
    /// Id assigned when the label was first seen; never changes
    pub literal: Id,
}

impl LabelIds {
    pub const ENCODED_LEN: usize = 2 * ID_LEN;

    /// A pair whose canonical and literal id are both `id`
    pub fn fresh(id: Id) -> Self {
        Self {
            canonical: id,
            literal: id,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0; Self::ENCODED_LEN];
        bytes[..ID_LEN].copy_from_slice(self.canonical.as_bytes());
        bytes[ID_LEN..].copy_from_slice(self.literal.as_bytes());
        bytes
    }

    pub fn decode(src: &[u8]) -> Result<Self, TripleDecodeError> {
        if src.len() < Self::ENCODED_LEN {
            return Err(TripleDecodeError::TooShort {
                needed: Self::ENCODED_LEN,
                got: src.len(),
            });
        }
        Ok(Self {
            canonical: Id::decode(&src[..ID_LEN])?,
            literal: Id::decode(&src[ID_LEN..])?,
        })
    }
}

/// Errors decoding stored triple data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TripleDecodeError {
    #[error("encoded triple too short: need {needed} bytes, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("unknown triple role {0}")]
    UnknownRole(u8),

    #[error(transparent)]
    Id(#[from] super::id::IdError),
}

/// A triple record as kept in the triples store
///
/// `items` holds the (subject, predicate, object) id pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoredTriple {
    pub role: Role,
    pub items: [LabelIds; 3],
}

impl StoredTriple {
    /// Role byte followed by six ids
    pub const ENCODED_LEN: usize = 1 + 6 * ID_LEN;

    /// Encodes as role, then the literal subject, predicate and object, then their canonical ids
    pub fn encode(&self) -> Vec<u8> {
        let [s, p, o] = self.items;
        let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
        bytes.push(self.role.as_byte());
        for id in [s.literal, p.literal, o.literal, s.canonical, p.canonical, o.canonical] {
            bytes.extend_from_slice(id.as_bytes());
        }
        bytes
    }

    pub fn decode(src: &[u8]) -> Result<Self, TripleDecodeError> {
        if src.len() < Self::ENCODED_LEN {
            return Err(TripleDecodeError::TooShort {
                needed: Self::ENCODED_LEN,
                got: src.len(),
            });
        }
        let role = Role::from_byte(src[0]).ok_or(TripleDecodeError::UnknownRole(src[0]))?;
        let id = |slot: usize| Id::decode(&src[1 + slot * ID_LEN..]);

        let mut items = [LabelIds::default(); 3];
        for (i, item) in items.iter_mut().enumerate() {
            item.literal = id(i)?;
            item.canonical = id(i + 3)?;
        }
        Ok(Self { role, items })
    }
}

/// A fully dereferenced triple
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Triple {
    /// Literal labels, as found in the original data
    pub subject: Label,
    pub predicate: Label,
    pub object: Label,

    /// Canonical labels, normalized for identities and inverses
    pub canonical_subject: Label,
    pub canonical_predicate: Label,
    pub canonical_object: Label,

    /// Attached datum for [`Role::Data`] triples
    pub datum: Option<Datum>,

    /// Unique id; two triples are identical iff their ids are
    pub id: Id,

    pub role: Role,
}

impl Triple {
    /// Checks if this triple was inferred from an inverse declaration
    pub fn inferred(&self) -> bool {
        self.role == Role::Inverse
    }

    /// Compares two triples by id
    pub fn compare(&self, other: &Triple) -> Ordering {
        self.id.cmp(&other.id)
    }
}
