//! Data model of the triple store
//!
//! - [`Id`]: fixed-width, totally ordered identifiers
//! - [`Label`] and [`Datum`]: node/edge labels and literal values
//! - [`StoredTriple`] and [`Triple`]: the on-disk record and its resolved view

pub mod id;
pub mod triple;
pub mod types;

pub use id::{decode_id_at, decode_ids, encode_ids, encode_ids_into, Id, IdError, IdResult, ID_LEN};
pub use triple::{LabelIds, StoredTriple, Triple, TripleDecodeError};
pub use types::{Datum, IndexStats, Label, Role};
