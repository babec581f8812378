//! Core type definitions for the triple store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label of a triple member (usually a URI)
///
/// Labels are opaque: two labels are the same iff their strings are equal.
/// Several labels may share one canonical id after identity merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default)]
pub struct Label(String);

impl Label {
    pub fn new(label: impl Into<String>) -> Self {
        Label(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a label from stored bytes
    pub fn from_utf8(bytes: Vec<u8>) -> Result<Self, std::string::FromUtf8Error> {
        String::from_utf8(bytes).map(Label)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label(s)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label(s.to_string())
    }
}

impl From<&String> for Label {
    fn from(s: &String) -> Self {
        Label(s.clone())
    }
}

/// A literal value with an optional language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Datum {
    pub value: String,
    pub language: Option<String>,
}

impl Datum {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
        }
    }

    pub fn with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: Some(language.into()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(lang) => write!(f, "{:?}@{}", self.value, lang),
            None => write!(f, "{:?}", self.value),
        }
    }
}

/// Why a triple was stored
///
/// The numeric order matters: when two triples collide on the same
/// normalized edge, the one with the smaller role wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum Role {
    /// Directly asserted
    #[default]
    Regular = 0,
    /// Synthesized from a declared inverse property
    Inverse = 1,
    /// Subject-predicate-literal fact
    Data = 2,
}

impl Role {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Role> {
        match byte {
            0 => Some(Role::Regular),
            1 => Some(Role::Inverse),
            2 => Some(Role::Data),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Regular => write!(f, "regular"),
            Role::Inverse => write!(f, "inverse"),
            Role::Data => write!(f, "data"),
        }
    }
}

/// Running counters of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub direct_triples: u64,
    pub datum_triples: u64,
    pub masked_pred_triples: u64,
    pub masked_data_triples: u64,
    pub inverse_triples: u64,
    pub conflict_triples: u64,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{direct:{},datum:{},mask(pred):{},mask(data):{},inverse:{},conflict:{}}}",
            self.direct_triples,
            self.datum_triples,
            self.masked_pred_triples,
            self.masked_data_triples,
            self.inverse_triples,
            self.conflict_triples,
        )
    }
}
