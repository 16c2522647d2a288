//! Type vocabulary: rule tokens ↔ graph schema classes.
//!
//! The vocabulary is the only place that decides which domain types the rule
//! language understands. Extending coverage means adding a row to
//! [`IFC_TYPES`]; nothing else in the pipeline names a schema class.
//!
//! Lookups are case-insensitive on the token side (tokens are upper-cased
//! before lookup). Schema classes are matched exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in token → IFC class table.
pub const IFC_TYPES: &[(&str, &str)] = &[
    ("WALL", "IfcWall"),
    ("SLAB", "IfcSlab"),
    ("BEAM", "IfcBeam"),
    ("COLUMN", "IfcColumn"),
    ("FLOOR", "IfcBuildingStorey"),
    ("BUILDING", "IfcBuilding"),
    ("SITE", "IfcSite"),
    ("SPACE", "IfcSpace"),
    ("DOOR", "IfcDoor"),
    ("WINDOW", "IfcWindow"),
    ("STAIR", "IfcStair"),
    ("ROOF", "IfcRoof"),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyError {
    #[error("token `{0}` is mapped more than once")]
    DuplicateToken(String),
    #[error("schema class `{0}` is mapped more than once")]
    DuplicateClass(String),
    #[error("empty token or schema class in vocabulary entry ({token:?}, {class:?})")]
    EmptyEntry { token: String, class: String },
}

/// One row of the vocabulary, as listed by [`TypeVocabulary::entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub token: String,
    pub class: String,
}

/// Immutable, one-to-one mapping between rule tokens and schema classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVocabulary {
    by_token: BTreeMap<String, String>,
    by_class: BTreeMap<String, String>,
}

impl TypeVocabulary {
    /// The built-in IFC vocabulary.
    pub fn ifc() -> Self {
        let mut by_token = BTreeMap::new();
        let mut by_class = BTreeMap::new();
        for (token, class) in IFC_TYPES {
            by_token.insert(token.to_string(), class.to_string());
            by_class.insert(class.to_string(), token.to_string());
        }
        Self { by_token, by_class }
    }

    /// Build a custom vocabulary. Tokens are normalized to upper case; the
    /// table must stay one-to-one in both directions.
    pub fn from_entries<I, T, C>(entries: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: AsRef<str>,
    {
        let mut by_token = BTreeMap::new();
        let mut by_class = BTreeMap::new();
        for (token, class) in entries {
            let token = token.as_ref().trim().to_ascii_uppercase();
            let class = class.as_ref().trim().to_string();
            if token.is_empty() || class.is_empty() {
                return Err(VocabularyError::EmptyEntry { token, class });
            }
            if by_token.contains_key(&token) {
                return Err(VocabularyError::DuplicateToken(token));
            }
            if by_class.contains_key(&class) {
                return Err(VocabularyError::DuplicateClass(class));
            }
            by_token.insert(token.clone(), class.clone());
            by_class.insert(class, token);
        }
        Ok(Self { by_token, by_class })
    }

    /// Resolve a rule token to its schema class.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.by_token
            .get(&token.trim().to_ascii_uppercase())
            .map(String::as_str)
    }

    /// Reverse lookup: the token that names `class`.
    pub fn token_for(&self, class: &str) -> Option<&str> {
        self.by_class.get(class).map(String::as_str)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.resolve(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// All rows, in token order.
    pub fn entries(&self) -> Vec<VocabularyEntry> {
        self.by_token
            .iter()
            .map(|(token, class)| VocabularyEntry {
                token: token.clone(),
                class: class.clone(),
            })
            .collect()
    }
}

impl Default for TypeVocabulary {
    fn default() -> Self {
        Self::ifc()
    }
}
