//! Logical type names and field declarations. Pure data.
//!
//! Tuples themselves are schema-less; `Fields` only names positions so the
//! engine can build `TupleEntry` views and select grouping values.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
    /// User-declared composite type, identified by name.
    Ext(String),
}

/// Groups of types that may share one codec or compare across each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeFamily {
    Numeric,
}

impl DataType {
    pub fn family(&self) -> Option<TypeFamily> {
        match self {
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64 => {
                Some(TypeFamily::Numeric)
            }
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.family() == Some(TypeFamily::Numeric)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => f.write_str("bool"),
            DataType::Int32 => f.write_str("i32"),
            DataType::Int64 => f.write_str("i64"),
            DataType::Float32 => f.write_str("f32"),
            DataType::Float64 => f.write_str("f64"),
            DataType::Utf8 => f.write_str("utf8"),
            DataType::Binary => f.write_str("binary"),
            DataType::Ext(name) => write!(f, "ext:{name}"),
        }
    }
}

/// Ordered set of field names. Duplicates are rejected at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Fields {
    names: Vec<String>,
}

impl Fields {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateField(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A one-field declaration; cannot hold duplicates.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Resolve every name of `selector` to a position in `self`.
    pub fn positions_of(&self, selector: &Fields) -> Result<Vec<usize>> {
        selector
            .names
            .iter()
            .map(|name| {
                self.index_of(name)
                    .ok_or_else(|| Error::FieldNotFound(name.clone()))
            })
            .collect()
    }

    /// Concatenate two declarations, e.g. grouping fields followed by results.
    pub fn append(&self, other: &Fields) -> Result<Fields> {
        Fields::new(self.names.iter().chain(other.names.iter()).cloned())
    }
}

impl TryFrom<Vec<String>> for Fields {
    type Error = Error;

    fn try_from(names: Vec<String>) -> Result<Self> {
        Fields::new(names)
    }
}

impl From<Fields> for Vec<String> {
    fn from(fields: Fields) -> Self {
        fields.names
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}
