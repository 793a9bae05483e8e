//! Partial-update SET clause builder.
//!
//! Turns a sparse, ordered payload into `"col"=$1, "col2"=$2, ...` plus the
//! values in the same order, translating external (camelCase) field names to
//! storage columns through a per-entity [`ColumnMap`].
//!
//! ```ignore
//! use factstore::{ColumnMap, Payload, build_set_clause};
//!
//! const COLUMNS: ColumnMap = ColumnMap::new(&[("firstName", "first_name")]);
//!
//! let mut payload = Payload::new();
//! payload.set("firstName", "Aliya").set("age", 32);
//!
//! let set = build_set_clause(&payload, &COLUMNS)?;
//! assert_eq!(set.clause(), r#""first_name"=$1, "age"=$2"#);
//! ```

use crate::error::{StoreError, StoreResult};
use crate::fragment::Fragment;
use crate::ident::Ident;
use crate::value::Value;
use std::fmt::Write;

/// Static translation from external field names to column names.
///
/// A field missing from the map is used unchanged as the column name.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap<'a>(&'a [(&'a str, &'a str)]);

impl<'a> ColumnMap<'a> {
    pub const fn new(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Self(pairs)
    }

    pub const fn empty() -> Self {
        Self(&[])
    }

    /// Column for `field`, or `field` itself when the map has no entry.
    pub fn translate<'k>(&self, field: &'k str) -> &'k str
    where
        'a: 'k,
    {
        self.0
            .iter()
            .find(|(external, _)| *external == field)
            .map_or(field, |(_, column)| *column)
    }
}

/// Ordered field → value mapping for a partial update.
///
/// Insertion order decides placeholder order. Setting a field twice keeps
/// its original position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Vec<(String, Value)>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(f, _)| f == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field.to_string(), value)),
        }
        self
    }

    /// Set an optional field (None => skip).
    pub fn set_opt<T: Into<Value>>(&mut self, field: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(field, v);
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(f, v)| (f.as_str(), v))
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (k, v) in iter {
            payload.set(k.as_ref(), v);
        }
        payload
    }
}

/// Build the body of a `SET` clause from a partial-update payload.
///
/// Fails with [`StoreError::NoData`] when the payload is empty. Column names
/// are rendered as quoted identifiers; values only travel in the returned
/// parameter list.
pub fn build_set_clause(payload: &Payload, columns: &ColumnMap<'_>) -> StoreResult<Fragment> {
    if payload.is_empty() {
        return Err(StoreError::NoData);
    }

    let mut clause = String::new();
    let mut values = Vec::with_capacity(payload.len());
    for (idx, (field, value)) in payload.iter().enumerate() {
        if idx > 0 {
            clause.push_str(", ");
        }
        Ident::quoted(columns.translate(field))?.write_sql(&mut clause);
        let _ = write!(clause, "=${}", idx + 1);
        values.push(value.clone());
    }

    Ok(Fragment::new(clause, values))
}
