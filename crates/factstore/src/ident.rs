//! Quoted SQL identifiers.
//!
//! Payload field names that have no column mapping reach the statement text
//! as column names, so they are always rendered as double-quoted identifiers
//! with embedded `"` doubled. Values never pass through here.
//!
//! ```ignore
//! use factstore::Ident;
//!
//! let col = Ident::quoted("num_employees")?;
//! assert_eq!(col.to_sql(), r#""num_employees""#);
//! # Ok::<(), factstore::StoreError>(())
//! ```

use crate::error::{StoreError, StoreResult};

/// A single column name, taken literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident(String);

impl Ident {
    /// Dots and quotes are part of the name; empty names and NUL are rejected.
    pub fn quoted(name: &str) -> StoreResult<Self> {
        if name.is_empty() {
            return Err(StoreError::validation("Empty quoted identifier"));
        }
        if name.contains('\0') {
            return Err(StoreError::validation(
                "Identifier cannot contain NUL character",
            ));
        }
        Ok(Self(name.to_string()))
    }

    pub fn to_sql(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        out.push('"');
        for ch in self.0.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    }
}
