//! Clause text paired with its positional parameters.

use crate::value::{Value, as_params};
use tokio_postgres::types::ToSql;

/// A partial SQL clause and the values for its placeholders.
///
/// The Nth placeholder (`$N`) in [`Fragment::clause`] is bound to
/// `values()[N - 1]`. Fragments are produced by
/// [`build_set_clause`](crate::build_set_clause) and
/// [`build_where_clause`](crate::build_where_clause) and embedded by the
/// caller into a full statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    clause: String,
    values: Vec<Value>,
}

impl Fragment {
    pub(crate) fn new(clause: String, values: Vec<Value>) -> Self {
        Self { clause, values }
    }

    /// A fragment with no text and no values.
    pub fn empty() -> Self {
        Self {
            clause: String::new(),
            values: Vec::new(),
        }
    }

    pub fn clause(&self) -> &str {
        &self.clause
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// True when no predicate or assignment was produced.
    pub fn is_empty(&self) -> bool {
        self.clause.is_empty()
    }

    /// Index of the placeholder a caller must use for the next parameter
    /// appended after this fragment's values.
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }

    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        as_params(&self.values)
    }

    /// Render as ` WHERE <clause>`, or nothing when the fragment is empty.
    pub fn where_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fragment_has_no_where() {
        let f = Fragment::empty();
        assert!(f.is_empty());
        assert_eq!(f.where_sql(), "");
        assert_eq!(f.next_placeholder(), 1);
    }

    #[test]
    fn where_sql_prefixes_keyword_once() {
        let f = Fragment::new("salary >= $1".into(), vec![Value::Int(10)]);
        assert_eq!(f.where_sql(), " WHERE salary >= $1");
        assert_eq!(f.next_placeholder(), 2);
        assert_eq!(f.params_ref().len(), 1);
    }
}
