//! Data-driven WHERE clause builder.
//!
//! Each entity declares its optional search filters once, as an ordered
//! list of [`FilterRule`]s. [`build_where_clause`] walks that list in
//! declaration order and emits one predicate per rule whose key carries a
//! usable value, joining them with `AND` and numbering placeholders across
//! the selected predicates only.
//!
//! ```ignore
//! use factstore::{Criteria, FilterRule, build_where_clause};
//!
//! const RULES: &[FilterRule] = &[
//!     FilterRule::gte("minSalary", "salary"),
//!     FilterRule::literal("hasEquity", "equity > 0"),
//!     FilterRule::contains("titleLike", "title"),
//! ];
//!
//! let mut criteria = Criteria::new();
//! criteria.set("titleLike", "g").set("minSalary", 150).set("hasEquity", true);
//!
//! let filter = build_where_clause(&criteria, RULES);
//! assert_eq!(filter.clause(), "salary >= $1 AND equity > 0 AND title ILIKE $2");
//! ```

use crate::fragment::Fragment;
use crate::value::Value;
use std::collections::BTreeMap;

/// Comparison a rule applies to its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `column = $n`
    Eq,
    /// `column >= $n`
    Gte,
    /// `column <= $n`
    Lte,
    /// `column ILIKE $n`
    ILike,
    /// A fixed predicate with no placeholder, e.g. `equity > 0`.
    Literal(&'static str),
}

impl Operator {
    fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::ILike => "ILIKE",
            Operator::Literal(_) => "",
        }
    }
}

/// Rewrite applied to a criteria value before it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    /// Substring match: `v` becomes `%v%`, with `\`, `%` and `_` in `v`
    /// escaped so they match literally.
    Contains,
}

impl Transform {
    fn apply(&self, value: &Value) -> Value {
        match (self, value) {
            (Transform::Contains, Value::Text(s)) => {
                let mut pattern = String::with_capacity(s.len() + 2);
                pattern.push('%');
                for ch in s.chars() {
                    if matches!(ch, '\\' | '%' | '_') {
                        pattern.push('\\');
                    }
                    pattern.push(ch);
                }
                pattern.push('%');
                Value::Text(pattern)
            }
            _ => value.clone(),
        }
    }
}

/// When a criteria value is allowed to produce a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usable {
    /// Any non-null value, including `0` and `false`.
    Present,
    /// Non-empty text.
    NonEmpty,
    /// Exactly `true`.
    IsTrue,
}

impl Usable {
    fn test(&self, value: &Value) -> bool {
        match self {
            Usable::Present => !value.is_null(),
            Usable::NonEmpty => value.as_str().is_some_and(|s| !s.is_empty()),
            Usable::IsTrue => value.as_bool() == Some(true),
        }
    }
}

/// One optional search filter an entity accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRule {
    pub key: &'static str,
    pub column: &'static str,
    pub operator: Operator,
    pub transform: Transform,
    pub usable: Usable,
}

impl FilterRule {
    const fn compare(key: &'static str, column: &'static str, operator: Operator) -> Self {
        Self {
            key,
            column,
            operator,
            transform: Transform::Identity,
            usable: Usable::Present,
        }
    }

    /// `column = $n` when `key` is present.
    pub const fn eq(key: &'static str, column: &'static str) -> Self {
        Self::compare(key, column, Operator::Eq)
    }

    /// `column >= $n` when `key` is present (zero included).
    pub const fn gte(key: &'static str, column: &'static str) -> Self {
        Self::compare(key, column, Operator::Gte)
    }

    /// `column <= $n` when `key` is present (zero included).
    pub const fn lte(key: &'static str, column: &'static str) -> Self {
        Self::compare(key, column, Operator::Lte)
    }

    /// Case-insensitive substring match when `key` is non-empty text.
    pub const fn contains(key: &'static str, column: &'static str) -> Self {
        Self {
            key,
            column,
            operator: Operator::ILike,
            transform: Transform::Contains,
            usable: Usable::NonEmpty,
        }
    }

    /// Fixed `predicate` when `key` is exactly `true`.
    pub const fn literal(key: &'static str, predicate: &'static str) -> Self {
        Self {
            key,
            column: "",
            operator: Operator::Literal(predicate),
            transform: Transform::Identity,
            usable: Usable::IsTrue,
        }
    }

    /// Override the usability test.
    pub const fn when(mut self, usable: Usable) -> Self {
        self.usable = usable;
        self
    }
}

/// Caller-supplied filter values keyed by filter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    values: BTreeMap<String, Value>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Set an optional value (None => skip).
    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.set(key, v);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut criteria = Criteria::new();
        for (k, v) in iter {
            criteria.set(k.as_ref(), v);
        }
        criteria
    }
}

/// Build the body of a `WHERE` clause from optional criteria.
///
/// Never fails: criteria with no usable values produce an empty fragment,
/// and the caller omits `WHERE` entirely (see [`Fragment::where_sql`]).
/// Keys not named by any rule are ignored.
pub fn build_where_clause(criteria: &Criteria, rules: &[FilterRule]) -> Fragment {
    let mut predicates: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    for rule in rules {
        let Some(value) = criteria.get(rule.key) else {
            continue;
        };
        if !rule.usable.test(value) {
            continue;
        }

        match rule.operator {
            Operator::Literal(predicate) => predicates.push(predicate.to_string()),
            op => {
                values.push(rule.transform.apply(value));
                predicates.push(format!("{} {} ${}", rule.column, op.as_sql(), values.len()));
            }
        }
    }

    Fragment::new(predicates.join(" AND "), values)
}
