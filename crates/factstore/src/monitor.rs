//! SQL tracing for entity operations.
//!
//! [`TracedClient`] wraps any [`GenericClient`] and emits a `tracing` event at
//! target `factstore.sql` for every statement: the operation tag, statement
//! kind, parameter count, (truncated) SQL text and elapsed time. Parameter
//! values are never logged.
//!
//! ```rust,ignore
//! use factstore::{Store, TracedClient};
//!
//! let store = Store::connect(&url).await?;
//! let conn = TracedClient::new(store).slow_query_threshold(Duration::from_millis(250));
//! let jobs = Job::find_all(&conn, &filter).await?;
//! ```

use crate::client::GenericClient;
use crate::error::StoreResult;
use std::time::{Duration, Instant};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, session commands and anything else
    Other,
}

impl QueryType {
    /// Detect query type from the first keyword of a SQL string.
    pub fn from_sql(sql: &str) -> Self {
        fn starts_with_keyword(s: &str, keyword: &str) -> bool {
            match s.get(0..keyword.len()) {
                Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
                None => false,
            }
        }

        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "WITH") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// A [`GenericClient`] that logs every statement it forwards.
#[derive(Debug)]
pub struct TracedClient<C> {
    client: C,
    max_sql_length: Option<usize>,
    slow_query_threshold: Option<Duration>,
}

impl<C: GenericClient> TracedClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            max_sql_length: Some(200),
            slow_query_threshold: None,
        }
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Statements slower than `threshold` are reported at WARN.
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    fn display_sql(&self, sql: &str) -> String {
        let sql = sql.split_whitespace().collect::<Vec<_>>().join(" ");
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(&sql, max)),
            _ => sql,
        }
    }

    fn record<T>(&self, tag: &str, sql: &str, param_count: usize, started: Instant, result: &StoreResult<T>) {
        let elapsed = started.elapsed();
        let query_type = QueryType::from_sql(sql);
        let sql = self.display_sql(sql);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;

        match result {
            Err(e) => tracing::error!(
                target: "factstore.sql",
                tag,
                ?query_type,
                param_count,
                elapsed_ms,
                sql = %sql,
                error = %e,
                "statement failed"
            ),
            Ok(_) if self.slow_query_threshold.is_some_and(|t| elapsed >= t) => tracing::warn!(
                target: "factstore.sql",
                tag,
                ?query_type,
                param_count,
                elapsed_ms,
                sql = %sql,
                "slow statement"
            ),
            Ok(_) => tracing::debug!(
                target: "factstore.sql",
                tag,
                ?query_type,
                param_count,
                elapsed_ms,
                sql = %sql,
                "statement"
            ),
        }
    }
}

impl<C: GenericClient> GenericClient for TracedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<Vec<Row>> {
        self.query_tagged("-", sql, params).await
    }

    async fn query_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> StoreResult<Vec<Row>> {
        let started = Instant::now();
        let result = self.client.query_tagged(tag, sql, params).await;
        self.record(tag, sql, params.len(), started, &result);
        result
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<u64> {
        self.execute_tagged("-", sql, params).await
    }

    async fn execute_tagged(
        &self,
        tag: &str,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> StoreResult<u64> {
        let started = Instant::now();
        let result = self.client.execute_tagged(tag, sql, params).await;
        self.record(tag, sql, params.len(), started, &result);
        result
    }
}
