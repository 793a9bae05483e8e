//! Entity operations.
//!
//! Each entity module declares its column map and filter rules as static
//! data, defines typed payloads for create, patch and filter, and exposes
//! `async` operations taking any [`GenericClient`].

pub mod company;
pub mod job;
pub mod post;
pub mod topic;
pub mod user;

pub use company::{Company, CompanyDetail, CompanyFilter, CompanyPatch, NewCompany};
pub use job::{Job, JobFilter, JobPatch, NewJob};
pub use post::{NewPost, Post, PostFilter, PostPatch};
pub use topic::{NewTopic, Topic, TopicDetail, TopicFilter, TopicPatch};
pub use user::{NewUser, User, UserPatch};

use crate::auth::Access;
use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::fragment::Fragment;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// `UPDATE <table> SET <set> WHERE <key_column> = $<k+1> RETURNING <returning>`.
///
/// The key placeholder continues the numbering of `set`; bind it last
/// (see [`keyed_params`]).
pub fn keyed_update_sql(table: &str, set: &Fragment, key_column: &str, returning: &str) -> String {
    format!(
        "UPDATE {table} SET {} WHERE {key_column} = ${} RETURNING {returning}",
        set.clause(),
        set.next_placeholder()
    )
}

/// `set`'s values followed by `key`.
pub fn keyed_params<'a>(set: &'a Fragment, key: &'a (dyn ToSql + Sync)) -> Vec<&'a (dyn ToSql + Sync)> {
    let mut params = set.params_ref();
    params.push(key);
    params
}

/// Run a keyed partial update and return the updated row.
pub(crate) async fn keyed_update(
    conn: &impl GenericClient,
    tag: &str,
    target: KeyedTarget<'_>,
    set: &Fragment,
    key: &(dyn ToSql + Sync),
    missing: &str,
) -> StoreResult<Row> {
    let sql = keyed_update_sql(target.table, set, target.key_column, target.returning);
    conn.query_one_tagged(tag, &sql, &keyed_params(set, key), missing)
        .await
}

/// Table, key column and RETURNING list for [`keyed_update`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct KeyedTarget<'a> {
    pub table: &'a str,
    pub key_column: &'a str,
    pub returning: &'a str,
}

/// Delete by key, `NotFound` when nothing matched.
pub(crate) async fn delete_by_key(
    conn: &impl GenericClient,
    tag: &str,
    sql: &str,
    key: &(dyn ToSql + Sync),
    missing: &str,
) -> StoreResult<()> {
    let affected = conn.execute_tagged(tag, sql, &[key]).await?;
    if affected == 0 {
        return Err(StoreError::not_found(missing));
    }
    Ok(())
}

/// Whether a row matching `sql` already exists.
pub(crate) async fn exists(
    conn: &impl GenericClient,
    tag: &str,
    sql: &str,
    params: &[&(dyn ToSql + Sync)],
) -> StoreResult<bool> {
    Ok(conn.query_opt_tagged(tag, sql, params).await?.is_some())
}

pub(crate) fn require_text(field: &str, value: &str, max_len: Option<usize>) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::validation(format!("{field} must not be empty")));
    }
    if let Some(max) = max_len
        && value.chars().count() > max
    {
        return Err(StoreError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: Option<i32>) -> StoreResult<()> {
    match value {
        Some(v) if v < 0 => Err(StoreError::validation(format!("{field} must not be negative"))),
        _ => Ok(()),
    }
}

/// The entities the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Company,
    Job,
    Post,
    Topic,
    User,
}

impl Entity {
    pub const ALL: [Entity; 5] = [
        Entity::Company,
        Entity::Job,
        Entity::Post,
        Entity::Topic,
        Entity::User,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Entity::Company => "companies",
            Entity::Job => "jobs",
            Entity::Post => "posts",
            Entity::Topic => "topics",
            Entity::User => "users",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Entity {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "company" | "companies" => Ok(Entity::Company),
            "job" | "jobs" => Ok(Entity::Job),
            "post" | "posts" => Ok(Entity::Post),
            "topic" | "topics" => Ok(Entity::Topic),
            "user" | "users" => Ok(Entity::User),
            other => Err(StoreError::validation(format!("unknown entity: {other}"))),
        }
    }
}

/// What a caller does to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    List,
    Get,
    Update,
    Remove,
}

/// Access level required for `op` on `entity`.
///
/// `key` is the target row's key; it only matters for per-user operations.
pub fn access(entity: Entity, op: Operation, key: Option<&str>) -> Access {
    use Operation::*;

    match (entity, op) {
        (_, List | Get) if entity != Entity::User => Access::Anonymous,
        (Entity::Company | Entity::Job, _) => Access::Admin,
        (Entity::Post, _) => Access::LoggedIn,
        (Entity::Topic, Create) => Access::LoggedIn,
        (Entity::Topic, _) => Access::Admin,
        (Entity::User, Create | List) => Access::Admin,
        (Entity::User, _) => match key {
            Some(username) => Access::SelfOrAdmin(username.to_string()),
            None => Access::Admin,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::{ColumnMap, Payload, build_set_clause};
    use crate::value::Value;

    #[test]
    fn key_placeholder_continues_set_numbering() {
        let mut payload = Payload::new();
        payload.set("firstName", "Jon").set("email", "j@x.io");
        let set = build_set_clause(
            &payload,
            &ColumnMap::new(&[("firstName", "first_name")]),
        )
        .unwrap();

        let sql = keyed_update_sql("users", &set, "username", "username");
        assert_eq!(
            sql,
            r#"UPDATE users SET "first_name"=$1, "email"=$2 WHERE username = $3 RETURNING username"#
        );

        let key = "u1";
        let params = keyed_params(&set, &key);
        assert_eq!(params.len(), 3);
        assert_eq!(set.values(), &[Value::from("Jon"), Value::from("j@x.io")]);
    }

    #[test]
    fn single_field_update_uses_two() {
        let mut payload = Payload::new();
        payload.set("numEmployees", 5);
        let set = build_set_clause(&payload, &ColumnMap::empty()).unwrap();

        let sql = keyed_update_sql("companies", &set, "handle", "handle");
        assert!(sql.contains("WHERE handle = $2"));
    }

    #[test]
    fn entity_names_parse() {
        for entity in Entity::ALL {
            assert_eq!(entity.name().parse::<Entity>().unwrap(), entity);
        }
        assert_eq!("company".parse::<Entity>().unwrap(), Entity::Company);
        assert!("widgets".parse::<Entity>().is_err());
    }

    #[test]
    fn access_table() {
        use Operation::*;

        assert_eq!(access(Entity::Company, List, None), Access::Anonymous);
        assert_eq!(access(Entity::Company, Get, Some("c1")), Access::Anonymous);
        assert_eq!(access(Entity::Company, Create, None), Access::Admin);
        assert_eq!(access(Entity::Job, Remove, Some("1")), Access::Admin);
        assert_eq!(access(Entity::Post, Create, None), Access::LoggedIn);
        assert_eq!(access(Entity::Topic, Create, None), Access::LoggedIn);
        assert_eq!(access(Entity::Topic, Update, Some("t")), Access::Admin);
        assert_eq!(access(Entity::User, List, None), Access::Admin);
        assert_eq!(
            access(Entity::User, Update, Some("u1")),
            Access::SelfOrAdmin("u1".into())
        );
    }

    #[test]
    fn text_validation() {
        assert!(require_text("handle", "c1", Some(25)).is_ok());
        assert!(require_text("handle", "  ", Some(25)).is_err());
        assert!(require_text("handle", &"x".repeat(26), Some(25)).is_err());
        assert!(require_non_negative("salary", Some(-1)).is_err());
        assert!(require_non_negative("salary", None).is_ok());
    }
}
