//! Topics group posts by name.

use super::post::{self, Post};
use super::{KeyedTarget, delete_by_key, exists, keyed_update, require_text};
use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Criteria, FilterRule, build_where_clause};
use crate::fragment::Fragment;
use crate::row::{FromRow, RowExt, map_rows};
use crate::update::{ColumnMap, Payload, build_set_clause};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// Topics have no renamed fields; `name` passes through.
pub const COLUMNS: ColumnMap<'static> = ColumnMap::empty();

pub const FILTERS: &[FilterRule] = &[FilterRule::contains("nameLike", "name")];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub name: String,
}

impl FromRow for Topic {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            name: row.try_get_column("name")?,
        })
    }
}

/// A topic with its posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicDetail {
    pub name: String,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTopic {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicPatch {
    pub name: Option<String>,
}

impl TopicPatch {
    pub fn into_payload(self) -> StoreResult<Payload> {
        if let Some(name) = &self.name {
            require_text("name", name, Some(50))?;
        }

        let mut payload = Payload::new();
        payload.set_opt("name", self.name);
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TopicFilter {
    pub name_like: Option<String>,
}

impl TopicFilter {
    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        criteria.set_opt("nameLike", self.name_like.as_deref());
        criteria
    }
}

pub(crate) fn select_sql(filter: &TopicFilter) -> (String, Fragment) {
    let filter = build_where_clause(&filter.criteria(), FILTERS);
    let sql = format!("SELECT name FROM topics{} ORDER BY name", filter.where_sql());
    (sql, filter)
}

impl Topic {
    /// Insert a topic. `Duplicate` when the name is taken.
    pub async fn create(conn: &impl GenericClient, data: NewTopic) -> StoreResult<Topic> {
        require_text("name", &data.name, Some(50))?;

        if exists(
            conn,
            "topic.create.duplicate_check",
            "SELECT name FROM topics WHERE name = $1",
            &[&data.name],
        )
        .await?
        {
            return Err(StoreError::duplicate(format!("Duplicate topic: {}", data.name)));
        }

        let row = conn
            .query_one_tagged(
                "topic.create",
                "INSERT INTO topics (name) VALUES ($1) RETURNING name",
                &[&data.name],
                "topic insert returned no row",
            )
            .await?;
        Topic::from_row(&row)
    }

    pub async fn find_all(conn: &impl GenericClient, filter: &TopicFilter) -> StoreResult<Vec<Topic>> {
        let (sql, filter) = select_sql(filter);
        let rows = conn
            .query_tagged("topic.find_all", &sql, &filter.params_ref())
            .await?;
        map_rows(&rows)
    }

    /// A topic and its posts, ordered by id.
    pub async fn get(conn: &impl GenericClient, name: &str) -> StoreResult<TopicDetail> {
        let row = conn
            .query_one_tagged(
                "topic.get",
                "SELECT name FROM topics WHERE name = $1",
                &[&name],
                &format!("No topic: {name}"),
            )
            .await?;
        let topic = Topic::from_row(&row)?;

        let rows = conn
            .query_tagged(
                "topic.get.posts",
                &format!(
                    "SELECT {} FROM posts WHERE topic_name = $1 ORDER BY id",
                    post::SELECT_COLUMNS
                ),
                &[&topic.name],
            )
            .await?;
        Ok(TopicDetail {
            name: topic.name,
            posts: map_rows(&rows)?,
        })
    }

    /// Rename a topic. Posts follow through `ON UPDATE CASCADE`.
    pub async fn update(conn: &impl GenericClient, name: &str, patch: TopicPatch) -> StoreResult<Topic> {
        let set = build_set_clause(&patch.into_payload()?, &COLUMNS)?;
        let row = keyed_update(
            conn,
            "topic.update",
            KeyedTarget {
                table: "topics",
                key_column: "name",
                returning: "name",
            },
            &set,
            &name,
            &format!("No topic: {name}"),
        )
        .await?;
        Topic::from_row(&row)
    }

    pub async fn remove(conn: &impl GenericClient, name: &str) -> StoreResult<()> {
        delete_by_key(
            conn,
            "topic.remove",
            "DELETE FROM topics WHERE name = $1",
            &name,
            &format!("No topic: {name}"),
        )
        .await
    }
}
