//! Posts filed under a topic.

use super::{KeyedTarget, delete_by_key, keyed_update, require_text};
use crate::client::GenericClient;
use crate::error::StoreResult;
use crate::filter::{Criteria, FilterRule, build_where_clause};
use crate::fragment::Fragment;
use crate::row::{FromRow, RowExt, map_rows};
use crate::update::{ColumnMap, Payload, build_set_clause};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const COLUMNS: ColumnMap<'static> = ColumnMap::new(&[("topicName", "topic_name")]);

pub const FILTERS: &[FilterRule] = &[
    FilterRule::contains("contentLike", "content"),
    FilterRule::eq("username", "username"),
    FilterRule::eq("topicName", "topic_name"),
];

pub(crate) const SELECT_COLUMNS: &str = "id, username, topic_name, date, content";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i32,
    pub username: String,
    pub topic_name: String,
    pub date: DateTime<Utc>,
    pub content: String,
}

impl FromRow for Post {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            username: row.try_get_column("username")?,
            topic_name: row.try_get_column("topic_name")?,
            date: row.try_get_column("date")?,
            content: row.try_get_column("content")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPost {
    pub username: String,
    pub topic_name: String,
    pub content: String,
}

impl NewPost {
    pub fn validate(&self) -> StoreResult<()> {
        require_text("username", &self.username, Some(25))?;
        require_text("topicName", &self.topic_name, Some(50))?;
        require_text("content", &self.content, None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostPatch {
    pub topic_name: Option<String>,
    pub content: Option<String>,
}

impl PostPatch {
    pub fn into_payload(self) -> StoreResult<Payload> {
        if let Some(content) = &self.content {
            require_text("content", content, None)?;
        }

        let mut payload = Payload::new();
        payload
            .set_opt("topicName", self.topic_name)
            .set_opt("content", self.content);
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostFilter {
    pub content_like: Option<String>,
    pub username: Option<String>,
    pub topic_name: Option<String>,
}

impl PostFilter {
    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        criteria
            .set_opt("contentLike", self.content_like.as_deref())
            .set_opt("username", self.username.as_deref())
            .set_opt("topicName", self.topic_name.as_deref());
        criteria
    }
}

pub(crate) fn select_sql(filter: &PostFilter) -> (String, Fragment) {
    let filter = build_where_clause(&filter.criteria(), FILTERS);
    let sql = format!("SELECT {SELECT_COLUMNS} FROM posts{} ORDER BY id", filter.where_sql());
    (sql, filter)
}

impl Post {
    /// Insert a post dated now.
    pub async fn create(conn: &impl GenericClient, data: NewPost) -> StoreResult<Post> {
        data.validate()?;

        let row = conn
            .query_one_tagged(
                "post.create",
                &format!(
                    "INSERT INTO posts (username, topic_name, date, content) \
                     VALUES ($1, $2, NOW(), $3) RETURNING {SELECT_COLUMNS}"
                ),
                &[&data.username, &data.topic_name, &data.content],
                "post insert returned no row",
            )
            .await?;
        Post::from_row(&row)
    }

    /// All posts matching `filter`, ordered by id.
    pub async fn find_all(conn: &impl GenericClient, filter: &PostFilter) -> StoreResult<Vec<Post>> {
        let (sql, filter) = select_sql(filter);
        let rows = conn
            .query_tagged("post.find_all", &sql, &filter.params_ref())
            .await?;
        map_rows(&rows)
    }

    pub async fn get(conn: &impl GenericClient, id: i32) -> StoreResult<Post> {
        let row = conn
            .query_one_tagged(
                "post.get",
                &format!("SELECT {SELECT_COLUMNS} FROM posts WHERE id = $1"),
                &[&id],
                &format!("No post: {id}"),
            )
            .await?;
        Post::from_row(&row)
    }

    pub async fn update(conn: &impl GenericClient, id: i32, patch: PostPatch) -> StoreResult<Post> {
        let set = build_set_clause(&patch.into_payload()?, &COLUMNS)?;
        let row = keyed_update(
            conn,
            "post.update",
            KeyedTarget {
                table: "posts",
                key_column: "id",
                returning: SELECT_COLUMNS,
            },
            &set,
            &id,
            &format!("No post: {id}"),
        )
        .await?;
        Post::from_row(&row)
    }

    pub async fn remove(conn: &impl GenericClient, id: i32) -> StoreResult<()> {
        delete_by_key(
            conn,
            "post.remove",
            "DELETE FROM posts WHERE id = $1",
            &id,
            &format!("No post: {id}"),
        )
        .await
    }
}
