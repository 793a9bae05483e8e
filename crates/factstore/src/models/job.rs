//! Job postings.

use super::{KeyedTarget, delete_by_key, exists, keyed_update, require_non_negative, require_text};
use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Criteria, FilterRule, build_where_clause};
use crate::fragment::Fragment;
use crate::row::{FromRow, RowExt, map_rows};
use crate::update::{ColumnMap, Payload, build_set_clause};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const COLUMNS: ColumnMap<'static> = ColumnMap::new(&[("companyHandle", "company_handle")]);

pub const FILTERS: &[FilterRule] = &[
    FilterRule::gte("minSalary", "salary"),
    FilterRule::literal("hasEquity", "equity > 0"),
    FilterRule::contains("titleLike", "title"),
];

const SELECT_COLUMNS: &str = "id, title, salary, equity, company_handle";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

impl FromRow for Job {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            title: row.try_get_column("title")?,
            salary: row.try_get_column("salary")?,
            equity: row.try_get_column("equity")?,
            company_handle: row.try_get_column("company_handle")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default)]
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

fn check_equity(equity: Option<Decimal>) -> StoreResult<()> {
    match equity {
        Some(e) if e < Decimal::ZERO || e > Decimal::ONE => Err(StoreError::validation(
            "equity must be between 0 and 1",
        )),
        _ => Ok(()),
    }
}

impl NewJob {
    pub fn validate(&self) -> StoreResult<()> {
        require_text("title", &self.title, None)?;
        require_text("companyHandle", &self.company_handle, Some(25))?;
        require_non_negative("salary", self.salary)?;
        check_equity(self.equity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobPatch {
    pub title: Option<String>,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: Option<String>,
}

impl JobPatch {
    pub fn into_payload(self) -> StoreResult<Payload> {
        if let Some(title) = &self.title {
            require_text("title", title, None)?;
        }
        require_non_negative("salary", self.salary)?;
        check_equity(self.equity)?;

        let mut payload = Payload::new();
        payload
            .set_opt("title", self.title)
            .set_opt("salary", self.salary)
            .set_opt("equity", self.equity)
            .set_opt("companyHandle", self.company_handle);
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobFilter {
    pub min_salary: Option<i32>,
    pub has_equity: Option<bool>,
    pub title_like: Option<String>,
}

impl JobFilter {
    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        criteria
            .set_opt("minSalary", self.min_salary)
            .set_opt("hasEquity", self.has_equity)
            .set_opt("titleLike", self.title_like.as_deref());
        criteria
    }
}

pub(crate) fn select_sql(filter: &JobFilter) -> (String, Fragment) {
    let filter = build_where_clause(&filter.criteria(), FILTERS);
    let sql = format!("SELECT {SELECT_COLUMNS} FROM jobs{} ORDER BY id", filter.where_sql());
    (sql, filter)
}

/// Jobs posted by `handle`, ordered by id.
pub(crate) async fn for_company(conn: &impl GenericClient, handle: &str) -> StoreResult<Vec<Job>> {
    let rows = conn
        .query_tagged(
            "job.for_company",
            &format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE company_handle = $1 ORDER BY id"),
            &[&handle],
        )
        .await?;
    map_rows(&rows)
}

impl Job {
    /// Insert a job. `Duplicate` when the company already has a job with this title.
    pub async fn create(conn: &impl GenericClient, data: NewJob) -> StoreResult<Job> {
        data.validate()?;

        if exists(
            conn,
            "job.create.duplicate_check",
            "SELECT id FROM jobs WHERE title = $1 AND company_handle = $2",
            &[&data.title, &data.company_handle],
        )
        .await?
        {
            return Err(StoreError::duplicate(format!(
                "Duplicate job: {} at {}",
                data.title, data.company_handle
            )));
        }

        let row = conn
            .query_one_tagged(
                "job.create",
                &format!(
                    "INSERT INTO jobs (title, salary, equity, company_handle) \
                     VALUES ($1, $2, $3, $4) RETURNING {SELECT_COLUMNS}"
                ),
                &[&data.title, &data.salary, &data.equity, &data.company_handle],
                "job insert returned no row",
            )
            .await?;
        Job::from_row(&row)
    }

    /// All jobs matching `filter`, ordered by id.
    pub async fn find_all(conn: &impl GenericClient, filter: &JobFilter) -> StoreResult<Vec<Job>> {
        let (sql, filter) = select_sql(filter);
        let rows = conn
            .query_tagged("job.find_all", &sql, &filter.params_ref())
            .await?;
        map_rows(&rows)
    }

    pub async fn get(conn: &impl GenericClient, id: i32) -> StoreResult<Job> {
        let row = conn
            .query_one_tagged(
                "job.get",
                &format!("SELECT {SELECT_COLUMNS} FROM jobs WHERE id = $1"),
                &[&id],
                &format!("No job: {id}"),
            )
            .await?;
        Job::from_row(&row)
    }

    pub async fn update(conn: &impl GenericClient, id: i32, patch: JobPatch) -> StoreResult<Job> {
        let set = build_set_clause(&patch.into_payload()?, &COLUMNS)?;
        let row = keyed_update(
            conn,
            "job.update",
            KeyedTarget {
                table: "jobs",
                key_column: "id",
                returning: SELECT_COLUMNS,
            },
            &set,
            &id,
            &format!("No job: {id}"),
        )
        .await?;
        Job::from_row(&row)
    }

    pub async fn remove(conn: &impl GenericClient, id: i32) -> StoreResult<()> {
        delete_by_key(
            conn,
            "job.remove",
            "DELETE FROM jobs WHERE id = $1",
            &id,
            &format!("No job: {id}"),
        )
        .await
    }
}
