//! Companies and the jobs they post.

use super::{KeyedTarget, delete_by_key, exists, keyed_update, require_non_negative, require_text};
use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Criteria, FilterRule, build_where_clause};
use crate::fragment::Fragment;
use crate::models::job::{self, Job};
use crate::row::{FromRow, RowExt, map_rows};
use crate::update::{ColumnMap, Payload, build_set_clause};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

pub const COLUMNS: ColumnMap<'static> = ColumnMap::new(&[
    ("numEmployees", "num_employees"),
    ("logoUrl", "logo_url"),
]);

pub const FILTERS: &[FilterRule] = &[
    FilterRule::gte("minEmployees", "num_employees"),
    FilterRule::lte("maxEmployees", "num_employees"),
    FilterRule::contains("nameLike", "name"),
];

const SELECT_COLUMNS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

impl FromRow for Company {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            handle: row.try_get_column("handle")?,
            name: row.try_get_column("name")?,
            description: row.try_get_column("description")?,
            num_employees: row.try_get_column("num_employees")?,
            logo_url: row.try_get_column("logo_url")?,
        })
    }
}

/// A company with its jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetail {
    #[serde(flatten)]
    pub company: Company,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCompany {
    pub handle: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl NewCompany {
    pub fn validate(&self) -> StoreResult<()> {
        require_text("handle", &self.handle, Some(25))?;
        require_text("name", &self.name, None)?;
        require_non_negative("numEmployees", self.num_employees)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

impl CompanyPatch {
    pub fn into_payload(self) -> StoreResult<Payload> {
        if let Some(name) = &self.name {
            require_text("name", name, None)?;
        }
        require_non_negative("numEmployees", self.num_employees)?;

        let mut payload = Payload::new();
        payload
            .set_opt("name", self.name)
            .set_opt("description", self.description)
            .set_opt("numEmployees", self.num_employees)
            .set_opt("logoUrl", self.logo_url);
        Ok(payload)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyFilter {
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
    pub name_like: Option<String>,
}

impl CompanyFilter {
    /// Rejects `minEmployees > maxEmployees`.
    pub fn validate(&self) -> StoreResult<()> {
        if let (Some(min), Some(max)) = (self.min_employees, self.max_employees)
            && min > max
        {
            return Err(StoreError::validation(format!(
                "minEmployees ({min}) cannot be greater than maxEmployees ({max})"
            )));
        }
        Ok(())
    }

    pub fn criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        criteria
            .set_opt("minEmployees", self.min_employees)
            .set_opt("maxEmployees", self.max_employees)
            .set_opt("nameLike", self.name_like.as_deref());
        criteria
    }
}

pub(crate) fn select_sql(filter: &CompanyFilter) -> StoreResult<(String, Fragment)> {
    filter.validate()?;
    let filter = build_where_clause(&filter.criteria(), FILTERS);
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM companies{} ORDER BY name",
        filter.where_sql()
    );
    Ok((sql, filter))
}

impl Company {
    /// Insert a company. `Duplicate` when the handle is taken.
    pub async fn create(conn: &impl GenericClient, data: NewCompany) -> StoreResult<Company> {
        data.validate()?;

        if exists(
            conn,
            "company.create.duplicate_check",
            "SELECT handle FROM companies WHERE handle = $1",
            &[&data.handle],
        )
        .await?
        {
            return Err(StoreError::duplicate(format!("Duplicate company: {}", data.handle)));
        }

        let row = conn
            .query_one_tagged(
                "company.create",
                &format!(
                    "INSERT INTO companies (handle, name, description, num_employees, logo_url) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {SELECT_COLUMNS}"
                ),
                &[
                    &data.handle,
                    &data.name,
                    &data.description,
                    &data.num_employees,
                    &data.logo_url,
                ],
                "company insert returned no row",
            )
            .await?;
        Company::from_row(&row)
    }

    /// All companies matching `filter`, ordered by name.
    pub async fn find_all(conn: &impl GenericClient, filter: &CompanyFilter) -> StoreResult<Vec<Company>> {
        let (sql, filter) = select_sql(filter)?;
        let rows = conn
            .query_tagged("company.find_all", &sql, &filter.params_ref())
            .await?;
        map_rows(&rows)
    }

    /// A company and its jobs.
    pub async fn get(conn: &impl GenericClient, handle: &str) -> StoreResult<CompanyDetail> {
        let row = conn
            .query_one_tagged(
                "company.get",
                &format!("SELECT {SELECT_COLUMNS} FROM companies WHERE handle = $1"),
                &[&handle],
                &format!("No company: {handle}"),
            )
            .await?;
        let company = Company::from_row(&row)?;
        let jobs = job::for_company(conn, handle).await?;
        Ok(CompanyDetail { company, jobs })
    }

    pub async fn update(conn: &impl GenericClient, handle: &str, patch: CompanyPatch) -> StoreResult<Company> {
        let set = build_set_clause(&patch.into_payload()?, &COLUMNS)?;
        let row = keyed_update(
            conn,
            "company.update",
            KeyedTarget {
                table: "companies",
                key_column: "handle",
                returning: SELECT_COLUMNS,
            },
            &set,
            &handle,
            &format!("No company: {handle}"),
        )
        .await?;
        Company::from_row(&row)
    }

    pub async fn remove(conn: &impl GenericClient, handle: &str) -> StoreResult<()> {
        delete_by_key(
            conn,
            "company.remove",
            "DELETE FROM companies WHERE handle = $1",
            &handle,
            &format!("No company: {handle}"),
        )
        .await
    }
}
