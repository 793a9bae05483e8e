//! # factstore
//!
//! A small Postgres record store built on injection-safe SQL fragments.
//!
//! ## Features
//!
//! - **Fragments, not strings**: partial-update `SET` lists and optional
//!   `WHERE` filters are built as clause text plus positional `$n`
//!   parameters; values never enter the SQL text
//! - **Data-driven filters**: each entity declares its search filters once as
//!   a static list of [`FilterRule`]s
//! - **Explicit handle**: every operation takes a [`GenericClient`]; open a
//!   [`Store`] at startup and close it at shutdown
//! - **SQL tracing**: wrap any client in [`TracedClient`] to log statements
//!   without their values
//!
//! ## Building fragments
//!
//! ```ignore
//! use factstore::{ColumnMap, Criteria, FilterRule, Payload, build_set_clause, build_where_clause};
//!
//! const COLUMNS: ColumnMap = ColumnMap::new(&[("numEmployees", "num_employees")]);
//!
//! let mut payload = Payload::new();
//! payload.set("numEmployees", 5);
//! let set = build_set_clause(&payload, &COLUMNS)?;
//! assert_eq!(set.clause(), r#""num_employees"=$1"#);
//!
//! const RULES: &[FilterRule] = &[
//!     FilterRule::gte("minSalary", "salary"),
//!     FilterRule::literal("hasEquity", "equity > 0"),
//!     FilterRule::contains("titleLike", "title"),
//! ];
//! let mut criteria = Criteria::new();
//! criteria.set("minSalary", 150).set("hasEquity", true);
//! let filter = build_where_clause(&criteria, RULES);
//! assert_eq!(filter.clause(), "salary >= $1 AND equity > 0");
//! ```
//!
//! ## Entity operations
//!
//! ```ignore
//! use factstore::{Store, StoreConfig, TracedClient};
//! use factstore::models::{Job, JobFilter};
//!
//! let config = StoreConfig::load(None)?;
//! let store = TracedClient::new(Store::from_config(&config).await?);
//!
//! let filter = JobFilter { min_salary: Some(100_000), ..Default::default() };
//! let jobs = Job::find_all(&store, &filter).await?;
//!
//! store.into_inner().close().await?;
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod fragment;
pub mod ident;
pub mod models;
pub mod monitor;
pub mod row;
pub mod store;
pub mod telemetry;
pub mod update;
pub mod value;

#[cfg(feature = "migrate")]
pub mod migrate;

pub use auth::{Access, Claims, PasswordHasher, authorize, create_token, verify_token};
pub use client::GenericClient;
pub use config::{Environment, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use filter::{Criteria, FilterRule, Operator, Transform, Usable, build_where_clause};
pub use fragment::Fragment;
pub use ident::Ident;
pub use monitor::{QueryType, TracedClient};
pub use row::{FromRow, RowExt};
pub use store::Store;
pub use update::{ColumnMap, Payload, build_set_clause};
pub use value::Value;
