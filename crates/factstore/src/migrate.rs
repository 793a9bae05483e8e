//! Embedded schema migrations via [`refinery`].
//!
//! ```ignore
//! let mut store = Store::connect(&url).await?;
//! factstore::migrate::run(store.client_mut()).await?;
//! ```

use crate::error::StoreResult;

pub use refinery::{Report, Runner};

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Runner over the migrations compiled into this crate.
pub fn runner() -> Runner {
    embedded::migrations::runner()
}

/// Apply all pending migrations.
pub async fn run(client: &mut tokio_postgres::Client) -> StoreResult<Report> {
    let report = runner().run_async(client).await?;
    for migration in report.applied_migrations() {
        tracing::info!(
            target: "factstore.migrate",
            version = migration.version(),
            name = migration.name(),
            "applied migration"
        );
    }
    Ok(report)
}
