#![allow(dead_code)]

use factstore::auth::PasswordHasher;
use factstore::models::{Company, NewCompany, NewTopic, NewUser, Topic, User};
use factstore::{GenericClient, Store, StoreResult, TracedClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA_SQL: &str = include_str!("../../migrations/V1__schema.sql");

static NEXT_SCHEMA: AtomicUsize = AtomicUsize::new(0);

/// A traced connection whose `search_path` points at a fresh, private schema.
pub struct TestDb {
    pub conn: TracedClient<Store>,
    schema: String,
}

impl TestDb {
    /// `None` when `DATABASE_URL_TEST` is unset.
    pub async fn connect(test_name: &str) -> StoreResult<Option<Self>> {
        let _ = dotenvy::dotenv();
        let database_url = match std::env::var("DATABASE_URL_TEST") {
            Ok(v) => v,
            Err(_) => {
                eprintln!("DATABASE_URL_TEST is not set; skipping {test_name}");
                return Ok(None);
            }
        };

        let store = Store::connect(&database_url).await?;
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX_EPOCH")
            .as_nanos();
        let schema = format!(
            "factstore_test_{}_{}_{}",
            std::process::id(),
            nanos,
            NEXT_SCHEMA.fetch_add(1, Ordering::Relaxed)
        );

        store
            .client()
            .batch_execute(&format!("CREATE SCHEMA {schema}; SET search_path TO {schema};"))
            .await?;
        store.client().batch_execute(SCHEMA_SQL).await?;

        Ok(Some(Self {
            conn: TracedClient::new(store).no_truncate(),
            schema,
        }))
    }

    pub async fn finish(self) -> StoreResult<()> {
        self.conn
            .inner()
            .client()
            .batch_execute(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .await?;
        self.conn.into_inner().close().await
    }
}

pub fn hasher() -> PasswordHasher {
    PasswordHasher::new(4)
}

pub fn new_company(handle: &str, num_employees: Option<i32>) -> NewCompany {
    NewCompany {
        handle: handle.to_string(),
        name: handle.to_uppercase(),
        description: format!("Desc {handle}"),
        num_employees,
        logo_url: None,
    }
}

pub fn new_user(username: &str, is_admin: bool) -> NewUser {
    NewUser {
        username: username.to_string(),
        password: "password1".to_string(),
        first_name: "U".to_string(),
        last_name: username.to_uppercase(),
        email: format!("{username}@email.com"),
        is_admin,
    }
}

/// Three companies (c1..c3 with 1, 2, 3 employees), two users and a topic.
pub async fn seed(store: &impl GenericClient) -> StoreResult<()> {
    for (i, handle) in ["c1", "c2", "c3"].iter().enumerate() {
        Company::create(store, new_company(handle, Some(i as i32 + 1))).await?;
    }
    User::register(store, &hasher(), new_user("u1", false)).await?;
    User::register(store, &hasher(), new_user("admin", true)).await?;
    Topic::create(store, NewTopic { name: "space".to_string() }).await?;
    Ok(())
}
