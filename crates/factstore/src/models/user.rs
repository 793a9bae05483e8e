//! Users, registration and password login.
//!
//! Passwords are stored as bcrypt hashes and never returned.

use super::{KeyedTarget, delete_by_key, exists, keyed_update, require_text};
use crate::auth::{Access, PasswordHasher};
use crate::client::GenericClient;
use crate::error::{StoreError, StoreResult};
use crate::row::{FromRow, RowExt, map_rows};
use crate::update::{ColumnMap, Payload, build_set_clause};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// `password` and `email` pass through unchanged.
pub const COLUMNS: ColumnMap<'static> = ColumnMap::new(&[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
]);

const SELECT_COLUMNS: &str = "username, first_name, last_name, email, is_admin";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

impl FromRow for User {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            username: row.try_get_column("username")?,
            first_name: row.try_get_column("first_name")?,
            last_name: row.try_get_column("last_name")?,
            email: row.try_get_column("email")?,
            is_admin: row.try_get_column("is_admin")?,
        })
    }
}

#[derive(Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

fn check_email(email: &str) -> StoreResult<()> {
    match email.find('@') {
        Some(at) if at > 0 && at + 1 < email.len() => Ok(()),
        _ => Err(StoreError::validation(format!("invalid email: {email}"))),
    }
}

impl NewUser {
    pub fn validate(&self) -> StoreResult<()> {
        require_text("username", &self.username, Some(25))?;
        require_text("password", &self.password, None)?;
        require_text("firstName", &self.first_name, None)?;
        require_text("lastName", &self.last_name, None)?;
        check_email(&self.email)
    }
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

impl std::fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPatch")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl UserPatch {
    /// Access needed to apply this patch to `username`.
    ///
    /// Users may edit their own record, but changing `isAdmin` is admin-only.
    pub fn required_access(&self, username: &str) -> Access {
        match self.is_admin {
            Some(_) => Access::Admin,
            None => Access::SelfOrAdmin(username.to_string()),
        }
    }

    /// Payload with `password` already replaced by its hash.
    pub fn into_payload(self, hasher: &PasswordHasher) -> StoreResult<Payload> {
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        let password = match self.password {
            Some(password) => {
                require_text("password", &password, None)?;
                Some(hasher.hash(&password)?)
            }
            None => None,
        };

        let mut payload = Payload::new();
        payload
            .set_opt("firstName", self.first_name)
            .set_opt("lastName", self.last_name)
            .set_opt("password", password)
            .set_opt("email", self.email)
            .set_opt("isAdmin", self.is_admin);
        Ok(payload)
    }
}

impl User {
    /// Register a user. `Duplicate` when the username is taken.
    pub async fn register(
        conn: &impl GenericClient,
        hasher: &PasswordHasher,
        data: NewUser,
    ) -> StoreResult<User> {
        data.validate()?;

        if exists(
            conn,
            "user.register.duplicate_check",
            "SELECT username FROM users WHERE username = $1",
            &[&data.username],
        )
        .await?
        {
            return Err(StoreError::duplicate(format!(
                "Duplicate username: {}",
                data.username
            )));
        }

        let hashed = hasher.hash(&data.password)?;
        let row = conn
            .query_one_tagged(
                "user.register",
                &format!(
                    "INSERT INTO users (username, password, first_name, last_name, email, is_admin) \
                     VALUES ($1, $2, $3, $4, $5, $6) RETURNING {SELECT_COLUMNS}"
                ),
                &[
                    &data.username,
                    &hashed,
                    &data.first_name,
                    &data.last_name,
                    &data.email,
                    &data.is_admin,
                ],
                "user insert returned no row",
            )
            .await?;
        User::from_row(&row)
    }

    /// Check a username/password pair.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub async fn authenticate(
        conn: &impl GenericClient,
        hasher: &PasswordHasher,
        username: &str,
        password: &str,
    ) -> StoreResult<User> {
        let row = conn
            .query_opt_tagged(
                "user.authenticate",
                &format!("SELECT {SELECT_COLUMNS}, password FROM users WHERE username = $1"),
                &[&username],
            )
            .await?;

        if let Some(row) = row {
            let hash: String = row.try_get_column("password")?;
            if hasher.verify(password, &hash)? {
                return User::from_row(&row);
            }
        }

        Err(StoreError::unauthorized("Invalid username/password"))
    }

    /// All users, ordered by username.
    pub async fn find_all(conn: &impl GenericClient) -> StoreResult<Vec<User>> {
        let rows = conn
            .query_tagged(
                "user.find_all",
                &format!("SELECT {SELECT_COLUMNS} FROM users ORDER BY username"),
                &[],
            )
            .await?;
        map_rows(&rows)
    }

    pub async fn get(conn: &impl GenericClient, username: &str) -> StoreResult<User> {
        let row = conn
            .query_one_tagged(
                "user.get",
                &format!("SELECT {SELECT_COLUMNS} FROM users WHERE username = $1"),
                &[&username],
                &format!("No user: {username}"),
            )
            .await?;
        User::from_row(&row)
    }

    /// Partial update; a supplied password is rehashed first.
    pub async fn update(
        conn: &impl GenericClient,
        hasher: &PasswordHasher,
        username: &str,
        patch: UserPatch,
    ) -> StoreResult<User> {
        let set = build_set_clause(&patch.into_payload(hasher)?, &COLUMNS)?;
        let row = keyed_update(
            conn,
            "user.update",
            KeyedTarget {
                table: "users",
                key_column: "username",
                returning: SELECT_COLUMNS,
            },
            &set,
            &username,
            &format!("No user: {username}"),
        )
        .await?;
        User::from_row(&row)
    }

    pub async fn remove(conn: &impl GenericClient, username: &str) -> StoreResult<()> {
        delete_by_key(
            conn,
            "user.remove",
            "DELETE FROM users WHERE username = $1",
            &username,
            &format!("No user: {username}"),
        )
        .await
    }
}
