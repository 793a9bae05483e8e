//! Tokens, password hashing and the authorization gate.
//!
//! A token carries [`Claims`] signed with HS256. An absent or invalid token
//! is not an error: the caller is simply anonymous, and [`authorize`]
//! decides whether anonymous access is enough for the operation.

use crate::error::{StoreError, StoreResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub username: String,
    pub is_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(username: impl Into<String>, is_admin: bool, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            username: username.into(),
            is_admin,
            iat: now.timestamp(),
            exp: (now + Duration::hours(ttl_hours)).timestamp(),
        }
    }
}

/// Sign `claims` with `secret`.
pub fn create_token(secret: &str, claims: &Claims) -> StoreResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| StoreError::Token(e.to_string()))
}

/// Verify a token. Bad signatures, expired and malformed tokens yield `None`.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            tracing::debug!(target: "factstore.auth", error = %e, "ignoring invalid token");
            None
        }
    }
}

/// Strip a `Bearer ` (or `bearer `) prefix from an Authorization header value.
pub fn bearer_token(header: &str) -> &str {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}

/// Claims from an optional Authorization header; `None` when anonymous.
pub fn authenticate_header(secret: &str, header: Option<&str>) -> Option<Claims> {
    header.and_then(|h| verify_token(secret, bearer_token(h)))
}

/// Access level an operation requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    LoggedIn,
    /// The named user, or any admin.
    SelfOrAdmin(String),
    Admin,
}

/// Check `claims` against `access`.
pub fn authorize(access: &Access, claims: Option<&Claims>) -> StoreResult<()> {
    let allowed = match (access, claims) {
        (Access::Anonymous, _) => true,
        (_, None) => false,
        (Access::LoggedIn, Some(c)) => !c.username.is_empty(),
        (Access::Admin, Some(c)) => c.is_admin,
        (Access::SelfOrAdmin(username), Some(c)) => c.is_admin || c.username == *username,
    };

    if allowed {
        Ok(())
    } else {
        Err(StoreError::unauthorized(match access {
            Access::Admin => "admin required".to_string(),
            Access::SelfOrAdmin(username) => format!("must be {username} or an admin"),
            _ => "login required".to_string(),
        }))
    }
}

/// bcrypt at a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    work_factor: u32,
}

impl PasswordHasher {
    pub fn new(work_factor: u32) -> Self {
        Self { work_factor }
    }

    pub fn work_factor(&self) -> u32 {
        self.work_factor
    }

    pub fn hash(&self, password: &str) -> StoreResult<String> {
        Ok(bcrypt::hash(password, self.work_factor)?)
    }

    pub fn verify(&self, password: &str, hash: &str) -> StoreResult<bool> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "secret-dev";

    fn claims(username: &str, is_admin: bool) -> Claims {
        Claims::new(username, is_admin, 1)
    }

    #[test]
    fn token_round_trip() {
        let c = claims("u1", true);
        let token = create_token(SECRET, &c).unwrap();
        assert_eq!(verify_token(SECRET, &token), Some(c));
    }

    #[test]
    fn wrong_secret_is_anonymous() {
        let token = create_token(SECRET, &claims("u1", false)).unwrap();
        assert_eq!(verify_token("other", &token), None);
        assert_eq!(verify_token(SECRET, "not.a.token"), None);
    }

    #[test]
    fn expired_token_is_anonymous() {
        let mut c = claims("u1", false);
        c.exp = Utc::now().timestamp() - 3600;
        let token = create_token(SECRET, &c).unwrap();
        assert_eq!(verify_token(SECRET, &token), None);
    }

    #[test]
    fn claims_use_camel_case() {
        let json = serde_json::to_value(claims("u1", true)).unwrap();
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["username"], "u1");
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token("Bearer abc "), "abc");
        assert_eq!(bearer_token("bearer abc"), "abc");
        assert_eq!(bearer_token("abc"), "abc");

        let token = create_token(SECRET, &claims("u1", false)).unwrap();
        let header = format!("Bearer {token}");
        assert_eq!(
            authenticate_header(SECRET, Some(&header)).map(|c| c.username),
            Some("u1".to_string())
        );
        assert_eq!(authenticate_header(SECRET, None), None);
    }

    #[test]
    fn gate_truth_table() {
        let user = claims("u1", false);
        let other = claims("u2", false);
        let admin = claims("boss", true);
        let self_u1 = Access::SelfOrAdmin("u1".into());

        assert!(authorize(&Access::Anonymous, None).is_ok());

        assert!(authorize(&Access::LoggedIn, None).is_err());
        assert!(authorize(&Access::LoggedIn, Some(&user)).is_ok());

        assert!(authorize(&Access::Admin, None).is_err());
        assert!(authorize(&Access::Admin, Some(&user)).is_err());
        assert!(authorize(&Access::Admin, Some(&admin)).is_ok());

        assert!(authorize(&self_u1, None).is_err());
        assert!(authorize(&self_u1, Some(&user)).is_ok());
        assert!(authorize(&self_u1, Some(&other)).is_err());
        assert!(authorize(&self_u1, Some(&admin)).is_ok());
    }

    #[test]
    fn gate_failure_is_unauthorized() {
        let err = authorize(&Access::Admin, None).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn password_hash_verifies() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("password1").unwrap();
        assert_ne!(hash, "password1");
        assert!(hasher.verify("password1", &hash).unwrap());
        assert!(!hasher.verify("password2", &hash).unwrap());
    }

    #[test]
    fn invalid_cost_is_a_password_error() {
        let err = PasswordHasher::new(1).hash("x").unwrap_err();
        assert!(matches!(err, StoreError::Password(_)));
    }
}
