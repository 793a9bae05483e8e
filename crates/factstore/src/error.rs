//! Error types for factstore

use thiserror::Error;

/// Result type alias for factstore operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error types for fragment building and entity operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update was requested with an empty payload
    #[error("No data supplied")]
    NoData,

    /// Lookup, update or delete matched no row
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness pre-check failed, or the insert hit a unique constraint
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Authorization gate or credential check failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Payload shape or value rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Password hashing or verification failed
    #[error("Password error: {0}")]
    Password(String),

    /// Token encoding failed
    #[error("Token error: {0}")]
    Token(String),

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Migration error
    #[cfg(feature = "migrate")]
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a duplicate error
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate(message.into())
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP-style status class for outer surfaces.
    ///
    /// Empty payloads, duplicates and rejected input are client errors (400),
    /// failed authorization is 401, unmatched keys are 404, everything else 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoData | Self::Duplicate(_) | Self::Validation(_) => 400,
            Self::ForeignKeyViolation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            _ => 500,
        }
    }

    /// Parse a tokio_postgres error into a more specific StoreError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::Duplicate(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<bcrypt::BcryptError> for StoreError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Password(err.to_string())
    }
}

#[cfg(feature = "migrate")]
impl From<refinery::Error> for StoreError {
    fn from(err: refinery::Error) -> Self {
        Self::Migration(err.to_string())
    }
}
