//! Runtime configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. built-in defaults,
//! 2. an optional `factstore.toml` (string values may reference `${VAR}`),
//! 3. environment variables (`.env` is loaded first via `dotenvy`):
//!    `DATABASE_URL`, `DATABASE_URL_TEST`, `SECRET_KEY`, `FACTSTORE_ENV`,
//!    `BCRYPT_WORK_FACTOR`, `RUST_LOG`.
//!
//! ```toml
//! env = "development"
//!
//! [database]
//! url = "postgres://${PGUSER}@localhost/factchecker"
//! test_url = "postgres://${PGUSER}@localhost/factchecker_test"
//!
//! [auth]
//! secret_key = "${SECRET_KEY}"
//!
//! [logging]
//! level = "info,factstore.sql=debug"
//! json = false
//! slow_query_ms = 250
//! ```

use crate::error::{StoreError, StoreResult};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "factstore.toml";

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/factchecker";
const DEFAULT_SECRET_KEY: &str = "secret-dev";

/// bcrypt refuses costs below 4; tests use the cheapest one.
const TEST_WORK_FACTOR: u32 = 4;
const DEFAULT_WORK_FACTOR: u32 = 12;

/// Which database and hashing cost the process runs with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            "production" | "prod" => Ok(Self::Production),
            other => Err(StoreError::Config(format!("unknown environment: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub env: Environment,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub test_url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            test_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub secret_key: String,
    /// Overrides the per-environment default when set.
    pub bcrypt_work_factor: Option<u32>,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            bcrypt_work_factor: None,
            token_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub level: String,
    pub json: bool,
    pub slow_query_ms: Option<u64>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            slow_query_ms: None,
        }
    }
}

impl StoreConfig {
    /// Load `.env`, the config file and environment overrides.
    ///
    /// With `path = None`, [`DEFAULT_CONFIG_FILE`] is used if present and
    /// defaults otherwise. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> StoreResult<Self> {
        let _ = dotenvy::dotenv();

        let raw = match path {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
                StoreError::Config(format!("failed to read config file {}: {e}", path.display()))
            })?),
            None => std::fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
        };

        let lookup = |key: &str| std::env::var(key).ok();
        let mut config = match raw {
            Some(raw) => Self::from_toml_str(&raw, lookup)?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, expanding `${VAR}` references through `lookup`.
    pub fn from_toml_str(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let mut config: StoreConfig = toml::from_str(raw)
            .map_err(|e| StoreError::Config(format!("failed to parse config: {e}")))?;
        config.expand_env(&lookup)?;
        Ok(config)
    }

    fn expand_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> StoreResult<()> {
        self.database.url = expand_env_vars(&self.database.url, lookup)?;
        if let Some(url) = self.database.test_url.as_mut() {
            *url = expand_env_vars(url, lookup)?;
        }
        self.auth.secret_key = expand_env_vars(&self.auth.secret_key, lookup)?;
        self.logging.level = expand_env_vars(&self.logging.level, lookup)?;
        Ok(())
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> StoreResult<()> {
        if let Some(env) = lookup("FACTSTORE_ENV") {
            self.env = env.parse()?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(url) = lookup("DATABASE_URL_TEST") {
            self.database.test_url = Some(url);
        }
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(factor) = lookup("BCRYPT_WORK_FACTOR") {
            let factor = factor.trim().parse::<u32>().map_err(|_| {
                StoreError::Config(format!("BCRYPT_WORK_FACTOR is not a number: {factor}"))
            })?;
            self.auth.bcrypt_work_factor = Some(factor);
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    fn validate(&self) -> StoreResult<()> {
        if let Some(factor) = self.auth.bcrypt_work_factor
            && !(4..=31).contains(&factor)
        {
            return Err(StoreError::Config(format!(
                "bcrypt work factor must be between 4 and 31, got {factor}"
            )));
        }
        if self.auth.secret_key.is_empty() {
            return Err(StoreError::Config("secret key must not be empty".to_string()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(StoreError::Config("token_ttl_hours must be positive".to_string()));
        }
        Ok(())
    }

    /// Connection URL for the configured environment.
    ///
    /// The test environment only ever uses the test database.
    pub fn database_url(&self) -> StoreResult<&str> {
        match self.env {
            Environment::Test => self
                .database
                .test_url
                .as_deref()
                .ok_or_else(|| StoreError::Config("DATABASE_URL_TEST is not set".to_string())),
            _ => Ok(&self.database.url),
        }
    }

    pub fn bcrypt_work_factor(&self) -> u32 {
        self.auth.bcrypt_work_factor.unwrap_or(match self.env {
            Environment::Test => TEST_WORK_FACTOR,
            _ => DEFAULT_WORK_FACTOR,
        })
    }

    pub fn slow_query_threshold(&self) -> Option<Duration> {
        self.logging.slow_query_ms.map(Duration::from_millis)
    }
}

fn expand_env_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> StoreResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                return Err(StoreError::Config(format!(
                    "unterminated env var reference: ${{{key}"
                )));
            }
            if key.is_empty() {
                return Err(StoreError::Config("invalid env var reference: ${}".to_string()));
            }

            let value = lookup(&key).ok_or_else(|| {
                StoreError::Config(format!("missing env var for config expansion: {key}"))
            })?;
            out.push_str(&value);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_development() {
        let config = StoreConfig::default();
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.database_url().unwrap(), DEFAULT_DATABASE_URL);
        assert_eq!(config.bcrypt_work_factor(), 12);
        assert_eq!(config.auth.secret_key, "secret-dev");
    }

    #[test]
    fn test_env_uses_test_database_and_cheap_hashing() {
        let mut config = StoreConfig::default();
        config
            .apply_env(vars(&[
                ("FACTSTORE_ENV", "test"),
                ("DATABASE_URL", "postgres://localhost/prod"),
                ("DATABASE_URL_TEST", "postgres://localhost/factchecker_test"),
            ]))
            .unwrap();

        assert_eq!(config.database_url().unwrap(), "postgres://localhost/factchecker_test");
        assert_eq!(config.bcrypt_work_factor(), 4);
    }

    #[test]
    fn test_env_without_test_url_is_an_error() {
        let mut config = StoreConfig::default();
        config.apply_env(vars(&[("FACTSTORE_ENV", "test")])).unwrap();
        assert!(matches!(config.database_url(), Err(StoreError::Config(_))));
    }

    #[test]
    fn file_values_expand_env_references() {
        let raw = r#"
            env = "production"

            [database]
            url = "postgres://${PGUSER}@db/factchecker"

            [auth]
            secret_key = "${APP_SECRET}"
            bcrypt_work_factor = 10
        "#;
        let config =
            StoreConfig::from_toml_str(raw, vars(&[("PGUSER", "fc"), ("APP_SECRET", "s3")])).unwrap();

        assert_eq!(config.env, Environment::Production);
        assert_eq!(config.database_url().unwrap(), "postgres://fc@db/factchecker");
        assert_eq!(config.auth.secret_key, "s3");
        assert_eq!(config.bcrypt_work_factor(), 10);
    }

    #[test]
    fn environment_beats_file() {
        let raw = r#"
            [auth]
            secret_key = "from-file"
        "#;
        let mut config = StoreConfig::from_toml_str(raw, vars(&[])).unwrap();
        config
            .apply_env(vars(&[("SECRET_KEY", "from-env"), ("BCRYPT_WORK_FACTOR", "6")]))
            .unwrap();

        assert_eq!(config.auth.secret_key, "from-env");
        assert_eq!(config.bcrypt_work_factor(), 6);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let raw = r#"
            [database]
            url = "${NOPE}"
        "#;
        let err = StoreConfig::from_toml_str(raw, vars(&[])).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[test]
    fn unterminated_reference_is_an_error() {
        assert!(expand_env_vars("${OPEN", &vars(&[("OPEN", "x")])).is_err());
        assert!(expand_env_vars("${}", &vars(&[])).is_err());
        assert_eq!(expand_env_vars("$HOME/x", &vars(&[])).unwrap(), "$HOME/x");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = r#"
            [database]
            uri = "postgres://x"
        "#;
        assert!(StoreConfig::from_toml_str(raw, vars(&[])).is_err());
    }

    #[test]
    fn out_of_range_work_factor_fails_validation() {
        let mut config = StoreConfig::default();
        config.apply_env(vars(&[("BCRYPT_WORK_FACTOR", "1")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_environment_name() {
        assert!("staging".parse::<Environment>().is_err());
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Test);
    }
}
