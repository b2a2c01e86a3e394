//! Connection settings for the round store.

use std::fmt;
use std::time::Duration;

use crate::error::{PostgresError, Result};

/// How a [`PostgresRoundStore`](crate::PostgresRoundStore) reaches its database.
///
/// The URL is kept private so it only leaves this type redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    url: String,
    /// Upper bound on pooled connections.
    pub pool_size: u32,
    /// How long a query may wait for a free connection.
    pub acquire_timeout: Duration,
    /// Idle connections are closed after this long.
    pub idle_timeout: Option<Duration>,
    /// Apply the embedded `oracle_rounds` schema when connecting.
    pub run_migrations: bool,
}

impl PostgresConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 10,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(300)),
            run_migrations: true,
        }
    }

    #[must_use]
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Connect to a database whose schema is managed elsewhere.
    #[must_use]
    pub fn without_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// The connection URL with any password replaced by `***`.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => self.url.clone(),
        }
    }

    /// Rejects settings no pool could be built from.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(PostgresError::config(format!(
                "expected a postgres:// URL, got {}",
                self.redacted_url()
            )));
        }
        if self.pool_size == 0 {
            return Err(PostgresError::config("pool_size must be greater than 0"));
        }
        if self.acquire_timeout.is_zero() {
            return Err(PostgresError::config("acquire_timeout must be non-zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &self.redacted_url())
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_never_leaves_the_config() {
        let config = PostgresConfig::new("postgres://feed:hunter2@db:5432/rounds");
        assert_eq!(config.redacted_url(), "postgres://feed:***@db:5432/rounds");
        assert!(!format!("{config:?}").contains("hunter2"));

        let no_password = PostgresConfig::new("postgres://feed@db/rounds");
        assert_eq!(no_password.redacted_url(), "postgres://feed@db/rounds");
    }

    #[test]
    fn validation() {
        assert!(PostgresConfig::new("postgresql://localhost/pricefeed").validate().is_ok());

        let not_postgres = PostgresConfig::new("mysql://localhost/pricefeed");
        assert!(matches!(not_postgres.validate(), Err(PostgresError::Config { .. })));

        let empty_pool = PostgresConfig::new("postgres://localhost/pricefeed").with_pool_size(0);
        assert!(matches!(empty_pool.validate(), Err(PostgresError::Config { .. })));

        let no_wait = PostgresConfig::new("postgres://localhost/pricefeed")
            .with_acquire_timeout(Duration::ZERO);
        assert!(no_wait.validate().is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = PostgresConfig::new("postgres://localhost/pricefeed")
            .with_pool_size(2)
            .with_idle_timeout(None)
            .without_migrations();
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, None);
        assert!(!config.run_migrations);
    }
}
