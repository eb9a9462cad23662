//! Connection configuration.

use serde::Deserialize;

use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
use crate::error::Result;

/// Database driver a connection talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// MySQL / MariaDB.
    #[default]
    MySql,
    /// PostgreSQL.
    #[serde(alias = "postgres", alias = "postgresql", alias = "pgsql")]
    Postgre,
    /// SQLite 3.
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl Driver {
    /// Returns the dialect used to render SQL for this driver.
    #[must_use]
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::MySql => Box::new(MySqlDialect::new()),
            Self::Postgre => Box::new(PostgresDialect::new()),
            Self::Sqlite => Box::new(SqliteDialect::new()),
        }
    }
}

/// Settings of one connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Driver, which selects the dialect.
    pub driver: Driver,
    /// Database name or file path, informational for the builder.
    pub database: String,
    /// Prefix prepended to every table name.
    pub prefix: String,
    /// Raise on unsupported features instead of ignoring them.
    pub debug: bool,
    /// Give unaliased tables a generated `table_<token>` alias.
    pub hashed_aliases: bool,
    /// Quote identifiers in generated SQL.
    pub protect_identifiers: bool,
    /// Escape character for LIKE patterns.
    pub like_escape_char: char,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: Driver::default(),
            database: String::new(),
            prefix: String::new(),
            debug: false,
            hashed_aliases: false,
            protect_identifiers: false,
            like_escape_char: '\\',
        }
    }
}

impl ConnectionConfig {
    /// Creates a default configuration for a driver.
    #[must_use]
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Serialization`](crate::DatabaseError::Serialization)
    /// on malformed JSON or an unknown driver.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Sets the table prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Enables or disables generated aliases.
    #[must_use]
    pub const fn with_hashed_aliases(mut self, enabled: bool) -> Self {
        self.hashed_aliases = enabled;
        self
    }

    /// Enables or disables identifier quoting in generated SQL.
    #[must_use]
    pub const fn with_protect_identifiers(mut self, enabled: bool) -> Self {
        self.protect_identifiers = enabled;
        self
    }

    /// Sets the LIKE escape character.
    #[must_use]
    pub const fn with_like_escape_char(mut self, escape: char) -> Self {
        self.like_escape_char = escape;
        self
    }
}
