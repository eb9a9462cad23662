//! SQLite dialect.

use chrono::NaiveDate;

use super::Dialect;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn identifier_quote(&self) -> char {
        '"' // SQLite also accepts backticks, but double quotes are standard
    }

    fn like_escape_clause(&self, escape_char: char) -> String {
        // LIKE has no default escape character in SQLite
        format!(" ESCAPE '{escape_char}'")
    }

    fn date_comparison(&self, column: &str, operator: &str, date: NaiveDate) -> String {
        format!(
            "strftime('%Y-%m-%d', {column}) {operator} cast({} as text)",
            date.format("%Y-%m-%d")
        )
    }

    fn insert_keyword(&self, ignore: bool) -> &'static str {
        if ignore {
            "INSERT OR IGNORE INTO"
        } else {
            "INSERT INTO"
        }
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(n), Some(m)) if m > 0 => format!(" LIMIT {n} OFFSET {m}"),
            (Some(n), _) => format!(" LIMIT {n}"),
            (None, Some(m)) if m > 0 => format!(" LIMIT -1 OFFSET {m}"),
            _ => String::new(),
        }
    }

    fn supports_right_join(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_dialect() {
        let dialect = SqliteDialect::new();
        assert_eq!(dialect.name(), "sqlite");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.random_function(), "RANDOM()");
        assert_eq!(dialect.insert_keyword(true), "INSERT OR IGNORE INTO");
        assert!(!dialect.supports_natural_join());
        assert!(!dialect.supports_delete_limit());
    }

    #[test]
    fn test_sqlite_date_comparison() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 24).unwrap();
        assert_eq!(
            SqliteDialect::new().date_comparison("created_at", "=", date),
            "strftime('%Y-%m-%d', created_at) = cast(2024-03-24 as text)"
        );
    }

    #[test]
    fn test_sqlite_like_escape() {
        assert_eq!(SqliteDialect::new().like_escape_clause('\\'), " ESCAPE '\\'");
    }
}
