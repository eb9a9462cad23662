//! MySQL dialect.

use chrono::NaiveDate;

use super::Dialect;

/// MySQL dialect.
///
/// Quotes identifiers with backticks, treats backslash as an escape
/// character inside literals and is the only dialect with NATURAL JOIN
/// and LIMIT on UPDATE/DELETE.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn escape_string(&self, value: &str) -> String {
        value
            .replace('\0', "")
            .replace('\\', "\\\\")
            .replace('\'', "''")
    }

    fn date_comparison(&self, column: &str, operator: &str, date: NaiveDate) -> String {
        format!("DATE({column}) {operator} '{}'", date.format("%Y-%m-%d"))
    }

    fn random_function(&self) -> &'static str {
        "RAND()"
    }

    fn insert_keyword(&self, ignore: bool) -> &'static str {
        if ignore {
            "INSERT IGNORE INTO"
        } else {
            "INSERT INTO"
        }
    }

    fn upsert_clause(&self, unique_by: &[String], update: &[String]) -> String {
        let sets: Vec<String> = update.iter().map(|c| format!("{c} = VALUES({c})")).collect();
        match (sets.is_empty(), unique_by.first()) {
            (false, _) => format!(" ON DUPLICATE KEY UPDATE {}", sets.join(", ")),
            // Self-assignment is a no-op update, so a duplicate key is skipped.
            (true, Some(key)) => format!(" ON DUPLICATE KEY UPDATE {key} = {key}"),
            (true, None) => String::new(),
        }
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(n), Some(m)) if m > 0 => format!(" LIMIT {n} OFFSET {m}"),
            (Some(n), _) => format!(" LIMIT {n}"),
            // MySQL has no bare OFFSET; the documented idiom is the largest BIGINT UNSIGNED.
            (None, Some(m)) if m > 0 => format!(" LIMIT {} OFFSET {m}", u64::MAX),
            _ => String::new(),
        }
    }

    fn supports_natural_join(&self) -> bool {
        true
    }

    fn supports_update_limit(&self) -> bool {
        true
    }

    fn supports_delete_limit(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dialect() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.name(), "mysql");
        assert_eq!(dialect.identifier_quote(), '`');
        assert_eq!(dialect.escape_identifier("na`me"), "`na``me`");
        assert_eq!(dialect.random_function(), "RAND()");
        assert_eq!(dialect.insert_keyword(true), "INSERT IGNORE INTO");
        assert!(dialect.supports_natural_join());
        assert!(dialect.supports_delete_limit());
    }

    #[test]
    fn test_mysql_string_escaping() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.escape_string(r"C:\dir's"), r"C:\\dir''s");
    }

    #[test]
    fn test_mysql_date_comparison() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 24).unwrap();
        assert_eq!(
            MySqlDialect::new().date_comparison("created_at", "=", date),
            "DATE(created_at) = '2024-03-24'"
        );
    }

    #[test]
    fn test_mysql_upsert_with_only_key_columns() {
        let clause = MySqlDialect::new().upsert_clause(&[String::from("id")], &[]);
        assert_eq!(clause, " ON DUPLICATE KEY UPDATE id = id");
    }

    #[test]
    fn test_mysql_offset_only() {
        assert_eq!(
            MySqlDialect::new().limit_clause(None, Some(3)),
            " LIMIT 18446744073709551615 OFFSET 3"
        );
    }
}
