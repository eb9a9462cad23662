//! PostgreSQL dialect.

use chrono::NaiveDate;

use super::Dialect;

/// PostgreSQL dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgre"
    }

    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    fn blob_literal(&self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
        format!("'\\x{hex}'")
    }

    fn date_comparison(&self, column: &str, operator: &str, date: NaiveDate) -> String {
        format!("{column}::date {operator} '{}'", date.format("%Y-%m-%d"))
    }

    fn insert_suffix(&self, ignore: bool) -> &'static str {
        if ignore {
            " ON CONFLICT DO NOTHING"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_dialect() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.name(), "postgre");
        assert_eq!(dialect.identifier_quote(), '"');
        assert_eq!(dialect.bool_literal(true), "TRUE");
        assert_eq!(dialect.insert_keyword(true), "INSERT INTO");
        assert_eq!(dialect.insert_suffix(true), " ON CONFLICT DO NOTHING");
        assert!(!dialect.supports_natural_join());
        assert!(!dialect.supports_update_limit());
    }

    #[test]
    fn test_postgres_date_comparison() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 24).unwrap();
        assert_eq!(
            PostgresDialect::new().date_comparison("created_at", ">=", date),
            "created_at::date >= '2024-03-24'"
        );
    }

    #[test]
    fn test_postgres_upsert_clause() {
        let clause = PostgresDialect::new()
            .upsert_clause(&[String::from("id")], &[String::from("name")]);
        assert_eq!(clause, " ON CONFLICT (id) DO UPDATE SET name = excluded.name");
    }
}
