//! ORDER BY and GROUP BY.

use super::{Builder, IntoColumns};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `ASC`
    Asc,
    /// `DESC`
    Desc,
    /// The dialect's random function; the column is ignored.
    Random,
}

impl Direction {
    /// Parses a direction token, ignoring case. Unknown tokens sort ascending.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" => Self::Desc,
            "random" | "rand" | "rand()" | "random()" => Self::Random,
            _ => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTerm {
    Column { column: String, direction: Direction },
    Random,
}

impl<'c> Builder<'c> {
    /// Adds an ORDER BY term. `direction` is `"ASC"`, `"DESC"` or
    /// `"random"`, in any case.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: &str) -> Self {
        let term = match Direction::parse(direction) {
            Direction::Random => OrderTerm::Random,
            direction => OrderTerm::Column {
                column: column.trim().to_string(),
                direction,
            },
        };
        self.orders.push(term);
        self
    }

    /// Sorts ascending on a column.
    #[must_use]
    pub fn sort_asc(self, column: &str) -> Self {
        self.order_by(column, "ASC")
    }

    /// Sorts descending on a column.
    #[must_use]
    pub fn sort_desc(self, column: &str) -> Self {
        self.order_by(column, "DESC")
    }

    /// Sorts in random order.
    #[must_use]
    pub fn sort_rand(mut self) -> Self {
        self.orders.push(OrderTerm::Random);
        self
    }

    /// Adds GROUP BY columns.
    #[must_use]
    pub fn group_by(mut self, columns: impl IntoColumns) -> Self {
        self.groups.extend(columns.into_columns());
        self
    }

    pub(crate) fn render_orders(&self) -> String {
        self.orders
            .iter()
            .map(|term| match term {
                OrderTerm::Column { column, direction } => {
                    let keyword = if *direction == Direction::Desc { "DESC" } else { "ASC" };
                    format!("{} {keyword}", self.resolve_column(column))
                }
                OrderTerm::Random => self.conn.dialect().random_function().to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn render_groups(&self) -> String {
        self.groups
            .iter()
            .map(|column| self.resolve_column(column))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, Driver};
    use crate::connection::Connection;

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("desc"), Direction::Desc);
        assert_eq!(Direction::parse("DESC"), Direction::Desc);
        assert_eq!(Direction::parse("Random"), Direction::Random);
        assert_eq!(Direction::parse("rand"), Direction::Random);
        assert_eq!(Direction::parse("asc"), Direction::Asc);
        assert_eq!(Direction::parse("sideways"), Direction::Asc);
    }

    #[test]
    fn test_random_per_dialect() {
        let mysql = Connection::new(ConnectionConfig::new(Driver::MySql));
        assert_eq!(mysql.table("t").sort_rand().sql(), "SELECT * FROM t ORDER BY RAND()");
        let sqlite = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        assert_eq!(sqlite.table("t").sort_rand().sql(), "SELECT * FROM t ORDER BY RANDOM()");
    }

    #[test]
    fn test_multiple_terms_and_groups() {
        let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        let sql = conn
            .builder()
            .from("users u")
            .group_by("users.country, u.city")
            .sort_desc("users.created_at")
            .sort_asc("name")
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users As u GROUP BY u.country, u.city ORDER BY u.created_at DESC, name ASC"
        );
    }
}
