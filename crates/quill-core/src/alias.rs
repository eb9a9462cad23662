//! Table name and alias resolution.
//!
//! A connection keeps one [`AliasRegistry`] for its whole lifetime, so a
//! table always resolves to the same alias no matter which builder asks.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

static AS_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\S+)\s+as(?:\s+(\S+))?$").expect("valid table alias regex")
});

/// A resolved table reference.
///
/// `table` never carries the connection prefix; it is added at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Unprefixed table name.
    pub table: String,
    /// Alias, equal to `table` when the table is not renamed.
    pub alias: String,
}

impl TableRef {
    /// Creates a reference.
    #[must_use]
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
        }
    }

    /// Returns whether the table is renamed.
    #[must_use]
    pub fn has_alias(&self) -> bool {
        self.alias != self.table
    }
}

/// Table-to-alias mappings of one connection.
#[derive(Debug, Default, Clone)]
pub struct AliasRegistry {
    aliases: HashMap<String, String>,
}

impl AliasRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `table`, `table alias`, `table AS alias` into a [`TableRef`].
    ///
    /// Explicit aliases always win and replace any cached mapping. Without
    /// one, a cached alias is reused; otherwise `hashed` decides between a
    /// generated `table_<token>` alias and no rename at all.
    pub fn resolve(&mut self, input: &str, prefix: &str, hashed: bool) -> TableRef {
        let input = input.trim();

        if let Some(caps) = AS_FORM.captures(input) {
            let table = strip_prefix(&caps[1], prefix);
            return match caps.get(2) {
                Some(alias) => self.explicit(table, alias.as_str()),
                None => self.implicit(table, hashed),
            };
        }

        let tokens: Vec<&str> = input.split_whitespace().collect();
        if let [table, alias] = tokens.as_slice() {
            return self.explicit(strip_prefix(table, prefix), alias);
        }

        self.implicit(strip_prefix(input, prefix), hashed)
    }

    fn explicit(&mut self, table: &str, alias: &str) -> TableRef {
        if alias != table {
            self.aliases.insert(table.to_string(), alias.to_string());
        }
        TableRef::new(table, alias)
    }

    fn implicit(&mut self, table: &str, hashed: bool) -> TableRef {
        if let Some(alias) = self.aliases.get(table) {
            return TableRef::new(table, alias.clone());
        }
        if !hashed {
            return TableRef::new(table, table);
        }

        let alias = format!("{table}_{}", unique_token());
        trace!(table, alias = %alias, "generated table alias");
        self.aliases.insert(table.to_string(), alias.clone());
        TableRef::new(table, alias)
    }

    /// Returns the cached alias of a table.
    #[must_use]
    pub fn alias_of(&self, table: &str) -> Option<&str> {
        self.aliases.get(table).map(String::as_str)
    }

    /// Returns the table an alias stands for.
    #[must_use]
    pub fn table_of(&self, alias: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, a)| *a == alias)
            .map(|(t, _)| t.as_str())
    }

    /// Returns whether `name` is a registered alias.
    #[must_use]
    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.values().any(|a| a == name)
    }

    /// Registers a mapping, replacing any previous alias of the table.
    pub fn set(&mut self, table: impl Into<String>, alias: impl Into<String>) {
        let table = table.into();
        let alias = alias.into();
        if alias != table {
            self.aliases.insert(table, alias);
        }
    }

    /// Forgets every mapping.
    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    /// Returns the number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns whether no mapping is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Removes the connection prefix from a table name, if present.
#[must_use]
pub fn strip_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return name;
    }
    match name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    }
}

/// Returns a short lowercase alphanumeric token, unique for practical purposes.
fn unique_token() -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut n: u64 = rand::random();
    let mut token = Vec::with_capacity(13);
    loop {
        #[allow(clippy::cast_possible_truncation)]
        token.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    token.reverse();
    String::from_utf8(token).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_aliases() {
        let mut reg = AliasRegistry::new();
        assert_eq!(reg.resolve("users u", "", true), TableRef::new("users", "u"));
        assert_eq!(reg.resolve("jobs AS j", "", true), TableRef::new("jobs", "j"));
        assert_eq!(reg.resolve("posts as p", "", true), TableRef::new("posts", "p"));
        assert_eq!(reg.alias_of("users"), Some("u"));
        assert_eq!(reg.table_of("j"), Some("jobs"));
    }

    #[test]
    fn test_unaliased_without_hashing() {
        let mut reg = AliasRegistry::new();
        let t = reg.resolve("users", "", false);
        assert_eq!(t, TableRef::new("users", "users"));
        assert!(!t.has_alias());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_hashed_alias_is_stable() {
        let mut reg = AliasRegistry::new();
        let first = reg.resolve("jobs", "", true);
        let second = reg.resolve("jobs", "", true);
        assert_eq!(first, second);
        assert!(first.alias.starts_with("jobs_"));
        assert!(first.alias["jobs_".len()..]
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_dangling_as_falls_back_to_implicit() {
        let mut reg = AliasRegistry::new();
        assert_eq!(reg.resolve("users as", "", false), TableRef::new("users", "users"));
        reg.resolve("users u", "", false);
        assert_eq!(reg.resolve("users AS", "", false), TableRef::new("users", "u"));
    }

    #[test]
    fn test_prefix_is_stripped() {
        let mut reg = AliasRegistry::new();
        assert_eq!(reg.resolve("db_users u", "db_", false), TableRef::new("users", "u"));
        assert_eq!(reg.resolve("db_jobs", "db_", false), TableRef::new("jobs", "jobs"));
        assert_eq!(strip_prefix("db_", "db_"), "db_");
    }

    #[test]
    fn test_cached_alias_reused() {
        let mut reg = AliasRegistry::new();
        reg.resolve("users u", "", false);
        assert_eq!(reg.resolve("users", "", true), TableRef::new("users", "u"));
    }

    #[test]
    fn test_unique_tokens_differ() {
        assert_ne!(unique_token(), unique_token());
    }
}
