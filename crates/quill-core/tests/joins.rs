//! Tests for JOIN rendering with prefixes, generated aliases and the
//! different condition forms.

mod common;
use common::*;

use quill_core::{DatabaseError, Driver};
use regex::Regex;

#[test]
fn join_with_prefix_and_generated_alias() {
    let conn = hashed(Driver::MySql, "db_");
    let sql = conn
        .builder()
        .from("jobs")
        .join("users as u", [("u.id", "jobs.id")])
        .sql();

    let re = Regex::new(
        r"^SELECT \* FROM db_jobs As (jobs_\w+) INNER JOIN db_users As u ON u\.id = (jobs_\w+)\.id$",
    )
    .unwrap();
    let caps = re.captures(&sql).unwrap_or_else(|| panic!("unexpected SQL: {sql}"));
    assert_eq!(&caps[1], &caps[2]);
}

#[test]
fn generated_alias_is_stable_across_builders() {
    let conn = hashed(Driver::Sqlite, "");
    let first = conn.builder().from("jobs").sql();
    let second = conn.table("jobs").sql();
    assert_eq!(first, second);

    let alias = conn.get_table_alias("jobs").0;
    assert!(Regex::new(r"^jobs_[a-z0-9]+$").unwrap().is_match(&alias));
    assert_eq!(first, format!("SELECT * FROM jobs As {alias}"));
}

#[test]
fn explicit_aliases_are_not_suffixed() {
    let conn = hashed(Driver::MySql, "db_");
    let sql = conn.builder().from("db_users u").join("jobs j", "user_id").sql();
    assert_eq!(
        sql,
        "SELECT * FROM db_users As u INNER JOIN db_jobs As j ON u.user_id = j.user_id"
    );
}

#[test]
fn join_conditions_with_prefix() {
    let conn = quill_core::Connection::new(
        quill_core::ConnectionConfig::new(Driver::Sqlite).with_prefix("app_"),
    );
    let sql = conn
        .builder()
        .from("jobs")
        .left_join("users", [("users.id", "jobs.user_id")])
        .sql();
    assert_eq!(
        sql,
        "SELECT * FROM app_jobs LEFT JOIN app_users ON app_users.id = app_jobs.user_id"
    );
}

#[test]
fn join_then_where_on_joined_alias() {
    let conn = postgres();
    let sql = conn
        .builder()
        .from("orders o")
        .join("customers c", "c.id = o.customer_id")
        .where_("customers.country", "NL")
        .sort_desc("orders.total")
        .sql();
    assert_eq!(
        sql,
        "SELECT * FROM orders As o INNER JOIN customers As c ON c.id = o.customer_id WHERE c.country = 'NL' ORDER BY o.total DESC"
    );
}

#[test]
fn unsupported_joins_in_debug_mode() {
    let conn = quill_core::Connection::new(
        quill_core::ConnectionConfig::new(Driver::Sqlite).with_debug(true),
    );
    let err = conn.builder().from("a").natural_join("b").unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::Unsupported {
            feature: "NATURAL JOIN",
            dialect: "sqlite"
        }
    ));
    assert!(err
        .to_string()
        .starts_with("This feature is not available for the database you are using"));
}
