use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::connection::Execution;
use crate::syntax::Syntax;
use crate::testing::{names, rows, stub_connection};

fn respond(sql: &str) -> DbResult<Execution> {
    Ok(match sql {
        r#"PrimaryKey("users")"# => names(&["id"]),
        r#"Fields("users")"# => names(&["id", "name", "age"]),
        r#"AutoincrementKey("users")"# => names(&["id"]),
        r#"PrimaryKey("notes")"# => names(&["code"]),
        r#"Fields("notes")"# => names(&["code", "body"]),
        r#"AutoincrementKey("notes")"# => names(&[]),
        r#"PrimaryKey("dups")"# => names(&["id"]),
        r#"Fields("dups")"# => names(&["id"]),
        r#"PrimaryKey("audit")"# => names(&[]),
        r#"Fields("memberships")"# => names(&["user_id", "group_id", "role"]),
        "SELECT * FROM `users` WHERE `id` = 1 LIMIT 2;" => rows(
            &["id", "name", "age"],
            &[&[Value::from(1), Value::from("Ada"), Value::from(25)]],
        ),
        "SELECT * FROM `users` WHERE `id` = 42 LIMIT 2;" => rows(
            &["id", "name", "age"],
            &[&[Value::from(42), Value::from("O'Brien"), Value::Null]],
        ),
        "SELECT * FROM `dups` WHERE `id` = 7 LIMIT 2;" => {
            rows(&["id"], &[&[Value::from(7)], &[Value::from(7)]])
        }
        s if s.starts_with("SELECT") => rows(&["id", "name", "age"], &[]),
        s if s.starts_with("INSERT") => Execution::InsertId { id: 42, affected: 1 },
        _ => Execution::Affected(1),
    })
}

fn db() -> (Connection, Rc<RefCell<Vec<String>>>) {
    stub_connection(Syntax::Mysql, respond)
}

fn count(log: &Rc<RefCell<Vec<String>>>, prefix: &str) -> usize {
    log.borrow().iter().filter(|s| s.starts_with(prefix)).count()
}

#[test]
fn construction_checks_cardinality() {
    let (conn, _) = db();

    let err = Record::new(conn.clone(), "users", vec![1.into(), 2.into()], None).unwrap_err();
    assert!(err.is_cardinality_mismatch());

    let err = Record::new(conn.clone(), "audit", vec![1.into()], None).unwrap_err();
    assert!(err.is_cardinality_mismatch());

    let err = Record::new(conn.clone(), "users", vec![], Some(vec![])).unwrap_err();
    assert!(err.is_cardinality_mismatch());

    let record = Record::new(conn, "users", vec![], None).unwrap();
    assert_eq!(record.state(), RecordState::Unbound);
    assert_eq!(record.columns(), ["id"]);
}

#[test]
fn bound_record_resolves_lazily() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    assert_eq!(user.state(), RecordState::BoundUnknown);
    assert_eq!(count(&log, "SELECT"), 0);

    assert_eq!(user.get("name").unwrap(), Value::from("Ada"));
    assert_eq!(user.state(), RecordState::BoundExists);
    assert!(user.exists().unwrap());
    assert_eq!(user.get("age").unwrap(), Value::from(25));
    assert_eq!(count(&log, "SELECT"), 1);

    user.reset_cache();
    assert_eq!(user.state(), RecordState::BoundUnknown);
    assert!(user.exists().unwrap());
    assert_eq!(count(&log, "SELECT"), 2);
}

#[test]
fn absent_row_falls_back_to_key_value() {
    let (conn, _) = db();
    let mut user = Record::bind(conn, "users", 99).unwrap();
    assert!(!user.exists().unwrap());
    assert_eq!(user.state(), RecordState::BoundAbsent);
    assert_eq!(user.get("id").unwrap(), Value::from(99));
    assert!(user.get("name").unwrap_err().is_undefined_field());
    assert!(!user.is_set("name").unwrap());
    assert_eq!(user.current_data().unwrap(), None);
}

#[test]
fn duplicate_binding_stays_fatal_until_reset() {
    let (conn, log) = db();
    let mut dup = Record::bind(conn, "dups", 7).unwrap();

    let err = dup.exists().unwrap_err();
    assert!(err.is_duplicate_key());
    assert_eq!(
        err.to_string(),
        "Multiple records in `dups` match active record binding `id` = 7"
    );
    assert_eq!(dup.state(), RecordState::BoundDuplicate);

    // Later reads fail the same way without going back to the database.
    assert!(dup.get("id").unwrap_err().is_duplicate_key());
    assert!(dup.exists().unwrap_err().is_duplicate_key());
    dup.set("name", "x");
    assert!(dup.update().unwrap_err().is_duplicate_key());
    assert!(dup.delete().unwrap_err().is_duplicate_key());
    assert_eq!(dup.state(), RecordState::BoundDuplicate);
    assert_eq!(count(&log, "SELECT"), 1);
    assert_eq!(count(&log, "UPDATE"), 0);
    assert_eq!(count(&log, "DELETE"), 0);

    dup.reset_cache();
    assert_eq!(dup.state(), RecordState::BoundUnknown);
    assert!(dup.exists().unwrap_err().is_duplicate_key());
    assert_eq!(count(&log, "SELECT"), 2);
}

#[test]
fn buffer_takes_precedence() {
    let (conn, _) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    assert_eq!(user.get("age").unwrap(), Value::from(25));

    user.set("age", 30);
    assert_eq!(user.get("age").unwrap(), Value::from(30));
    user.set("age", Value::Null);
    assert_eq!(user.get("age").unwrap(), Value::Null);

    let data = user.data().unwrap();
    assert_eq!(data.get("name"), Some(&Value::from("Ada")));
    assert_eq!(data.get("age"), Some(&Value::Null));
}

#[test]
fn create_issues_exact_insert_and_binds() {
    let (conn, log) = db();
    let mut user = Record::unbound(conn, "users").unwrap();
    user.set("name", "O'Brien");
    user.set("age", 36);
    user.create().unwrap();

    assert!(
        log.borrow()
            .contains(&"INSERT INTO `users` (`name`,`age`) VALUES (\"O\\'Brien\",36);".to_string())
    );
    assert_eq!(user.state(), RecordState::BoundExists);
    assert_eq!(user.key(), Some(&[Value::from(42)][..]));
    assert!(user.buffered().is_empty());

    // Values known from the insert need no query.
    let selects = count(&log, "SELECT");
    assert_eq!(user.get("id").unwrap(), Value::from(42));
    assert_eq!(user.get("name").unwrap(), Value::from("O'Brien"));
    assert_eq!(count(&log, "SELECT"), selects);

    // The full row is fetched on demand.
    let current = user.current_data().unwrap().unwrap();
    assert_eq!(current.get("age"), Some(&Value::Null));
    assert_eq!(count(&log, "SELECT"), selects + 1);
}

#[test]
fn create_rejects_unknown_fields_without_writing() {
    let (conn, log) = db();
    let mut user = Record::unbound(conn, "users").unwrap();
    user.set("name", "Ada");
    user.set("not_a_column", 1);

    let err = user.create().unwrap_err();
    assert!(matches!(
        &err,
        DbError::FieldNotAllowed { fields, .. } if fields == &["not_a_column".to_string()]
    ));
    assert_eq!(count(&log, "INSERT"), 0);
    assert_eq!(user.state(), RecordState::Unbound);
}

#[test]
fn insert_id_is_ignored_without_autoincrement_column() {
    let (conn, _) = db();
    let mut note = Record::unbound(conn, "notes").unwrap();
    note.set("code", "n1");
    note.set("body", "hello");
    note.create().unwrap();

    assert_eq!(note.key(), Some(&[Value::from("n1")][..]));
    let current = note.current.as_ref().unwrap();
    assert_eq!(current.len(), 2);
    assert!(!current.contains("id"));
}

#[test]
fn create_without_derivable_key_fails_before_writing() {
    let (conn, log) = db();
    let mut note = Record::unbound(conn, "notes").unwrap();
    note.set("body", "no code");
    assert!(note.create().unwrap_err().is_cardinality_mismatch());
    assert_eq!(count(&log, "INSERT"), 0);
}

#[test]
fn create_on_bound_record_is_invalid() {
    let (conn, _) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.set("name", "x");
    assert!(user.create().unwrap_err().is_invalid_state());
}

#[test]
fn update_issues_exact_statement_and_merges() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.set("name", "Grace");
    user.set("age", "NULL");
    user.update().unwrap();

    assert_eq!(
        log.borrow().last().map(String::as_str),
        Some("UPDATE `users` SET `name` = \"Grace\",`age` = NULL WHERE `id` = 1;")
    );
    assert!(user.buffered().is_empty());
    assert_eq!(user.get("name").unwrap(), Value::from("Grace"));
    assert_eq!(count(&log, "SELECT"), 1);
}

#[test]
fn update_with_empty_buffer_is_a_noop() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.update().unwrap();
    assert_eq!(count(&log, "UPDATE"), 0);
}

#[test]
fn update_moves_the_binding_with_key_columns() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.set("id", 5);
    user.update().unwrap();
    assert_eq!(user.key(), Some(&[Value::from(5)][..]));
    assert_eq!(user.key_predicate_sql().unwrap(), "`id` = 5");
    assert!(log.borrow().iter().any(|s| s == "UPDATE `users` SET `id` = 5 WHERE `id` = 1;"));
}

#[test]
fn update_and_delete_require_an_existing_row() {
    let (conn, _) = db();
    let mut absent = Record::bind(conn.clone(), "users", 99).unwrap();
    absent.set("name", "x");
    assert!(absent.update().unwrap_err().is_invalid_state());
    assert!(absent.delete().unwrap_err().is_invalid_state());

    let mut unbound = Record::unbound(conn, "users").unwrap();
    assert!(unbound.update().unwrap_err().is_invalid_state());
    assert!(unbound.delete().unwrap_err().is_invalid_state());
}

#[test]
fn delete_returns_to_unbound() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.set("name", "staged");
    user.delete().unwrap();

    assert_eq!(
        log.borrow().last().map(String::as_str),
        Some("DELETE FROM `users` WHERE `id` = 1;")
    );
    assert_eq!(user.state(), RecordState::Unbound);
    assert!(user.buffered().is_empty());
    assert_eq!(user.columns(), ["id"]);
    assert!(user.key_columns().unwrap_err().is_invalid_state());

    // Reusable for a fresh row.
    user.set("name", "again");
    user.create().unwrap();
    assert_eq!(user.key(), Some(&[Value::from(42)][..]));
}

#[test]
fn composite_key_skips_unconstrained_columns() {
    let (conn, _) = db();
    let columns = Some(vec!["user_id".to_string(), "group_id".to_string()]);
    let membership =
        Record::new(conn.clone(), "memberships", vec![1.into(), false.into()], columns.clone())
            .unwrap();
    assert_eq!(membership.key_predicate_sql().unwrap(), "`user_id` = 1");

    let keys = membership.key_columns().unwrap();
    assert_eq!(keys.get("group_id"), Some(&Value::Bool(false)));

    let open = Record::new(conn, "memberships", vec![false.into(), false.into()], columns).unwrap();
    assert!(open.key_predicate_sql().unwrap_err().is_invalid_state());
}

#[test]
fn load_validates_fields_and_skips_queries() {
    let (conn, log) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();

    let row: Row = [("id", Value::from(1)), ("nick", Value::from("a"))]
        .into_iter()
        .collect();
    let err = user
        .load(row, Some(&["id", "name", "age"][..]), None)
        .unwrap_err();
    assert!(err.is_field_not_allowed());

    let row: Row = [("id", Value::from(1))].into_iter().collect();
    let err = user.load(row, None, Some(&["id", "name"][..])).unwrap_err();
    assert!(matches!(err, DbError::MissingFields { ref fields } if fields == &["name".to_string()]));

    let row: Row = [("id", Value::from(1)), ("name", Value::from("Loaded"))]
        .into_iter()
        .collect();
    user.load(row, None, None).unwrap();
    assert_eq!(user.state(), RecordState::BoundExists);
    assert_eq!(user.get("name").unwrap(), Value::from("Loaded"));
    assert_eq!(count(&log, "SELECT"), 0);
}

#[test]
fn json_export_merges_buffer() {
    let (conn, _) = db();
    let mut user = Record::bind(conn, "users", 1).unwrap();
    user.set("age", 26);
    let json = user.to_json().unwrap();
    assert_eq!(json["name"], serde_json::json!("Ada"));
    assert_eq!(json["age"], serde_json::json!(26));
}

#[test]
fn unbound_record_has_only_buffered_data() {
    let (conn, log) = db();
    let mut user = Record::unbound(conn, "users").unwrap();
    assert!(!user.exists().unwrap());
    assert_eq!(user.current_data().unwrap(), None);
    user.set("name", "Ada");
    assert_eq!(user.data().unwrap().len(), 1);
    assert!(user.has_field("name").unwrap());
    assert!(!user.has_field("nope").unwrap());
    assert_eq!(count(&log, "SELECT"), 0);
}
