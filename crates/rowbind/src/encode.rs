//! Literal encoding and statement text for active records.
//!
//! Every statement a [`crate::Record`] issues is built here, from a [`Dialect`]
//! and plain data. The rules are part of the public contract: logging, tests and
//! compatible drivers rely on the exact text.
//!
//! Value encoding, in order:
//! 1. `Int` and finite `Float` values are emitted unquoted;
//! 2. `Null` and the text `"NULL"` become `NULL`;
//! 3. in filters only, the text `"NOT NULL"` becomes an `IS NOT NULL` predicate;
//! 4. anything else is escaped through the dialect and quoted.
//!
//! Key predicates skip every pair whose value is `Bool(false)` and join the
//! remaining clauses with `AND`.

use crate::syntax::Dialect;
use crate::value::Value;

/// Render a value for an `INSERT` value list or an `UPDATE ... SET` clause.
///
/// Only `Int` and finite `Float` values are written bare. Text that merely
/// looks numeric, like `"5"` or `"00123"`, stays a quoted string literal.
pub fn encode_value<D: Dialect + ?Sized>(dialect: &D, value: &Value) -> String {
    let syntax = dialect.syntax();
    match value {
        v if v.is_numeric() => v.to_string(),
        Value::Null => "NULL".to_string(),
        Value::Text(s) if s == "NULL" => "NULL".to_string(),
        Value::Bool(b) => syntax.bool_literal(*b).to_string(),
        Value::Blob(bytes) => syntax.blob_literal(bytes),
        other => syntax.quote_literal(&dialect.escape(&other.to_string())),
    }
}

/// Equality filter for one column, or `None` if the value is the `Bool(false)`
/// "no constraint" sentinel.
pub fn equality_predicate<D: Dialect + ?Sized>(
    dialect: &D,
    column: &str,
    value: &Value,
) -> Option<String> {
    if value.is_unconstrained() {
        return None;
    }

    let ident = dialect.syntax().quote_ident(column);
    let clause = match value {
        v if v.is_numeric() => format!("{ident} = {v}"),
        Value::Null => format!("{ident} IS NULL"),
        Value::Text(s) if s == "NULL" => format!("{ident} IS NULL"),
        Value::Text(s) if s == "NOT NULL" => format!("{ident} IS NOT NULL"),
        other => format!("{ident} = {}", encode_value(dialect, other)),
    };
    Some(clause)
}

/// Conjunction of equality filters over `(column, value)` pairs.
///
/// Returns an empty string when every pair is unconstrained.
pub fn key_predicate<'a, D, I>(dialect: &D, pairs: I) -> String
where
    D: Dialect + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    pairs
        .into_iter()
        .filter_map(|(column, value)| equality_predicate(dialect, column, value))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// `SELECT * FROM t WHERE <pred> LIMIT 2;`: the existence check of a record.
pub fn select_by_key_sql<D: Dialect + ?Sized>(dialect: &D, table: &str, predicate: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {predicate} LIMIT 2;",
        dialect.syntax().quote_ident(table)
    )
}

/// `INSERT INTO t (a,b) VALUES (x,y);`
pub fn insert_sql<'a, D, I>(dialect: &D, table: &str, values: I) -> String
where
    D: Dialect + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let syntax = dialect.syntax();
    let (fields, encoded): (Vec<String>, Vec<String>) = values
        .into_iter()
        .map(|(field, value)| (syntax.quote_ident(field), encode_value(dialect, value)))
        .unzip();

    let body = if fields.is_empty() {
        syntax.empty_insert_body().to_string()
    } else {
        format!("({}) VALUES ({})", fields.join(","), encoded.join(","))
    };
    format!("INSERT INTO {} {body};", syntax.quote_ident(table))
}

/// `UPDATE t SET a = x,b = y WHERE <pred>;`
pub fn update_sql<'a, D, I>(dialect: &D, table: &str, changes: I, predicate: &str) -> String
where
    D: Dialect + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let syntax = dialect.syntax();
    let set = changes
        .into_iter()
        .map(|(field, value)| format!("{} = {}", syntax.quote_ident(field), encode_value(dialect, value)))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "UPDATE {} SET {set} WHERE {predicate};",
        syntax.quote_ident(table)
    )
}

/// `DELETE FROM t WHERE <pred>;`
pub fn delete_sql<D: Dialect + ?Sized>(dialect: &D, table: &str, predicate: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {predicate};",
        dialect.syntax().quote_ident(table)
    )
}

/// `SELECT * FROM t WHERE <conditions>` with an optional `LIMIT`.
///
/// The `WHERE` keyword is omitted when no condition survives the
/// `Bool(false)` filter. A `limit` of 0 means no limit; `offset` is only
/// emitted alongside a limit.
pub fn select_where_sql<'a, D, I>(
    dialect: &D,
    table: &str,
    conditions: I,
    limit: Option<u64>,
    offset: u64,
) -> String
where
    D: Dialect + ?Sized,
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let syntax = dialect.syntax();
    let predicate = key_predicate(dialect, conditions);
    let mut sql = format!("SELECT * FROM {}", syntax.quote_ident(table));
    if !predicate.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);
    }
    if let Some(limit) = limit {
        sql.push_str(&syntax.limit_clause(limit, offset));
    }
    sql
}
