//! SQLite driver on `rusqlite`.
//!
//! Rows are read eagerly into a [`BufferedRows`] handle. An
//! `INTEGER PRIMARY KEY` column is an alias for the rowid, which makes it the
//! table's autoincrement column.

use std::cell::RefCell;
use std::path::Path;

use rusqlite::types::Value as SqlValue;

use super::table_literal;
use crate::connection::{Driver, Execution, SchemaQuery};
use crate::error::{DbError, DbResult};
use crate::monitor::QueryType;
use crate::result::BufferedRows;
use crate::syntax::Syntax;
use crate::value::{Row, Value};

const MEMORY: &str = ":memory:";

pub struct SqliteDriver {
    conn: RefCell<Option<rusqlite::Connection>>,
    database: String,
}

impl SqliteDriver {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path).map_err(|e| {
            DbError::Connection(format!("failed to open sqlite database {}: {e}", path.display()))
        })?;
        Ok(Self::from_connection(conn, path.to_string_lossy().into_owned()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DbError::Connection(format!("failed to open sqlite database: {e}")))?;
        Ok(Self::from_connection(conn, MEMORY.to_string()))
    }

    /// Wrap an already open `rusqlite` connection.
    pub fn from_connection(conn: rusqlite::Connection, database: impl Into<String>) -> Self {
        Self {
            conn: RefCell::new(Some(conn)),
            database: database.into(),
        }
    }
}

fn query_error(e: rusqlite::Error) -> DbError {
    match e {
        rusqlite::Error::SqliteFailure(err, message) => DbError::query(
            message.unwrap_or_else(|| err.to_string()),
            Some(err.extended_code.to_string()),
        ),
        other => DbError::query(other.to_string(), None),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::Int(i),
        SqlValue::Real(f) => Value::Float(f),
        SqlValue::Text(s) => Value::Text(s),
        SqlValue::Blob(b) => Value::Blob(b),
    }
}

impl Driver for SqliteDriver {
    fn tag(&self) -> &'static str {
        "sqlite"
    }

    fn syntax(&self) -> Syntax {
        Syntax::Sqlite
    }

    fn database(&self) -> Option<String> {
        Some(self.database.clone())
    }

    fn execute(&self, sql: &str) -> DbResult<Execution> {
        let guard = self.conn.borrow();
        let conn = guard.as_ref().ok_or_else(|| DbError::HandleUnavailable {
            connection: self.database.clone(),
            driver: self.tag().to_string(),
        })?;

        let mut stmt = conn.prepare(sql).map_err(query_error)?;

        if stmt.column_count() == 0 {
            let affected = stmt.execute([]).map_err(query_error)?;
            let affected = affected as u64;
            if affected > 0 && QueryType::from_sql(sql) == QueryType::Insert {
                return Ok(Execution::InsertId {
                    id: conn.last_insert_rowid(),
                    affected,
                });
            }
            return Ok(Execution::Affected(affected));
        }

        let fields: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([]).map_err(query_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut decoded = Row::new();
            for (i, field) in fields.iter().enumerate() {
                let value: SqlValue = row
                    .get(i)
                    .map_err(|e| DbError::decode(field.as_str(), e.to_string()))?;
                decoded.insert(field.as_str(), from_sql(value));
            }
            out.push(decoded);
        }
        Ok(Execution::Rows(Box::new(BufferedRows::new(fields, out))))
    }

    fn schema_sql(&self, query: SchemaQuery<'_>) -> String {
        let lit = |t: &str| table_literal(Syntax::Sqlite, t);
        match query {
            SchemaQuery::Tables => "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
                .to_string(),
            SchemaQuery::Fields(t) => {
                format!("SELECT name FROM pragma_table_info({}) ORDER BY cid", lit(t))
            }
            SchemaQuery::PrimaryKey(t) => format!(
                "SELECT name FROM pragma_table_info({}) WHERE pk > 0 ORDER BY pk",
                lit(t)
            ),
            SchemaQuery::AutoincrementKey(t) => format!(
                "SELECT name FROM pragma_table_info({0}) \
                 WHERE pk = 1 AND upper(type) = 'INTEGER' \
                 AND (SELECT count(*) FROM pragma_table_info({0}) WHERE pk > 0) = 1",
                lit(t)
            ),
        }
    }

    fn close(&self) {
        if let Some(conn) = self.conn.borrow_mut().take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(
                    target: "rowbind.sql",
                    database = %self.database,
                    error = %e,
                    "sqlite close reported an error"
                );
            }
        }
    }

    fn is_open(&self) -> bool {
        self.conn.borrow().is_some()
    }
}
