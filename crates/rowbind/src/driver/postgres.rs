//! PostgreSQL driver on `tokio-postgres`.
//!
//! The async client is driven by a private current-thread runtime: every call
//! blocks until the statement completes. The connection task is polled only
//! while a statement is in flight.

use std::cell::RefCell;

use tokio::runtime::Runtime;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls};

use super::table_literal;
use crate::connection::{Driver, Execution, SchemaQuery};
use crate::error::{DbError, DbResult};
use crate::monitor::QueryType;
use crate::result::ResultHandle;
use crate::syntax::Syntax;
use crate::value::{Row, Value};

pub struct PostgresDriver {
    runtime: Runtime,
    client: RefCell<Option<Client>>,
    database: Option<String>,
}

impl PostgresDriver {
    /// Connect with a libpq-style connection string or a `postgres://` URL.
    pub fn connect(url: &str) -> DbResult<Self> {
        let config: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::Connection(e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DbError::Connection(format!("failed to start runtime: {e}")))?;

        let (client, connection) = runtime
            .block_on(config.connect(NoTls))
            .map_err(|e| DbError::Connection(e.to_string()))?;
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "rowbind.sql", error = %e, "postgres connection closed");
            }
        });

        Ok(Self {
            runtime,
            client: RefCell::new(Some(client)),
            database: config.get_dbname().map(str::to_string),
        })
    }
}

fn query_error(e: tokio_postgres::Error) -> DbError {
    match e.as_db_error() {
        Some(db) => DbError::query(db.message(), Some(db.code().code().to_string())),
        None => DbError::query(e.to_string(), None),
    }
}

async fn run(client: &Client, sql: &str) -> DbResult<Execution> {
    let stmt = client.prepare(sql).await.map_err(query_error)?;

    if stmt.columns().is_empty() {
        let affected = client.execute(&stmt, &[]).await.map_err(query_error)?;
        if affected > 0 && QueryType::from_sql(sql) == QueryType::Insert {
            // lastval() is undefined until a sequence was used in this session.
            if let Ok(row) = client.query_one("SELECT lastval()", &[]).await {
                if let Ok(id) = row.try_get::<_, i64>(0) {
                    return Ok(Execution::InsertId { id, affected });
                }
            }
        }
        return Ok(Execution::Affected(affected));
    }

    let rows = client.query(&stmt, &[]).await.map_err(query_error)?;
    Ok(Execution::Rows(Box::new(PgRows {
        fields: stmt.columns().iter().map(|c| c.name().to_string()).collect(),
        types: stmt.columns().iter().map(|c| c.type_().clone()).collect(),
        rows,
    })))
}

impl Driver for PostgresDriver {
    fn tag(&self) -> &'static str {
        "postgres"
    }

    fn syntax(&self) -> Syntax {
        Syntax::Postgres
    }

    fn database(&self) -> Option<String> {
        self.database.clone()
    }

    fn execute(&self, sql: &str) -> DbResult<Execution> {
        let guard = self.client.borrow();
        let client = guard.as_ref().ok_or_else(|| DbError::HandleUnavailable {
            connection: self.database.clone().unwrap_or_default(),
            driver: self.tag().to_string(),
        })?;

        self.runtime.block_on(run(client, sql))
    }

    fn schema_sql(&self, query: SchemaQuery<'_>) -> String {
        let lit = |t: &str| table_literal(Syntax::Postgres, t);
        match query {
            SchemaQuery::Tables => "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
                 ORDER BY table_name"
                .to_string(),
            SchemaQuery::Fields(t) => format!(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = {} \
                 ORDER BY ordinal_position",
                lit(t)
            ),
            SchemaQuery::PrimaryKey(t) => format!(
                "SELECT kcu.column_name::text \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON kcu.constraint_name = tc.constraint_name \
                  AND kcu.constraint_schema = tc.constraint_schema \
                  AND kcu.table_name = tc.table_name \
                 WHERE tc.constraint_type = 'PRIMARY KEY' \
                   AND tc.table_schema = current_schema() AND tc.table_name = {} \
                 ORDER BY kcu.ordinal_position",
                lit(t)
            ),
            SchemaQuery::AutoincrementKey(t) => format!(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = {} \
                   AND (is_identity = 'YES' OR column_default LIKE 'nextval(%') \
                 ORDER BY ordinal_position LIMIT 1",
                lit(t)
            ),
        }
    }

    fn close(&self) {
        // Dropping the client ends the connection task on its next poll.
        self.client.borrow_mut().take();
    }

    fn is_open(&self) -> bool {
        self.client
            .borrow()
            .as_ref()
            .is_some_and(|client| !client.is_closed())
    }
}

/// Rows of one statement, decoded on access.
struct PgRows {
    fields: Vec<String>,
    types: Vec<Type>,
    rows: Vec<tokio_postgres::Row>,
}

impl ResultHandle for PgRows {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn fetch(&mut self, index: usize) -> DbResult<Row> {
        let row = self
            .rows
            .get(index)
            .ok_or_else(|| DbError::Other(format!("row index {index} out of range")))?;
        decode_row(&self.fields, &self.types, row)
    }

    fn fetch_all(&mut self) -> DbResult<Option<Vec<Row>>> {
        self.rows
            .iter()
            .map(|row| decode_row(&self.fields, &self.types, row))
            .collect::<DbResult<Vec<_>>>()
            .map(Some)
    }

    fn free(&mut self) {
        self.rows = Vec::new();
    }
}

fn decode_row(fields: &[String], types: &[Type], row: &tokio_postgres::Row) -> DbResult<Row> {
    let mut decoded = Row::new();
    for (i, (field, ty)) in fields.iter().zip(types).enumerate() {
        decoded.insert(field.as_str(), decode_cell(row, i, field, ty)?);
    }
    Ok(decoded)
}

fn decode_cell(row: &tokio_postgres::Row, i: usize, field: &str, ty: &Type) -> DbResult<Value> {
    macro_rules! get {
        ($ty:ty, $map:expr) => {
            row.try_get::<_, Option<$ty>>(i)
                .map(|v| v.map($map).unwrap_or(Value::Null))
                .map_err(|e| DbError::decode(field, e.to_string()))
        };
    }

    match *ty {
        Type::BOOL => get!(bool, Value::Bool),
        Type::INT2 => get!(i16, |v| Value::Int(v.into())),
        Type::INT4 => get!(i32, |v| Value::Int(v.into())),
        Type::INT8 => get!(i64, Value::Int),
        Type::OID => get!(u32, |v| Value::Int(v.into())),
        Type::FLOAT4 => get!(f32, |v| Value::Float(v.into())),
        Type::FLOAT8 => get!(f64, Value::Float),
        Type::NUMERIC => get!(rust_decimal::Decimal, |v| Value::Text(v.to_string())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get!(String, Value::Text)
        }
        Type::BYTEA => get!(Vec<u8>, Value::Blob),
        Type::JSON | Type::JSONB => get!(serde_json::Value, |v| Value::Text(v.to_string())),
        Type::UUID => get!(uuid::Uuid, |v| Value::Text(v.to_string())),
        Type::TIMESTAMP => get!(chrono::NaiveDateTime, |v| Value::Text(v.to_string())),
        Type::TIMESTAMPTZ => get!(chrono::DateTime<chrono::Utc>, |v| {
            Value::Text(v.to_rfc3339())
        }),
        Type::DATE => get!(chrono::NaiveDate, |v| Value::Text(v.to_string())),
        Type::TIME => get!(chrono::NaiveTime, |v| Value::Text(v.to_string())),
        ref other => Err(DbError::decode(
            field,
            format!("unsupported column type `{other}`; cast it to text in the query"),
        )),
    }
}
