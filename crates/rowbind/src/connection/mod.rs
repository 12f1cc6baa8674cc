//! Vendor-neutral database connections.
//!
//! A [`Connection`] wraps one [`Driver`] and adds what every vendor shares:
//! a registry name, query hooks, `tracing` output and a per-table schema
//! cache. Connections are cheap `Rc` handles; clones share all state.

mod driver;
mod schema;


use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

pub use driver::{Driver, Execution, SchemaQuery};
use schema::SchemaCache;

use crate::error::{DbError, DbResult};
use crate::monitor::{HookAction, QueryContext, QueryHook, QueryOutcome};
use crate::result::ResultSet;
use crate::sql::insert_target;
use crate::syntax::{Dialect, Syntax};
use crate::value::Value;

/// What a successful [`Connection::query`] produced.
#[derive(Debug)]
pub enum QueryOutput {
    /// A row-producing statement.
    Rows(ResultSet),
    /// An insert into a table with an autoincrement column, with the new id.
    InsertId(i64),
    /// Any other statement, with the number of affected rows.
    Affected(u64),
}

impl QueryOutput {
    /// The result set, or a query error if the statement produced no rows.
    pub fn into_rows(self) -> DbResult<ResultSet> {
        match self {
            QueryOutput::Rows(rows) => Ok(rows),
            QueryOutput::InsertId(_) | QueryOutput::Affected(_) => {
                Err(DbError::query("statement did not produce a result set", None))
            }
        }
    }

    pub fn insert_id(&self) -> Option<i64> {
        match self {
            QueryOutput::InsertId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_rows(&self) -> bool {
        matches!(self, QueryOutput::Rows(_))
    }
}

struct Inner {
    driver: Box<dyn Driver>,
    name: RefCell<Option<String>>,
    schema: RefCell<SchemaCache>,
    hooks: RefCell<Vec<Rc<dyn QueryHook>>>,
}

/// A handle to one database.
#[derive(Clone)]
pub struct Connection {
    inner: Rc<Inner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.inner.name.borrow())
            .field("driver", &self.inner.driver.tag())
            .field("open", &self.inner.driver.is_open())
            .finish()
    }
}

impl Connection {
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        Self::from_boxed(Box::new(driver))
    }

    pub fn from_boxed(driver: Box<dyn Driver>) -> Self {
        Self {
            inner: Rc::new(Inner {
                driver,
                name: RefCell::new(None),
                schema: RefCell::new(SchemaCache::default()),
                hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Open a SQLite database file, creating it if needed.
    #[cfg(feature = "sqlite")]
    pub fn open_sqlite(path: impl AsRef<std::path::Path>) -> DbResult<Self> {
        crate::driver::sqlite::SqliteDriver::open(path).map(Self::new)
    }

    /// Open a private in-memory SQLite database.
    #[cfg(feature = "sqlite")]
    pub fn open_sqlite_in_memory() -> DbResult<Self> {
        crate::driver::sqlite::SqliteDriver::open_in_memory().map(Self::new)
    }

    /// Connect to PostgreSQL with a libpq-style connection string or URL.
    #[cfg(feature = "postgres")]
    pub fn open_postgres(url: &str) -> DbResult<Self> {
        crate::driver::postgres::PostgresDriver::connect(url).map(Self::new)
    }

    /// Registry name.
    ///
    /// Fails with [`DbError::UnnamedConnection`] until the connection has been
    /// added to a [`crate::Registry`].
    pub fn name(&self) -> DbResult<String> {
        self.inner
            .name
            .borrow()
            .clone()
            .ok_or(DbError::UnnamedConnection)
    }

    pub(crate) fn set_name(&self, name: &str) {
        *self.inner.name.borrow_mut() = Some(name.to_string());
    }

    fn label(&self) -> String {
        self.inner
            .name
            .borrow()
            .clone()
            .unwrap_or_else(|| "unnamed".to_string())
    }

    /// Driver tag, e.g. `"sqlite"`.
    pub fn driver_tag(&self) -> &'static str {
        self.inner.driver.tag()
    }

    pub fn syntax(&self) -> Syntax {
        self.inner.driver.syntax()
    }

    /// Dialect tag: `mysql`, `sqlite` or `postgres`.
    pub fn syntax_tag(&self) -> &'static str {
        self.syntax().tag()
    }

    /// Escape a literal body for this driver. The caller adds the quotes.
    pub fn escape(&self, value: &str) -> String {
        self.inner.driver.escape(value)
    }

    /// Name of the attached database, when the driver knows it.
    pub fn database(&self) -> Option<String> {
        self.inner.driver.database()
    }

    pub fn is_open(&self) -> bool {
        self.inner.driver.is_open()
    }

    /// Whether both handles refer to the same connection.
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DbError::HandleUnavailable {
                connection: self.label(),
                driver: self.driver_tag().to_string(),
            })
        }
    }

    /// Attach a query hook. Hooks run in the order they were added.
    pub fn add_hook(&self, hook: Rc<dyn QueryHook>) {
        self.inner.hooks.borrow_mut().push(hook);
    }

    pub fn clear_hooks(&self) {
        self.inner.hooks.borrow_mut().clear();
    }

    /// Execute one statement.
    pub fn query(&self, sql: &str) -> DbResult<QueryOutput> {
        self.ensure_open()?;

        let mut ctx = QueryContext::new(sql);
        ctx.connection = self.inner.name.borrow().clone();
        let hooks: Vec<Rc<dyn QueryHook>> = self.inner.hooks.borrow().clone();

        for hook in &hooks {
            if let HookAction::Abort(reason) = hook.before_query(&ctx) {
                tracing::debug!(
                    target: "rowbind.sql",
                    connection = %self.label(),
                    reason = %reason,
                    "query aborted by hook"
                );
                return Err(DbError::query(reason, None));
            }
        }

        let start = Instant::now();
        let result = self.inner.driver.execute(sql);
        let elapsed = start.elapsed();

        let result = match result {
            Ok(Execution::InsertId { id, affected }) => {
                Ok(self.confirm_insert_id(sql, id, affected))
            }
            other => other,
        };
        let outcome = match &result {
            Ok(Execution::Rows(handle)) => QueryOutcome::Rows(handle.count()),
            Ok(Execution::InsertId { id, .. }) => QueryOutcome::InsertId(*id),
            Ok(Execution::Affected(n)) => QueryOutcome::Affected(*n),
            Err(e) => QueryOutcome::error(e.to_string()),
        };
        for hook in &hooks {
            hook.after_query(&ctx, elapsed, &outcome);
        }

        match result {
            Ok(Execution::Rows(handle)) => Ok(QueryOutput::Rows(ResultSet::new(
                self.clone(),
                handle,
                Some(sql.to_string()),
            ))),
            Ok(Execution::InsertId { id, .. }) => Ok(QueryOutput::InsertId(id)),
            Ok(Execution::Affected(n)) => Ok(QueryOutput::Affected(n)),
            Err(e) => {
                tracing::debug!(
                    target: "rowbind.sql",
                    connection = %self.label(),
                    error = %e,
                    sql,
                    "query failed"
                );
                Err(e)
            }
        }
    }

    /// Keep a driver-reported insert id only when the target table has an
    /// autoincrement column. Other inserts report their affected row count.
    fn confirm_insert_id(&self, sql: &str, id: i64, affected: u64) -> Execution {
        let Some(target) = insert_target(sql) else {
            return Execution::Affected(affected);
        };
        // Postgres folds unquoted identifiers to lower case.
        let table = match (self.syntax(), target.quoted) {
            (Syntax::Postgres, false) => target.table.to_ascii_lowercase(),
            _ => target.table.to_string(),
        };
        match self.autoincrement_key(&table, true) {
            Ok(Some(_)) => Execution::InsertId { id, affected },
            Ok(None) => Execution::Affected(affected),
            Err(e) => {
                tracing::debug!(
                    target: "rowbind.schema",
                    connection = %self.label(),
                    table = %table,
                    error = %e,
                    "autoincrement lookup failed; dropping insert id"
                );
                Execution::Affected(affected)
            }
        }
    }

    /// Run a metadata lookup and collect the first column of every row.
    fn schema_names(&self, lookup: SchemaQuery<'_>) -> DbResult<Vec<String>> {
        let sql = self.inner.driver.schema_sql(lookup);
        tracing::debug!(
            target: "rowbind.schema",
            connection = %self.label(),
            table = lookup.table().unwrap_or("-"),
            lookup = ?lookup,
            "refreshing schema metadata"
        );

        let mut rows = self.query(&sql)?.into_rows()?;
        let names = rows
            .all_rows()?
            .iter()
            .filter_map(|row| match row.values().next() {
                None | Some(Value::Null) => None,
                Some(Value::Text(name)) => Some(name.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect();
        rows.free();
        Ok(names)
    }

    /// All table names.
    pub fn tables(&self, use_cache: bool) -> DbResult<Vec<String>> {
        if use_cache {
            if let Some(tables) = &self.inner.schema.borrow().tables {
                return Ok(tables.clone());
            }
        }
        let tables = self.schema_names(SchemaQuery::Tables)?;
        self.inner.schema.borrow_mut().tables = Some(tables.clone());
        Ok(tables)
    }

    /// Column names of `table`, in declaration order.
    pub fn fields(&self, table: &str, use_cache: bool) -> DbResult<Vec<String>> {
        if use_cache {
            if let Some(fields) = self.inner.schema.borrow().fields.get(table) {
                return Ok(fields.clone());
            }
        }
        let fields = self.schema_names(SchemaQuery::Fields(table))?;
        self.inner
            .schema
            .borrow_mut()
            .fields
            .insert(table.to_string(), fields.clone());
        Ok(fields)
    }

    /// Primary key columns of `table`, in key order.
    pub fn primary_key(&self, table: &str, use_cache: bool) -> DbResult<Vec<String>> {
        if use_cache {
            if let Some(key) = self.inner.schema.borrow().primary_keys.get(table) {
                return Ok(key.clone());
            }
        }
        let key = self.schema_names(SchemaQuery::PrimaryKey(table))?;
        self.inner
            .schema
            .borrow_mut()
            .primary_keys
            .insert(table.to_string(), key.clone());
        Ok(key)
    }

    /// The autoincrement column of `table`, if it has one.
    pub fn autoincrement_key(&self, table: &str, use_cache: bool) -> DbResult<Option<String>> {
        if use_cache {
            if let Some(column) = self.inner.schema.borrow().autoincrement_keys.get(table) {
                return Ok(column.clone());
            }
        }
        let column = self
            .schema_names(SchemaQuery::AutoincrementKey(table))?
            .into_iter()
            .next();
        self.inner
            .schema
            .borrow_mut()
            .autoincrement_keys
            .insert(table.to_string(), column.clone());
        Ok(column)
    }

    /// Drop all memoized schema metadata.
    pub fn clear_schema_cache(&self) {
        self.inner.schema.borrow_mut().clear();
    }

    /// Drop memoized metadata for one table.
    pub fn forget_table(&self, table: &str) {
        self.inner.schema.borrow_mut().forget_table(table);
    }

    /// Release the driver handle. Every later call fails with
    /// [`DbError::HandleUnavailable`].
    pub fn close(&self) {
        if self.is_open() {
            tracing::debug!(
                target: "rowbind.sql",
                connection = %self.label(),
                driver = self.driver_tag(),
                "closing connection"
            );
            self.inner.driver.close();
        }
    }
}

impl Dialect for Connection {
    fn syntax(&self) -> Syntax {
        Connection::syntax(self)
    }

    fn escape(&self, value: &str) -> String {
        Connection::escape(self, value)
    }
}
