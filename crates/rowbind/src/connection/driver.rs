use crate::error::DbResult;
use crate::result::ResultHandle;
use crate::syntax::Syntax;

/// What a driver produced for one statement.
pub enum Execution {
    /// A row-producing statement.
    Rows(Box<dyn ResultHandle>),
    /// A row-inserting statement for which the driver reported a new id.
    ///
    /// The connection only surfaces `id` when the target table has an
    /// autoincrement column; otherwise the statement reports `affected`.
    InsertId { id: i64, affected: u64 },
    /// Any other successful statement, with the number of affected rows.
    Affected(u64),
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execution::Rows(handle) => f.debug_tuple("Rows").field(&handle.count()).finish(),
            Execution::InsertId { id, affected } => f
                .debug_struct("InsertId")
                .field("id", id)
                .field("affected", affected)
                .finish(),
            Execution::Affected(n) => f.debug_tuple("Affected").field(n).finish(),
        }
    }
}

/// A schema metadata lookup.
///
/// Drivers answer each lookup with a statement whose first result column holds
/// the requested names, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaQuery<'a> {
    /// All table names in the database.
    Tables,
    /// Column names of a table, in declaration order.
    Fields(&'a str),
    /// Primary key columns of a table, in key order.
    PrimaryKey(&'a str),
    /// The autoincrement column of a table (zero or one row).
    AutoincrementKey(&'a str),
}

impl SchemaQuery<'_> {
    pub fn table(&self) -> Option<&str> {
        match self {
            SchemaQuery::Tables => None,
            SchemaQuery::Fields(t) | SchemaQuery::PrimaryKey(t) | SchemaQuery::AutoincrementKey(t) => {
                Some(t)
            }
        }
    }
}

/// A vendor database driver.
///
/// Implement this to plug a database into [`crate::Connection`]. The connection
/// layers naming, hooks, logging and schema caching on top; the driver only
/// executes statements and knows its own dialect.
pub trait Driver {
    /// Driver tag, e.g. `"sqlite"`.
    fn tag(&self) -> &'static str;

    /// SQL dialect spoken by this driver.
    fn syntax(&self) -> Syntax;

    /// Escape a literal body. Defaults to the dialect's escaping.
    fn escape(&self, value: &str) -> String {
        self.syntax().escape(value)
    }

    /// Name of the database this driver is attached to, when known.
    fn database(&self) -> Option<String> {
        None
    }

    /// Execute one statement.
    ///
    /// Returns [`crate::DbError::HandleUnavailable`] once the driver is closed.
    fn execute(&self, sql: &str) -> DbResult<Execution>;

    /// Statement answering a schema lookup.
    fn schema_sql(&self, query: SchemaQuery<'_>) -> String;

    /// Release the underlying handle.
    fn close(&self);

    /// Whether the underlying handle is still usable.
    fn is_open(&self) -> bool;
}
