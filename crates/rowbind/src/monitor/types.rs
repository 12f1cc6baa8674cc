use std::fmt;
use std::time::Duration;

use crate::sql::{starts_with_keyword, strip_sql_prefix, truncate_sql_bytes};

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, pragmas, metadata lookups and anything else.
    Other,
}

impl QueryType {
    /// Detect query type from SQL string.
    ///
    /// For CTEs (`WITH ...`), looks past the CTE definitions to find the
    /// statement keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::detect_cte_statement(trimmed)
        } else {
            QueryType::Other
        }
    }

    /// The statement following the last top-level closing parenthesis.
    fn detect_cte_statement(sql: &str) -> Self {
        let bytes = sql.as_bytes();
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                quote @ (b'\'' | b'"' | b'`') => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        if bytes[i] == b'\\' && quote != b'\'' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let remainder = sql.get(last_top_level..).unwrap_or_default().trim_start();
        if starts_with_keyword(remainder, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(remainder, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(remainder, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Select
        }
    }
}

/// Context handed to hooks for one statement.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Statement text sent to the driver.
    pub sql: String,
    /// Detected query type.
    pub query_type: QueryType,
    /// Registry name of the connection, if it has one.
    pub connection: Option<String>,
}

impl QueryContext {
    pub fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            query_type: QueryType::from_sql(sql),
            connection: None,
        }
    }

    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self
    }
}

/// Maximum length for error messages in [`QueryOutcome::Error`].
const MAX_ERROR_LEN: usize = 512;

/// What a statement produced, as seen by hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// A row-producing statement and its row count.
    Rows(usize),
    /// Rows affected by a write.
    Affected(u64),
    /// Id reported by an insert.
    InsertId(i64),
    /// The statement failed (message truncated to 512 bytes).
    Error(String),
}

impl QueryOutcome {
    /// Create an error outcome, truncating the message.
    pub fn error(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", truncate_sql_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Rows(n) => write!(f, "{n} rows"),
            QueryOutcome::Affected(n) => write!(f, "{n} affected"),
            QueryOutcome::InsertId(id) => write!(f, "insert id {id}"),
            QueryOutcome::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Action to take after a hook inspects a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    /// Run the statement.
    Continue,
    /// Refuse the statement; the caller gets a query error with this message.
    Abort(String),
}

/// Hook into the statement lifecycle of a [`crate::Connection`].
///
/// Hooks run on the caller's thread, in the order they were added.
pub trait QueryHook {
    /// Called before a statement is sent to the driver.
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        let _ = ctx;
        HookAction::Continue
    }

    /// Called after the driver returns, on success and on failure.
    fn after_query(&self, _ctx: &QueryContext, _duration: Duration, _outcome: &QueryOutcome) {}
}
