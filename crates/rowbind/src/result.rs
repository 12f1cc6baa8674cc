//! Cursors over query results.
//!
//! A driver hands back a boxed [`ResultHandle`]; [`crate::Connection::query`]
//! wraps it in a [`ResultSet`] that owns the cursor position and a shared
//! reference to the connection that produced it.

use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::value::Row;

/// Driver-side access to the rows of one executed statement.
pub trait ResultHandle {
    /// Total number of rows.
    fn count(&self) -> usize;

    /// Column names, in result order.
    fn fields(&self) -> Vec<String>;

    /// Seek to `index` and fetch that row. `index` is always `< count()`.
    fn fetch(&mut self, index: usize) -> DbResult<Row>;

    /// Fetch every row in one call.
    ///
    /// Drivers without a bulk path return `Ok(None)`, and the caller walks the
    /// rows one by one instead.
    fn fetch_all(&mut self) -> DbResult<Option<Vec<Row>>> {
        Ok(None)
    }

    /// Release driver resources held by the handle.
    fn free(&mut self) {}
}

/// A fully materialized result, used by drivers that read every row up front.
#[derive(Debug, Clone, Default)]
pub struct BufferedRows {
    fields: Vec<String>,
    rows: Vec<Row>,
}

impl BufferedRows {
    pub fn new(fields: Vec<String>, rows: Vec<Row>) -> Self {
        Self { fields, rows }
    }
}

impl ResultHandle for BufferedRows {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn fetch(&mut self, index: usize) -> DbResult<Row> {
        self.rows
            .get(index)
            .cloned()
            .ok_or_else(|| DbError::Other(format!("row index {index} out of range")))
    }

    fn fetch_all(&mut self) -> DbResult<Option<Vec<Row>>> {
        Ok(Some(self.rows.clone()))
    }

    fn free(&mut self) {
        self.rows = Vec::new();
    }
}

/// A cursor over the rows produced by one query.
///
/// The cursor starts before the first row (position `-1`) and always stays
/// within `[-1, count]`. Running off either end is not an error: the row
/// accessors return `Ok(None)`.
pub struct ResultSet {
    conn: Connection,
    handle: Option<Box<dyn ResultHandle>>,
    query: Option<String>,
    cursor: i64,
}

impl std::fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("query", &self.query)
            .field("cursor", &self.cursor)
            .field("freed", &self.handle.is_none())
            .finish()
    }
}

impl ResultSet {
    pub fn new(conn: Connection, handle: Box<dyn ResultHandle>, query: Option<String>) -> Self {
        Self {
            conn,
            handle: Some(handle),
            query,
            cursor: -1,
        }
    }

    /// The connection that produced this result.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// The statement text that produced this result, if known.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Current cursor position; `-1` is "before first", `count()` is "after last".
    pub fn position(&self) -> i64 {
        self.cursor
    }

    fn handle(&self) -> DbResult<&dyn ResultHandle> {
        self.handle.as_deref().ok_or(DbError::ResultExpired)
    }

    fn handle_mut(&mut self) -> DbResult<&mut Box<dyn ResultHandle>> {
        self.handle.as_mut().ok_or(DbError::ResultExpired)
    }

    /// Total number of rows.
    pub fn count(&self) -> DbResult<usize> {
        Ok(self.handle()?.count())
    }

    /// Column names, in result order.
    pub fn fields(&self) -> DbResult<Vec<String>> {
        Ok(self.handle()?.fields())
    }

    /// Advance one row and return it, or `None` once past the last row.
    pub fn next_row(&mut self) -> DbResult<Option<Row>> {
        let count = self.count()? as i64;
        self.cursor = (self.cursor + 1).min(count);
        self.fetch_current()
    }

    /// Retreat one row and return it, or `None` once before the first row.
    ///
    /// From the "after last" position this lands on the last row.
    pub fn prev_row(&mut self) -> DbResult<Option<Row>> {
        self.handle()?;
        self.cursor = (self.cursor - 1).max(-1);
        self.fetch_current()
    }

    /// Absolute positioning. `None` behaves like [`ResultSet::next_row`].
    ///
    /// An index outside `[0, count)` returns `None` and leaves the cursor where
    /// it was.
    pub fn row(&mut self, index: Option<usize>) -> DbResult<Option<Row>> {
        let Some(index) = index else {
            return self.next_row();
        };
        if index >= self.count()? {
            return Ok(None);
        }
        self.cursor = index as i64;
        self.fetch_current()
    }

    /// Every row, in result order. The cursor ends after the last row.
    pub fn all_rows(&mut self) -> DbResult<Vec<Row>> {
        let count = self.count()?;
        if let Some(rows) = self.handle_mut()?.fetch_all()? {
            self.cursor = count as i64;
            return Ok(rows);
        }

        self.cursor = -1;
        let mut rows = Vec::with_capacity(count);
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Release the driver handle. Any later access fails with
    /// [`DbError::ResultExpired`].
    pub fn free(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.free();
        }
    }

    /// Whether [`ResultSet::free`] has been called.
    pub fn is_freed(&self) -> bool {
        self.handle.is_none()
    }

    fn fetch_current(&mut self) -> DbResult<Option<Row>> {
        let count = self.count()? as i64;
        if self.cursor < 0 || self.cursor >= count {
            return Ok(None);
        }
        let index = self.cursor as usize;
        self.handle_mut()?.fetch(index).map(Some)
    }
}

impl Drop for ResultSet {
    fn drop(&mut self) {
        self.free();
    }
}
