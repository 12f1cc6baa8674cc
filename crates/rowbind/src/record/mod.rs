//! Single-row active records.
//!
//! A [`Record`] addresses one row of one table through a key tuple paired
//! with a column tuple (the table's primary key unless configured
//! otherwise). Writes are staged in a buffer until [`Record::create`] or
//! [`Record::update`]; the row itself is fetched lazily on first read.
//!
//! ```rust,ignore
//! let mut user = Record::build_new(&registry, "users", DEFAULT_CONNECTION)?;
//! user.set("name", "Ada");
//! user.create()?;
//!
//! user.set("name", "Grace");
//! user.update()?;
//! assert_eq!(user.get("name")?, Value::from("Grace"));
//! ```
//!
//! Every statement is built by [`crate::encode`].

mod factory;

#[cfg(test)]
mod tests;

use crate::connection::Connection;
use crate::encode::{delete_sql, insert_sql, key_predicate, select_by_key_sql, update_sql};
use crate::error::{DbError, DbResult};
use crate::value::{Row, Value};

/// Whether the bound row is known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Existence {
    /// Not checked yet, or the cache was reset.
    #[default]
    Unknown,
    Exists,
    Absent,
    /// The binding matched more than one row. Sticks until the cache is reset.
    Duplicate,
}

/// Lifecycle state of a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No key tuple; only [`Record::create`] is valid.
    Unbound,
    /// Key tuple set, existence not resolved.
    BoundUnknown,
    BoundExists,
    BoundAbsent,
    /// The binding matched several rows; every read fails until
    /// [`Record::reset_cache`].
    BoundDuplicate,
}

/// An active record bound to at most one row of one table.
#[derive(Debug, Clone)]
pub struct Record {
    conn: Connection,
    table: String,
    columns: Vec<String>,
    key: Option<Vec<Value>>,
    buffer: Row,
    current: Option<Row>,
    /// The cached row holds only what was inserted, not the full table row.
    current_partial: bool,
    existence: Existence,
}

impl Record {
    /// Create a record on `table`.
    ///
    /// An empty `key` leaves the record unbound. `columns` defaults to the
    /// table's primary key; it must be non-empty and, when a key is given, of
    /// the same length as the key.
    pub fn new(
        conn: Connection,
        table: impl Into<String>,
        key: Vec<Value>,
        columns: Option<Vec<String>>,
    ) -> DbResult<Self> {
        let table = table.into();
        let columns = match columns {
            Some(columns) => columns,
            None => conn.primary_key(&table, true)?,
        };

        if columns.is_empty() {
            return Err(DbError::cardinality(format!(
                "cannot bind `{table}` to zero key columns"
            )));
        }
        if !key.is_empty() && key.len() != columns.len() {
            return Err(DbError::cardinality(format!(
                "{} key value(s) given for key columns ({}) of `{table}`",
                key.len(),
                columns.join(", ")
            )));
        }

        Ok(Self {
            conn,
            table,
            columns,
            key: (!key.is_empty()).then_some(key),
            buffer: Row::new(),
            current: None,
            current_partial: false,
            existence: Existence::Unknown,
        })
    }

    /// An unbound record on `table`, keyed by its primary key.
    pub fn unbound(conn: Connection, table: impl Into<String>) -> DbResult<Self> {
        Self::new(conn, table, Vec::new(), None)
    }

    /// A record bound by a single-column primary key.
    pub fn bind(conn: Connection, table: impl Into<String>, key: impl Into<Value>) -> DbResult<Self> {
        Self::new(conn, table, vec![key.into()], None)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Key columns the record binds on.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Key tuple, or `None` while unbound.
    pub fn key(&self) -> Option<&[Value]> {
        self.key.as_deref()
    }

    pub fn existence(&self) -> Existence {
        self.existence
    }

    pub fn state(&self) -> RecordState {
        match (&self.key, self.existence) {
            (None, _) => RecordState::Unbound,
            (Some(_), Existence::Unknown) => RecordState::BoundUnknown,
            (Some(_), Existence::Exists) => RecordState::BoundExists,
            (Some(_), Existence::Absent) => RecordState::BoundAbsent,
            (Some(_), Existence::Duplicate) => RecordState::BoundDuplicate,
        }
    }

    /// Column names of the table (cached on the connection).
    pub fn fields(&self) -> DbResult<Vec<String>> {
        self.conn.fields(&self.table, true)
    }

    pub fn has_field(&self, field: &str) -> DbResult<bool> {
        Ok(self.fields()?.iter().any(|f| f == field))
    }

    /// Stage a value for the next create or update.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.buffer.insert(field, value);
    }

    /// Read a field: staged value first, then the stored row, then the key
    /// tuple.
    pub fn get(&mut self, field: &str) -> DbResult<Value> {
        if let Some(value) = self.buffer.get(field) {
            return Ok(value.clone());
        }

        if self.key.is_some() {
            self.complete_partial_row(field)?;
            if self.exists()? {
                if let Some(value) = self.current.as_ref().and_then(|row| row.get(field)) {
                    return Ok(value.clone());
                }
            }
        }

        if let (Some(idx), Some(key)) = (self.columns.iter().position(|c| c == field), &self.key) {
            if let Some(value) = key.get(idx).filter(|v| !v.is_unconstrained()) {
                return Ok(value.clone());
            }
        }

        Err(DbError::UndefinedField {
            table: self.table.clone(),
            field: field.to_string(),
        })
    }

    /// Whether [`Record::get`] would return a value for `field`.
    pub fn is_set(&mut self, field: &str) -> DbResult<bool> {
        match self.get(field) {
            Ok(_) => Ok(true),
            Err(DbError::UndefinedField { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Staged values not yet written.
    pub fn buffered(&self) -> &Row {
        &self.buffer
    }

    /// The stored row, or `None` when unbound or absent.
    pub fn current_data(&mut self) -> DbResult<Option<Row>> {
        if self.key.is_none() {
            return Ok(None);
        }
        if self.current_partial {
            self.refresh()?;
        }
        if !self.exists()? {
            return Ok(None);
        }
        Ok(self.current.clone())
    }

    /// The stored row with staged values laid over it.
    pub fn data(&mut self) -> DbResult<Row> {
        let mut data = self.current_data()?.unwrap_or_default();
        data.merge(&self.buffer);
        Ok(data)
    }

    /// [`Record::data`] as a JSON object.
    pub fn to_json(&mut self) -> DbResult<serde_json::Value> {
        Ok(self.data()?.to_json())
    }

    /// Key columns paired with their key values.
    pub fn key_columns(&self) -> DbResult<Row> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| DbError::invalid_state(format!("record on `{}` is not bound", self.table)))?;
        if key.len() != self.columns.len() {
            return Err(DbError::cardinality(format!(
                "{} key value(s) for {} key column(s) of `{}`",
                key.len(),
                self.columns.len(),
                self.table
            )));
        }
        Ok(self.columns.iter().cloned().zip(key.iter().cloned()).collect())
    }

    /// `WHERE` body selecting the bound row.
    pub fn key_predicate_sql(&self) -> DbResult<String> {
        let pairs = self.key_columns()?;
        let predicate = key_predicate(&self.conn, pairs.iter());
        if predicate.is_empty() {
            return Err(DbError::invalid_state(format!(
                "binding on `{}` constrains no column",
                self.table
            )));
        }
        Ok(predicate)
    }

    /// Whether the bound row exists. Unbound records never exist.
    ///
    /// The first call per binding issues one `SELECT ... LIMIT 2`; the answer
    /// is cached until [`Record::reset_cache`]. A binding that matches two rows
    /// fails with [`DbError::DuplicateKey`], and keeps failing without another
    /// query until the cache is reset.
    pub fn exists(&mut self) -> DbResult<bool> {
        if self.key.is_none() {
            return Ok(false);
        }
        match self.existence {
            Existence::Exists => Ok(true),
            Existence::Absent => Ok(false),
            Existence::Duplicate => Err(self.duplicate_error(self.key_predicate_sql()?)),
            Existence::Unknown => self.fetch_current(),
        }
    }

    fn duplicate_error(&self, binding: String) -> DbError {
        DbError::DuplicateKey {
            table: self.table.clone(),
            binding,
        }
    }

    /// Re-read the bound row regardless of the cache.
    pub fn refresh(&mut self) -> DbResult<bool> {
        if self.key.is_none() {
            return Ok(false);
        }
        self.fetch_current()
    }

    fn fetch_current(&mut self) -> DbResult<bool> {
        let predicate = self.key_predicate_sql()?;
        let sql = select_by_key_sql(&self.conn, &self.table, &predicate);
        let mut result = self.conn.query(&sql)?.into_rows()?;

        match result.count()? {
            0 => {
                self.current = None;
                self.existence = Existence::Absent;
            }
            1 => {
                self.current = result.next_row()?;
                self.existence = Existence::Exists;
            }
            _ => {
                self.current = None;
                self.current_partial = false;
                self.existence = Existence::Duplicate;
                result.free();
                return Err(self.duplicate_error(predicate));
            }
        }
        self.current_partial = false;
        result.free();
        Ok(self.existence == Existence::Exists)
    }

    /// After a create, the cached row only holds what was inserted. Reading
    /// any other table column pulls the full row.
    fn complete_partial_row(&mut self, field: &str) -> DbResult<()> {
        let missing = self
            .current
            .as_ref()
            .is_some_and(|row| !row.contains(field));
        if self.current_partial && missing && self.has_field(field)? {
            self.refresh()?;
        }
        Ok(())
    }

    /// Inject an already fetched row.
    ///
    /// Fails with [`DbError::FieldNotAllowed`] if `row` carries a field outside
    /// `allowed`, or [`DbError::MissingFields`] if a `required` field is
    /// absent. A bound record becomes [`RecordState::BoundExists`] without any
    /// query.
    pub fn load(
        &mut self,
        row: Row,
        allowed: Option<&[&str]>,
        required: Option<&[&str]>,
    ) -> DbResult<()> {
        if let Some(allowed) = allowed {
            let extra: Vec<String> = row
                .fields()
                .filter(|f| !allowed.contains(f))
                .map(str::to_string)
                .collect();
            if !extra.is_empty() {
                return Err(DbError::FieldNotAllowed {
                    table: self.table.clone(),
                    fields: extra,
                });
            }
        }
        if let Some(required) = required {
            let missing: Vec<String> = required
                .iter()
                .filter(|f| !row.contains(f))
                .map(|f| f.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(DbError::MissingFields { fields: missing });
            }
        }

        self.current = Some(row);
        self.current_partial = false;
        if self.key.is_some() {
            self.existence = Existence::Exists;
        }
        Ok(())
    }

    fn check_buffer_fields(&self) -> DbResult<()> {
        let fields = self.fields()?;
        let extra: Vec<String> = self
            .buffer
            .fields()
            .filter(|f| !fields.iter().any(|c| c.as_str() == *f))
            .map(str::to_string)
            .collect();
        if extra.is_empty() {
            Ok(())
        } else {
            Err(DbError::FieldNotAllowed {
                table: self.table.clone(),
                fields: extra,
            })
        }
    }

    /// Insert the staged values as a new row and bind to it.
    ///
    /// Valid only while unbound. The new key tuple is read from the inserted
    /// values, plus the id the driver reported when the table has an
    /// autoincrement column the values did not set. Columns with neither come
    /// back unconstrained (`Bool(false)`).
    pub fn create(&mut self) -> DbResult<()> {
        if self.key.is_some() {
            return Err(DbError::invalid_state(format!(
                "cannot create a record on `{}` that is already bound",
                self.table
            )));
        }
        self.check_buffer_fields()?;

        let autoincrement = self.conn.autoincrement_key(&self.table, true)?;
        let derivable = self.columns.iter().any(|c| {
            autoincrement.as_deref() == Some(c.as_str())
                || self.buffer.get(c).is_some_and(|v| !v.is_unconstrained())
        });
        if !derivable {
            return Err(DbError::cardinality(format!(
                "no value for key columns ({}) of `{}`; the new row could not be bound",
                self.columns.join(", "),
                self.table
            )));
        }

        let sql = insert_sql(&self.conn, &self.table, self.buffer.iter());
        let output = self.conn.query(&sql)?;

        let mut current = std::mem::take(&mut self.buffer);
        if let (Some(column), Some(id)) = (autoincrement, output.insert_id()) {
            if !current.contains(&column) {
                current.insert(column, id);
            }
        }

        self.key = Some(
            self.columns
                .iter()
                .map(|c| current.get(c).cloned().unwrap_or(Value::Bool(false)))
                .collect(),
        );
        self.current = Some(current);
        self.current_partial = true;
        self.existence = Existence::Exists;
        Ok(())
    }

    /// Write the staged values to the bound row.
    ///
    /// An empty buffer is a successful no-op. Staged key columns move the
    /// binding with the row.
    pub fn update(&mut self) -> DbResult<()> {
        if !self.exists()? {
            return Err(DbError::invalid_state(format!(
                "cannot update a record on `{}` that does not exist",
                self.table
            )));
        }
        self.check_buffer_fields()?;
        if self.buffer.is_empty() {
            return Ok(());
        }

        let predicate = self.key_predicate_sql()?;
        let sql = update_sql(&self.conn, &self.table, self.buffer.iter(), &predicate);
        self.conn.query(&sql)?;

        if let Some(key) = self.key.as_mut() {
            for (slot, column) in key.iter_mut().zip(&self.columns) {
                if let Some(value) = self.buffer.get(column) {
                    *slot = value.clone();
                }
            }
        }
        let buffer = std::mem::take(&mut self.buffer);
        self.current.get_or_insert_with(Row::new).merge(&buffer);
        Ok(())
    }

    /// Delete the bound row and return to the unbound state.
    ///
    /// The key columns are kept, so the record can be reused for a new
    /// [`Record::create`].
    pub fn delete(&mut self) -> DbResult<()> {
        if !self.exists()? {
            return Err(DbError::invalid_state(format!(
                "cannot delete a record on `{}` that does not exist",
                self.table
            )));
        }

        let predicate = self.key_predicate_sql()?;
        self.conn.query(&delete_sql(&self.conn, &self.table, &predicate))?;
        self.key = None;
        self.reset();
        Ok(())
    }

    /// Drop staged values and the cached row.
    pub fn reset(&mut self) {
        self.reset_buffer();
        self.reset_cache();
    }

    pub fn reset_buffer(&mut self) {
        self.buffer = Row::new();
    }

    /// Forget the cached row; the next read queries again.
    pub fn reset_cache(&mut self) {
        self.current = None;
        self.current_partial = false;
        self.existence = Existence::Unknown;
    }
}
