use super::Record;
use crate::connection::Connection;
use crate::encode::select_where_sql;
use crate::error::{DbError, DbResult};
use crate::registry::Registry;
use crate::result::ResultSet;
use crate::value::Value;

impl Record {
    /// A record on `table` using the named registry connection.
    ///
    /// An empty `key` gives an unbound record; `columns` defaults to the
    /// table's primary key.
    pub fn build(
        registry: &Registry,
        table: &str,
        key: Vec<Value>,
        columns: Option<Vec<String>>,
        connection: &str,
    ) -> DbResult<Self> {
        Self::new(registry.get(connection)?, table, key, columns)
    }

    /// An unbound record, ready for [`Record::create`].
    pub fn build_new(registry: &Registry, table: &str, connection: &str) -> DbResult<Self> {
        Self::unbound(registry.get(connection)?, table)
    }

    /// One bound record per row of `result`, each loaded straight from its row.
    ///
    /// No statement is issued per row: only the table's column list (and
    /// primary key, without `columns`) is looked up, through the schema cache.
    /// Every row must carry exactly the table's columns, as `SELECT *` does.
    pub fn build_from_result(
        table: &str,
        result: &mut ResultSet,
        columns: Option<Vec<String>>,
    ) -> DbResult<Vec<Self>> {
        let conn = result.connection().clone();
        let fields = conn.fields(table, true)?;
        let field_refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        let columns = match columns {
            Some(columns) => columns,
            None => conn.primary_key(table, true)?,
        };

        let rows = result.all_rows()?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let key = columns
                .iter()
                .map(|column| {
                    row.get(column).cloned().ok_or_else(|| {
                        DbError::cardinality(format!(
                            "row of `{table}` has no value for key column `{column}`"
                        ))
                    })
                })
                .collect::<DbResult<Vec<_>>>()?;

            let mut record = Self::new(conn.clone(), table, key, Some(columns.clone()))?;
            record.load(row, Some(field_refs.as_slice()), Some(field_refs.as_slice()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Records for every row of `table` equal to `conditions`.
    ///
    /// Conditions follow the literal encoding rules: `Value::Null` or
    /// `"NULL"` match `IS NULL`, `"NOT NULL"` matches `IS NOT NULL`, and
    /// `Bool(false)` conditions are skipped. A `limit` of `None` or 0 returns
    /// every match; `offset` applies only together with a limit.
    pub fn select_where(
        conn: &Connection,
        table: &str,
        conditions: &[(&str, Value)],
        limit: Option<u64>,
        offset: u64,
        columns: Option<Vec<String>>,
    ) -> DbResult<Vec<Self>> {
        let sql = select_where_sql(
            conn,
            table,
            conditions.iter().map(|(c, v)| (*c, v)),
            limit,
            offset,
        );
        let mut result = conn.query(&sql)?.into_rows()?;
        let records = Self::build_from_result(table, &mut result, columns)?;
        result.free();
        Ok(records)
    }

    /// [`Record::select_where`] on the named registry connection.
    pub fn build_where_equals(
        registry: &Registry,
        table: &str,
        conditions: &[(&str, Value)],
        limit: Option<u64>,
        offset: u64,
        columns: Option<Vec<String>>,
        connection: &str,
    ) -> DbResult<Vec<Self>> {
        Self::select_where(
            &registry.get(connection)?,
            table,
            conditions,
            limit,
            offset,
            columns,
        )
    }
}
