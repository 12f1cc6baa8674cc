//! In-process driver doubles for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::connection::{Connection, Driver, Execution, SchemaQuery};
use crate::error::{DbError, DbResult};
use crate::result::{BufferedRows, ResultHandle};
use crate::syntax::Syntax;
use crate::value::{Row, Value};

type Responder = Box<dyn Fn(&str) -> DbResult<Execution>>;

/// A driver answering every statement with a closure and recording the SQL.
pub(crate) struct StubDriver {
    syntax: Syntax,
    open: Cell<bool>,
    log: Rc<RefCell<Vec<String>>>,
    respond: Responder,
}

impl StubDriver {
    pub(crate) fn new(
        syntax: Syntax,
        respond: impl Fn(&str) -> DbResult<Execution> + 'static,
    ) -> Self {
        Self {
            syntax,
            open: Cell::new(true),
            log: Rc::new(RefCell::new(Vec::new())),
            respond: Box::new(respond),
        }
    }

    pub(crate) fn log(&self) -> Rc<RefCell<Vec<String>>> {
        self.log.clone()
    }
}

impl Driver for StubDriver {
    fn tag(&self) -> &'static str {
        "stub"
    }

    fn syntax(&self) -> Syntax {
        self.syntax
    }

    fn execute(&self, sql: &str) -> DbResult<Execution> {
        if !self.open.get() {
            return Err(DbError::HandleUnavailable {
                connection: "stub".into(),
                driver: "stub".into(),
            });
        }
        self.log.borrow_mut().push(sql.to_string());
        (self.respond)(sql)
    }

    fn schema_sql(&self, query: SchemaQuery<'_>) -> String {
        format!("{query:?}")
    }

    fn close(&self) {
        self.open.set(false);
    }

    fn is_open(&self) -> bool {
        self.open.get()
    }
}

/// A stub connection plus the log of statements it received.
pub(crate) fn stub_connection(
    syntax: Syntax,
    respond: impl Fn(&str) -> DbResult<Execution> + 'static,
) -> (Connection, Rc<RefCell<Vec<String>>>) {
    let driver = StubDriver::new(syntax, respond);
    let log = driver.log();
    (Connection::new(driver), log)
}

pub(crate) fn make_rows(fields: &[&str], data: &[&[Value]]) -> Vec<Row> {
    data.iter()
        .map(|values| {
            fields
                .iter()
                .zip(values.iter())
                .map(|(f, v)| (f.to_string(), v.clone()))
                .collect::<Row>()
        })
        .collect()
}

/// A buffered result handle as an [`Execution`].
pub(crate) fn rows(fields: &[&str], data: &[&[Value]]) -> Execution {
    Execution::Rows(Box::new(BufferedRows::new(
        fields.iter().map(|f| f.to_string()).collect(),
        make_rows(fields, data),
    )))
}

/// A single-column result of names, as metadata lookups return.
pub(crate) fn names(values: &[&str]) -> Execution {
    let data: Vec<Vec<Value>> = values.iter().map(|v| vec![Value::from(*v)]).collect();
    let refs: Vec<&[Value]> = data.iter().map(Vec::as_slice).collect();
    rows(&["name"], &refs)
}

/// A handle that only supports row-at-a-time fetching.
pub(crate) struct SeekOnlyRows {
    pub(crate) fields: Vec<String>,
    pub(crate) rows: Vec<Row>,
    pub(crate) fetches: Rc<Cell<usize>>,
}

impl ResultHandle for SeekOnlyRows {
    fn count(&self) -> usize {
        self.rows.len()
    }

    fn fields(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn fetch(&mut self, index: usize) -> DbResult<Row> {
        self.fetches.set(self.fetches.get() + 1);
        self.rows
            .get(index)
            .cloned()
            .ok_or_else(|| DbError::Other(format!("no row {index}")))
    }
}
