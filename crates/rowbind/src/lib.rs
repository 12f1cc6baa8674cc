//! # rowbind
//!
//! Single-row active records over a vendor-neutral, blocking SQL connection
//! layer.
//!
//! ## Features
//!
//! - **Named connections**: a [`Registry`] maps names to [`Connection`]s, each
//!   wrapping one vendor [`Driver`] (SQLite and PostgreSQL ship built in)
//! - **Schema cache**: table, column, primary key and autoincrement lookups are
//!   memoized per connection
//! - **Cursors**: [`ResultSet`] walks a result forwards, backwards or by index
//! - **Active records**: a [`Record`] binds to one row by key, stages writes in
//!   a buffer and fetches the row lazily
//! - **Query hooks**: time, log, count or veto every statement
//!
//! ```ignore
//! use rowbind::{Connection, Record, Registry, DEFAULT_CONNECTION};
//!
//! let mut registry = Registry::new();
//! registry.add(DEFAULT_CONNECTION, Connection::open_sqlite("app.db")?);
//!
//! let mut user = Record::build_new(&registry, "users", DEFAULT_CONNECTION)?;
//! user.set("name", "Ada");
//! user.create()?;
//!
//! let adults = Record::build_where_equals(
//!     &registry,
//!     "users",
//!     &[("active", 1.into())],
//!     Some(10),
//!     0,
//!     None,
//!     DEFAULT_CONNECTION,
//! )?;
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod encode;
pub mod error;
pub mod monitor;
pub mod record;
pub mod registry;
pub mod result;
pub(crate) mod sql;
pub mod syntax;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConnectionConfig, RegistryConfig};
pub use connection::{Connection, Driver, Execution, QueryOutput, SchemaQuery};
pub use error::{DbError, DbResult};
pub use monitor::{
    CompositeHook, HookAction, QueryContext, QueryHook, QueryOutcome, QueryStats, QueryType,
    StatsHook, TracingSqlHook,
};
pub use record::{Existence, Record, RecordState};
pub use registry::{DEFAULT_CONNECTION, Registry};
pub use result::{BufferedRows, ResultHandle, ResultSet};
pub use syntax::{Dialect, Syntax};
pub use value::{Row, Value};

#[cfg(feature = "postgres")]
pub use driver::postgres::PostgresDriver;

#[cfg(feature = "sqlite")]
pub use driver::sqlite::SqliteDriver;
