//! Bundled vendor drivers.
//!
//! Each driver lives behind a cargo feature of the same name. Third-party
//! drivers implement [`crate::Driver`] and [`crate::ResultHandle`] directly.

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use crate::syntax::Syntax;

/// `table` rendered as a string literal for metadata lookups.
pub(crate) fn table_literal(syntax: Syntax, table: &str) -> String {
    syntax.quote_literal(&syntax.escape(table))
}
