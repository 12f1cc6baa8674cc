//! SQL dialects.
//!
//! A [`Syntax`] names the quoting conventions of one database family. It does
//! not try to unify dialects beyond identifier quoting, literal quoting, literal
//! escaping and the `LIMIT` form used by generated statements.
//!
//! Identifiers are wrapped in the dialect's quote character but never escaped.

use std::fmt;

/// A SQL dialect identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// Backtick identifiers, double-quoted literals, backslash escapes.
    Mysql,
    /// Double-quoted identifiers, single-quoted literals, doubled quotes.
    Sqlite,
    /// Double-quoted identifiers, single-quoted literals, doubled quotes.
    Postgres,
}

impl Syntax {
    /// Short dialect tag (`mysql`, `sqlite`, `postgres`).
    pub fn tag(self) -> &'static str {
        match self {
            Syntax::Mysql => "mysql",
            Syntax::Sqlite => "sqlite",
            Syntax::Postgres => "postgres",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mysql" => Some(Syntax::Mysql),
            "sqlite" => Some(Syntax::Sqlite),
            "postgres" | "postgresql" => Some(Syntax::Postgres),
            _ => None,
        }
    }

    /// Wrap an identifier in the dialect's identifier quotes.
    pub fn quote_ident(self, name: &str) -> String {
        match self {
            Syntax::Mysql => format!("`{name}`"),
            Syntax::Sqlite | Syntax::Postgres => format!("\"{name}\""),
        }
    }

    /// Wrap an already-escaped literal body in the dialect's string quotes.
    pub fn quote_literal(self, escaped: &str) -> String {
        match self {
            Syntax::Mysql => format!("\"{escaped}\""),
            Syntax::Sqlite | Syntax::Postgres => format!("'{escaped}'"),
        }
    }

    /// Escape a literal body so it is safe between [`Syntax::quote_literal`] quotes.
    pub fn escape(self, value: &str) -> String {
        match self {
            Syntax::Mysql => mysql_escape(value),
            Syntax::Sqlite | Syntax::Postgres => value.replace('\'', "''"),
        }
    }

    /// Boolean literal.
    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Syntax::Postgres, true) => "TRUE",
            (Syntax::Postgres, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Binary literal.
    pub fn blob_literal(self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        match self {
            Syntax::Mysql | Syntax::Sqlite => format!("X'{hex}'"),
            Syntax::Postgres => format!("'\\x{hex}'::bytea"),
        }
    }

    /// `LIMIT` clause with a leading space, or an empty string when `limit` is 0.
    pub fn limit_clause(self, limit: u64, offset: u64) -> String {
        if limit == 0 {
            return String::new();
        }
        match self {
            Syntax::Mysql if offset > 0 => format!(" LIMIT {offset},{limit}"),
            Syntax::Mysql => format!(" LIMIT {limit}"),
            Syntax::Sqlite | Syntax::Postgres if offset > 0 => {
                format!(" LIMIT {limit} OFFSET {offset}")
            }
            Syntax::Sqlite | Syntax::Postgres => format!(" LIMIT {limit}"),
        }
    }

    /// `INSERT` body used when no column is supplied.
    pub(crate) fn empty_insert_body(self) -> &'static str {
        match self {
            Syntax::Mysql => "() VALUES ()",
            Syntax::Sqlite | Syntax::Postgres => "DEFAULT VALUES",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Escaping as done by MySQL's `real_escape_string` for a UTF-8 connection.
fn mysql_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

/// What the literal encoder needs from a connection: its dialect and its escaper.
///
/// [`Syntax`] implements this directly so encoding can be exercised without a
/// live connection; [`crate::Connection`] forwards to its driver.
pub trait Dialect {
    fn syntax(&self) -> Syntax;

    fn escape(&self, value: &str) -> String {
        self.syntax().escape(value)
    }
}

impl Dialect for Syntax {
    fn syntax(&self) -> Syntax {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_escapes_like_real_escape_string() {
        assert_eq!(Syntax::Mysql.escape("O'Brien"), "O\\'Brien");
        assert_eq!(Syntax::Mysql.escape("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(Syntax::Mysql.escape("a\\b"), "a\\\\b");
        assert_eq!(Syntax::Mysql.escape("line\nbreak\r\0\x1a"), "line\\nbreak\\r\\0\\Z");
    }

    #[test]
    fn standard_dialects_double_single_quotes() {
        assert_eq!(Syntax::Sqlite.escape("O'Brien"), "O''Brien");
        assert_eq!(Syntax::Postgres.escape("a\\b"), "a\\b");
    }

    #[test]
    fn quoting() {
        assert_eq!(Syntax::Mysql.quote_ident("users"), "`users`");
        assert_eq!(Syntax::Sqlite.quote_ident("users"), "\"users\"");
        assert_eq!(Syntax::Mysql.quote_literal("x"), "\"x\"");
        assert_eq!(Syntax::Postgres.quote_literal("x"), "'x'");
    }

    #[test]
    fn limit_forms() {
        assert_eq!(Syntax::Mysql.limit_clause(10, 0), " LIMIT 10");
        assert_eq!(Syntax::Mysql.limit_clause(10, 20), " LIMIT 20,10");
        assert_eq!(Syntax::Postgres.limit_clause(10, 20), " LIMIT 10 OFFSET 20");
        assert_eq!(Syntax::Sqlite.limit_clause(0, 20), "");
    }

    #[test]
    fn literals_for_non_text_values() {
        assert_eq!(Syntax::Sqlite.bool_literal(true), "1");
        assert_eq!(Syntax::Postgres.bool_literal(false), "FALSE");
        assert_eq!(Syntax::Sqlite.blob_literal(&[0xde, 0xad]), "X'DEAD'");
        assert_eq!(Syntax::Postgres.blob_literal(&[0x01]), "'\\x01'::bytea");
    }

    #[test]
    fn tags_round_trip() {
        for syntax in [Syntax::Mysql, Syntax::Sqlite, Syntax::Postgres] {
            assert_eq!(Syntax::from_tag(syntax.tag()), Some(syntax));
        }
        assert_eq!(Syntax::from_tag("oracle"), None);
    }
}
