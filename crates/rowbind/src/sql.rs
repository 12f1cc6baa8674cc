//! Small helpers for inspecting raw SQL text.

/// Skip leading whitespace, comments and opening parentheses.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Case-insensitive keyword prefix check.
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) => prefix.eq_ignore_ascii_case(keyword),
        None => false,
    }
}

/// Table named by an `INSERT ... INTO` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InsertTarget<'a> {
    /// Table name without quotes or schema qualifier.
    pub table: &'a str,
    /// Whether the name was written as a quoted identifier.
    pub quoted: bool,
}

/// Find the target table of an insert. `None` for any other statement.
pub(crate) fn insert_target(sql: &str) -> Option<InsertTarget<'_>> {
    let s = strip_sql_prefix(sql);
    if !starts_with_keyword(s, "INSERT") {
        return None;
    }

    // Skip modifiers such as `OR IGNORE` up to `INTO`.
    let mut rest = &s["INSERT".len()..];
    loop {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        let (word, tail) = rest.split_at(end);
        rest = tail;
        if word.eq_ignore_ascii_case("INTO") {
            break;
        }
    }

    let mut rest = rest.trim_start();
    loop {
        let (target, tail) = read_identifier(rest)?;
        match tail.strip_prefix('.') {
            Some(next) => rest = next,
            None if target.table.is_empty() => return None,
            None => return Some(target),
        }
    }
}

fn read_identifier(s: &str) -> Option<(InsertTarget<'_>, &str)> {
    let close = match s.chars().next()? {
        '`' => '`',
        '"' => '"',
        '[' => ']',
        _ => {
            let end = s
                .find(|c: char| c.is_whitespace() || matches!(c, '(' | '.' | ';'))
                .unwrap_or(s.len());
            let (table, tail) = s.split_at(end);
            return Some((InsertTarget { table, quoted: false }, tail));
        }
    };
    let body = &s[1..];
    let end = body.find(close)?;
    let target = InsertTarget {
        table: &body[..end],
        quoted: true,
    };
    Some((target, &body[end + close.len_utf8()..]))
}

/// Truncate to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_parens() {
        assert_eq!(strip_sql_prefix("  -- note\n/* x */ (SELECT 1)"), "SELECT 1)");
        assert_eq!(strip_sql_prefix("-- only a comment"), "");
    }

    #[test]
    fn keyword_match_ignores_case() {
        assert!(starts_with_keyword("insert into t", "INSERT"));
        assert!(!starts_with_keyword("ins", "INSERT"));
    }

    #[test]
    fn insert_targets() {
        let bare = |table: &'static str| Some(InsertTarget { table, quoted: false });
        let quoted = |table: &'static str| Some(InsertTarget { table, quoted: true });

        assert_eq!(insert_target("INSERT INTO notes (code) VALUES ('a')"), bare("notes"));
        assert_eq!(insert_target("insert into notes(code) values ('a')"), bare("notes"));
        assert_eq!(insert_target("INSERT INTO t DEFAULT VALUES"), bare("t"));
        assert_eq!(insert_target("INSERT INTO `users` (`name`) VALUES (\"x\")"), quoted("users"));
        assert_eq!(insert_target("INSERT INTO \"Order Items\" VALUES (1)"), quoted("Order Items"));
        assert_eq!(insert_target("INSERT INTO [logs] VALUES (1)"), quoted("logs"));
        assert_eq!(insert_target("INSERT OR IGNORE INTO main.tags VALUES (1)"), bare("tags"));
        assert_eq!(insert_target("-- seed\nINSERT INTO public.\"users\" VALUES (1)"), quoted("users"));

        assert_eq!(insert_target("UPDATE notes SET body = 'x'"), None);
        assert_eq!(insert_target("INSERT notes VALUES (1)"), None);
        assert_eq!(insert_target("INSERT INTO \"unterminated VALUES (1)"), None);
        assert_eq!(insert_target("INSERT INTO"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("héllo", 2), "h");
        assert_eq!(truncate_sql_bytes("abc", 10), "abc");
    }
}
