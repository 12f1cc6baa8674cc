use std::time::Duration;

use tracing::Level;

use super::types::{HookAction, QueryContext, QueryHook, QueryOutcome};
use crate::sql::truncate_sql_bytes;

/// A `tracing` hook that emits every statement before it runs, and a warning
/// for statements slower than a threshold.
///
/// Events use the `rowbind.sql` target.
#[derive(Debug, Clone)]
pub struct TracingSqlHook {
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Statements at least this slow are reported at `WARN`.
    pub slow_threshold: Option<Duration>,
}

impl Default for TracingSqlHook {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: None,
        }
    }
}

impl TracingSqlHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Warn about statements slower than `threshold`.
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryHook for TracingSqlHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&ctx.sql);
        let connection = ctx.connection.as_deref().unwrap_or("-");
        emit_at_level!(
            self.level,
            target: "rowbind.sql",
            query_type = ?ctx.query_type,
            connection,
            sql = %sql,
        );
        HookAction::Continue
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        let Some(threshold) = self.slow_threshold else {
            return;
        };
        if duration >= threshold {
            tracing::warn!(
                target: "rowbind.sql",
                query_type = ?ctx.query_type,
                connection = ctx.connection.as_deref().unwrap_or("-"),
                duration_ms = duration.as_millis() as u64,
                outcome = %outcome,
                sql = %self.truncate_sql(&ctx.sql),
                "slow query"
            );
        }
    }
}
