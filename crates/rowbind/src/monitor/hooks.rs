use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::types::{HookAction, QueryContext, QueryHook, QueryOutcome, QueryType};

/// Collected query statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Total number of statements executed.
    pub total_queries: u64,
    /// Statements that failed.
    pub failed_queries: u64,
    /// Total execution time.
    pub total_duration: Duration,
    pub select_count: u64,
    pub insert_count: u64,
    pub update_count: u64,
    pub delete_count: u64,
    /// Statements classified as [`QueryType::Other`].
    pub other_count: u64,
    /// Slowest statement duration.
    pub max_duration: Duration,
    /// Slowest statement SQL.
    pub slowest_query: Option<String>,
}

/// A hook that counts statements.
///
/// Attach it through an `Rc` to keep a handle for reading the counters:
///
/// ```rust,ignore
/// let stats = Rc::new(StatsHook::new());
/// conn.add_hook(stats.clone());
/// // ...
/// assert_eq!(stats.stats().select_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct StatsHook {
    stats: RefCell<QueryStats>,
}

impl StatsHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current statistics.
    pub fn stats(&self) -> QueryStats {
        self.stats.borrow().clone()
    }

    /// Total statements seen so far.
    pub fn total(&self) -> u64 {
        self.stats.borrow().total_queries
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        *self.stats.borrow_mut() = QueryStats::default();
    }
}

impl QueryHook for StatsHook {
    fn after_query(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        let mut stats = self.stats.borrow_mut();
        stats.total_queries += 1;
        stats.total_duration = stats.total_duration.saturating_add(duration);

        match ctx.query_type {
            QueryType::Select => stats.select_count += 1,
            QueryType::Insert => stats.insert_count += 1,
            QueryType::Update => stats.update_count += 1,
            QueryType::Delete => stats.delete_count += 1,
            QueryType::Other => stats.other_count += 1,
        }

        if outcome.is_error() {
            stats.failed_queries += 1;
        }

        if duration > stats.max_duration || stats.slowest_query.is_none() {
            stats.max_duration = duration;
            stats.slowest_query = Some(ctx.sql.clone());
        }
    }
}

/// A composite hook that runs multiple hooks in sequence.
///
/// `before_query` stops at the first hook that aborts.
#[derive(Default)]
pub struct CompositeHook {
    hooks: Vec<Rc<dyn QueryHook>>,
}

impl CompositeHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook.
    #[allow(clippy::should_implement_trait)]
    pub fn add<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Rc::new(hook));
        self
    }

    /// Add an already shared hook.
    pub fn add_rc(mut self, hook: Rc<dyn QueryHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl QueryHook for CompositeHook {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        for hook in &self.hooks {
            if let action @ HookAction::Abort(_) = hook.before_query(ctx) {
                return action;
            }
        }
        HookAction::Continue
    }

    fn after_query(&self, ctx: &QueryContext, duration: Duration, outcome: &QueryOutcome) {
        for hook in &self.hooks {
            hook.after_query(ctx, duration, outcome);
        }
    }
}
