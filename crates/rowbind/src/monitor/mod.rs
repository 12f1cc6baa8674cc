//! Query hooks for statement execution.
//!
//! Every statement a [`crate::Connection`] runs, including the ones issued by
//! records and schema lookups, passes through the hooks attached to it:
//!
//! ```rust,ignore
//! use rowbind::monitor::{StatsHook, TracingSqlHook};
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let stats = Rc::new(StatsHook::new());
//! conn.add_hook(stats.clone());
//! conn.add_hook(Rc::new(
//!     TracingSqlHook::new().slow_threshold(Duration::from_millis(100)),
//! ));
//! ```

mod hooks;
mod tracing_hook;
mod types;


pub use hooks::{CompositeHook, QueryStats, StatsHook};
pub use tracing_hook::TracingSqlHook;
pub use types::{HookAction, QueryContext, QueryHook, QueryOutcome, QueryType};
