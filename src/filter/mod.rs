//! Execution filters
//!
//! Every typed database operation runs through an [`ExecFilter`]. The filter
//! creates a [`Command`] on the connection, decides how many times the
//! operation runs against it, and releases the command afterwards.
//!
//! ```text
//! filter/
//! ├── passthrough  # default: one invocation
//! ├── replay       # N invocations against one command
//! ├── mock         # canned results for failing, exactly matching SQL
//! ├── audit        # tracing + counters around another filter
//! ├── registry     # process-wide active filter slot
//! └── context      # explicit filter selection per call site
//! ```
//!
//! Filters are object safe so they can live in the global registry as
//! `Arc<dyn ExecFilter>`. Typed execution goes through [`ExecFilterExt::exec`],
//! which erases the operation's result into a `Box<dyn Any>` and restores it
//! afterwards.
//!
//! ```rust,ignore
//! use execfilter::filter::{ExecFilterExt, ReplayFilter};
//!
//! let db = DatabaseConn::open_in_memory()?;
//! let rows = ReplayFilter::new(3).exec(&db, |cmd| {
//!     cmd.execute("INSERT INTO log (msg) VALUES (?1)", ["hello"])
//! })?;
//! ```

mod audit;
mod context;
mod mock;
mod passthrough;
pub mod registry;
mod replay;

pub use audit::{AuditFilter, AuditStats};
pub use context::ExecContext;
pub use mock::MockFilter;
pub use passthrough::PassThroughFilter;
pub use registry::{
    active_filter, default_filter, install_scoped, reset_active_filter, same_filter,
    set_active_filter, with_filter, ScopedFilter,
};
pub use replay::ReplayFilter;

use std::any::{type_name, Any};
use std::fmt;

use anyhow::{anyhow, Result};

use crate::database::core::{Command, DatabaseConn};

/// An operation with its result type erased
pub type Operation<'op> = dyn FnMut(&mut Command<'_>) -> Result<Box<dyn Any>> + 'op;

/// Failure of an execution, with the SQL the command ran last
#[derive(Debug)]
pub struct ExecFailure {
    pub error: anyhow::Error,
    pub last_sql: Option<String>,
}

/// Result of running an erased operation through a filter
pub enum ExecOutcome {
    /// The filter finished; `None` when the operation was never invoked
    Completed(Option<Box<dyn Any>>),
    Failed(ExecFailure),
}

impl ExecOutcome {
    /// Convert back into the caller's result type
    ///
    /// A completion without a value becomes `T::default()`. Failures are
    /// returned with the operation's own error untouched.
    pub fn into_result<T: Default + 'static>(self) -> Result<T> {
        match self {
            ExecOutcome::Completed(None) => Ok(T::default()),
            ExecOutcome::Completed(Some(value)) => value.downcast::<T>().map(|v| *v).map_err(|_| {
                anyhow!("execution filter did not produce a `{}`", type_name::<T>())
            }),
            ExecOutcome::Failed(failure) => Err(failure.error),
        }
    }
}

impl fmt::Debug for ExecOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecOutcome::Completed(value) => f
                .debug_tuple("Completed")
                .field(&value.as_ref().map(|_| "..."))
                .finish(),
            ExecOutcome::Failed(failure) => f.debug_tuple("Failed").field(failure).finish(),
        }
    }
}

/// Strategy controlling how a command is created, invoked and disposed
pub trait ExecFilter: Send + Sync + fmt::Debug {
    /// Run `op` against a command created on `db`
    ///
    /// Implementations must release every command they create on all exit
    /// paths, and must not touch the global registry.
    fn exec_dyn(&self, db: &DatabaseConn, op: &mut Operation<'_>) -> ExecOutcome;
}

/// Typed execution on top of [`ExecFilter::exec_dyn`]
pub trait ExecFilterExt: ExecFilter {
    fn exec<T, F>(&self, db: &DatabaseConn, mut op: F) -> Result<T>
    where
        T: Default + 'static,
        F: FnMut(&mut Command<'_>) -> Result<T>,
    {
        self.exec_dyn(db, &mut |cmd| {
            op(cmd).map(|value| Box::new(value) as Box<dyn Any>)
        })
        .into_result()
    }
}

impl<F: ExecFilter + ?Sized> ExecFilterExt for F {}

/// Create one command, invoke `op` up to `invocations` times and dispose it
///
/// Stops at the first failure. The last successful value is kept; with zero
/// invocations the outcome carries no value.
pub fn run_with_command(
    db: &DatabaseConn,
    invocations: usize,
    op: &mut Operation<'_>,
) -> ExecOutcome {
    let mut cmd = db.create_command();
    let mut last = None;
    for _ in 0..invocations {
        match op(&mut cmd) {
            Ok(value) => last = Some(value),
            Err(error) => {
                let last_sql = cmd.dispose();
                return ExecOutcome::Failed(ExecFailure { error, last_sql });
            }
        }
    }
    cmd.dispose();
    ExecOutcome::Completed(last)
}
