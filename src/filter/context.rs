use std::sync::Arc;

use anyhow::Result;

use super::{registry, ExecFilter, ExecFilterExt};
use crate::database::core::{Command, DatabaseConn};

/// Selects the filter a call site executes through
#[derive(Debug, Clone, Default)]
pub enum ExecContext {
    /// Whatever filter is active in the registry at call time
    #[default]
    Global,
    /// A filter fixed for this context, independent of the registry
    Pinned(Arc<dyn ExecFilter>),
}

impl ExecContext {
    pub fn pinned(filter: Arc<dyn ExecFilter>) -> Self {
        ExecContext::Pinned(filter)
    }

    /// Resolve the filter to use for the next call
    pub fn filter(&self) -> Arc<dyn ExecFilter> {
        match self {
            ExecContext::Global => registry::active_filter(),
            ExecContext::Pinned(filter) => filter.clone(),
        }
    }

    /// Resolve the filter and run `op` through it
    pub fn exec<T, F>(&self, db: &DatabaseConn, op: F) -> Result<T>
    where
        T: Default + 'static,
        F: FnMut(&mut Command<'_>) -> Result<T>,
    {
        self.filter().exec(db, op)
    }
}
