//! Process-wide active filter
//!
//! All call sites using [`ExecContext::Global`](super::ExecContext) read this
//! slot at call time. It starts out holding a [`PassThroughFilter`].
//!
//! The slot is shared by every thread in the process. Swapping it is meant
//! for scoped, single-owner use such as test setup: capture the current
//! filter, install a new one, do the work, then restore the captured filter
//! on every exit path. The registry never restores anything by itself;
//! [`install_scoped`] gives callers a guard that does.
//!
//! ```rust,ignore
//! let _guard = install_scoped(Arc::new(ReplayFilter::new(3)));
//! db.records().insert(&row)?; // inserted three times
//! // previous filter restored when `_guard` drops
//! ```
//!
//! Callers that run concurrently with different filters should pin them
//! with `ExecContext::Pinned` instead of sharing this slot.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use super::{ExecFilter, PassThroughFilter};

static ACTIVE_FILTER: OnceLock<RwLock<Arc<dyn ExecFilter>>> = OnceLock::new();

fn slot() -> &'static RwLock<Arc<dyn ExecFilter>> {
    ACTIVE_FILTER.get_or_init(|| RwLock::new(default_filter()))
}

/// A new instance of the default filter
pub fn default_filter() -> Arc<dyn ExecFilter> {
    Arc::new(PassThroughFilter)
}

/// The currently active filter
pub fn active_filter() -> Arc<dyn ExecFilter> {
    slot()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Install `filter` as the active filter, returning the one it replaced
pub fn set_active_filter(filter: Arc<dyn ExecFilter>) -> Arc<dyn ExecFilter> {
    debug!("installing execution filter {:?}", filter);
    let mut active = slot().write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *active, filter)
}

/// Install the default pass-through filter, returning the one it replaced
pub fn reset_active_filter() -> Arc<dyn ExecFilter> {
    set_active_filter(default_filter())
}

/// Whether `a` and `b` are the same filter instance
pub fn same_filter(a: &Arc<dyn ExecFilter>, b: &Arc<dyn ExecFilter>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Guard restoring the previously active filter when dropped
#[must_use = "the previous filter is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopedFilter {
    previous: Option<Arc<dyn ExecFilter>>,
}

impl ScopedFilter {
    /// The filter that will be restored
    pub fn previous(&self) -> Option<&Arc<dyn ExecFilter>> {
        self.previous.as_ref()
    }
}

impl Drop for ScopedFilter {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            set_active_filter(previous);
        }
    }
}

/// Capture the active filter and install `filter` until the guard drops
pub fn install_scoped(filter: Arc<dyn ExecFilter>) -> ScopedFilter {
    ScopedFilter {
        previous: Some(set_active_filter(filter)),
    }
}

/// Run `f` with `filter` installed, restoring the previous filter afterwards
pub fn with_filter<R>(filter: Arc<dyn ExecFilter>, f: impl FnOnce() -> R) -> R {
    let _guard = install_scoped(filter);
    f()
}

/// Serializes unit tests that swap the process-wide filter
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
