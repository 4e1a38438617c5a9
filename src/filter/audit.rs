use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::{ExecFilter, ExecOutcome, Operation, PassThroughFilter};
use crate::database::core::DatabaseConn;

/// Execution counters collected by an [`AuditFilter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub executions: u64,
    pub failures: u64,
}

/// Logs every execution of the wrapped filter
///
/// Results and failures are passed on unchanged.
#[derive(Debug)]
pub struct AuditFilter {
    inner: Arc<dyn ExecFilter>,
    label: String,
    executions: AtomicU64,
    failures: AtomicU64,
}

impl AuditFilter {
    pub fn new(label: impl Into<String>) -> Self {
        Self::wrapping(label, Arc::new(PassThroughFilter))
    }

    pub fn wrapping(label: impl Into<String>, inner: Arc<dyn ExecFilter>) -> Self {
        Self {
            inner,
            label: label.into(),
            executions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            executions: self.executions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl ExecFilter for AuditFilter {
    fn exec_dyn(&self, db: &DatabaseConn, op: &mut Operation<'_>) -> ExecOutcome {
        let started = Instant::now();
        let outcome = self.inner.exec_dyn(db, op);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.executions.fetch_add(1, Ordering::Relaxed);
        match &outcome {
            ExecOutcome::Completed(_) => {
                debug!(filter = %self.label, elapsed_ms, "command completed");
            }
            ExecOutcome::Failed(failure) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    filter = %self.label,
                    elapsed_ms,
                    sql = failure.last_sql.as_deref().unwrap_or("<none>"),
                    "command failed: {}",
                    failure.error
                );
            }
        }
        outcome
    }
}
