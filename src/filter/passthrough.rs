use super::{run_with_command, ExecFilter, ExecOutcome, Operation};
use crate::database::core::DatabaseConn;

/// Default filter: one command, one invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl ExecFilter for PassThroughFilter {
    fn exec_dyn(&self, db: &DatabaseConn, op: &mut Operation<'_>) -> ExecOutcome {
        run_with_command(db, 1, op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ExecFilterExt;
    use anyhow::anyhow;

    #[test]
    fn test_invokes_once_and_returns_value() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let mut calls = 0;
        let value: i64 = PassThroughFilter
            .exec(&db, |cmd| {
                calls += 1;
                cmd.query_row("SELECT 40 + 2", [], |row| row.get(0))
            })
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls, 1);
        assert_eq!(db.command_stats().created, 1);
        assert_eq!(db.command_stats().disposed, 1);
    }

    #[test]
    fn test_failure_propagates_after_release() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let err = PassThroughFilter
            .exec(&db, |_| -> anyhow::Result<()> { Err(anyhow!("constraint violated")) })
            .unwrap_err();

        assert_eq!(err.to_string(), "constraint violated");
        assert_eq!(db.command_stats().outstanding(), 0);
    }

    #[test]
    fn test_command_released_on_panic() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: anyhow::Result<()> = PassThroughFilter.exec(&db, |_| panic!("driver crashed"));
        }));

        assert!(result.is_err());
        assert_eq!(db.command_stats().created, 1);
        assert_eq!(db.command_stats().disposed, 1);
    }

    #[test]
    fn test_fresh_command_per_call() {
        let db = DatabaseConn::open_in_memory().unwrap();
        let first: u64 = PassThroughFilter.exec(&db, |cmd| Ok(cmd.id())).unwrap();
        let second: u64 = PassThroughFilter.exec(&db, |cmd| Ok(cmd.id())).unwrap();

        assert_eq!((first, second), (1, 2));
    }
}
