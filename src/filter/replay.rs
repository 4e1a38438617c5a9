use super::{run_with_command, ExecFilter, ExecOutcome, Operation};
use crate::database::core::DatabaseConn;

/// Runs each operation `replay_count` times against a single command
///
/// Only the last result is returned; with a count of zero the operation is
/// never invoked and callers get `T::default()`. Side effects multiply with
/// the count: an insert replayed three times persists three rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayFilter {
    replay_count: usize,
}

impl ReplayFilter {
    pub fn new(replay_count: usize) -> Self {
        Self { replay_count }
    }
}

impl ExecFilter for ReplayFilter {
    fn exec_dyn(&self, db: &DatabaseConn, op: &mut Operation<'_>) -> ExecOutcome {
        run_with_command(db, self.replay_count, op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ExecFilterExt;
    use anyhow::anyhow;

    fn log_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.conn
            .execute("CREATE TABLE log (id INTEGER PRIMARY KEY, msg TEXT)", [])
            .unwrap();
        db
    }

    fn log_count(db: &DatabaseConn) -> u64 {
        db.conn
            .query_row("SELECT COUNT(*) FROM log", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_replay_multiplies_side_effects() {
        let db = log_db();
        let rowid: i64 = ReplayFilter::new(3)
            .exec(&db, |cmd| {
                cmd.execute("INSERT INTO log (msg) VALUES (?1)", ["again"])?;
                Ok(cmd.last_insert_rowid())
            })
            .unwrap();

        assert_eq!(log_count(&db), 3);
        assert_eq!(rowid, 3);
    }

    #[test]
    fn test_replay_uses_one_command() {
        let db = log_db();
        let executions: u64 = ReplayFilter::new(5)
            .exec(&db, |cmd| {
                cmd.execute("INSERT INTO log (msg) VALUES (?1)", ["x"])?;
                Ok(cmd.executions())
            })
            .unwrap();

        assert_eq!(executions, 5);
        assert_eq!(db.command_stats().created, 1);
        assert_eq!(db.command_stats().disposed, 1);
    }

    #[test]
    fn test_zero_replays_returns_default() {
        let db = log_db();
        let mut calls = 0;
        let value: String = ReplayFilter::new(0)
            .exec(&db, |cmd| {
                calls += 1;
                cmd.execute("INSERT INTO log (msg) VALUES (?1)", ["never"])?;
                Ok("written".to_string())
            })
            .unwrap();

        assert_eq!(value, String::new());
        assert_eq!(calls, 0);
        assert_eq!(log_count(&db), 0);
        assert_eq!(db.command_stats().outstanding(), 0);
    }

    #[test]
    fn test_failure_mid_replay_releases_command() {
        let db = log_db();
        let mut calls = 0;
        let err = ReplayFilter::new(4)
            .exec(&db, |cmd| {
                calls += 1;
                if calls == 2 {
                    return Err(anyhow!("replay {} failed", calls));
                }
                cmd.execute("INSERT INTO log (msg) VALUES (?1)", ["partial"])
            })
            .unwrap_err();

        assert_eq!(err.to_string(), "replay 2 failed");
        assert_eq!(calls, 2);
        assert_eq!(log_count(&db), 1);
        assert_eq!(db.command_stats().created, 1);
        assert_eq!(db.command_stats().disposed, 1);
    }
}
