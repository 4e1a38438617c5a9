pub mod config;
pub mod exec;
pub mod output;
pub mod query;

use anyhow::Result;
use execfilter::{database::ensure_data_dir, DatabaseConn, ExecContext, ExecFilterConfig};
use execfilter::ConnectionProvider;

/// Open the configured database and pin the configured filter chain
pub(crate) fn open(config: &ExecFilterConfig) -> Result<(DatabaseConn, ExecContext)> {
    if config.database_path.is_none() {
        ensure_data_dir(&config.data_dir)?;
    }
    let db = config.connection_provider().open_connection()?;
    Ok((db, ExecContext::pinned(config.build_filter())))
}
