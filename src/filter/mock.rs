use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{ExecFilter, ExecOutcome, Operation, PassThroughFilter};
use crate::database::core::DatabaseConn;

type MockResponse = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Substitutes canned results for failing commands whose SQL matches exactly
///
/// The inner filter runs first. When it fails, the SQL text the command ran
/// last is compared against the registered patterns; on an exact match
/// (case and whitespace included) the canned value is returned instead of
/// the failure. Any other failure is passed on untouched.
///
/// ```rust,ignore
/// let filter = MockFilter::new().on_sql("exec sp_name @firstName, @age", || Person {
///     first_name: "Mocked".to_string(),
///     ..Default::default()
/// });
/// ```
#[derive(Clone)]
pub struct MockFilter {
    inner: Arc<dyn ExecFilter>,
    responses: BTreeMap<String, MockResponse>,
}

impl MockFilter {
    /// Mock layer over the default pass-through filter
    pub fn new() -> Self {
        Self::wrapping(Arc::new(PassThroughFilter))
    }

    /// Mock layer over `inner`
    pub fn wrapping(inner: Arc<dyn ExecFilter>) -> Self {
        Self {
            inner,
            responses: BTreeMap::new(),
        }
    }

    /// Register a factory producing the substitute for `sql`
    pub fn on_sql<T, F>(mut self, sql: impl Into<String>, make: F) -> Self
    where
        T: 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.responses.insert(
            sql.into(),
            Arc::new(move || Box::new(make()) as Box<dyn Any>),
        );
        self
    }

    /// Register a fixed substitute for `sql`
    pub fn on_sql_value<T>(self, sql: impl Into<String>, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.on_sql(sql, move || value.clone())
    }

    /// Whether `sql` has a registered substitute
    pub fn matches(&self, sql: &str) -> bool {
        self.responses.contains_key(sql)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.responses.keys().map(String::as_str)
    }
}

impl Default for MockFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFilter")
            .field("inner", &self.inner)
            .field("patterns", &self.patterns().collect::<Vec<_>>())
            .finish()
    }
}

impl ExecFilter for MockFilter {
    fn exec_dyn(&self, db: &DatabaseConn, op: &mut Operation<'_>) -> ExecOutcome {
        match self.inner.exec_dyn(db, op) {
            ExecOutcome::Failed(failure) => {
                let response = failure
                    .last_sql
                    .as_deref()
                    .and_then(|sql| self.responses.get(sql));
                match response {
                    Some(respond) => ExecOutcome::Completed(Some(respond())),
                    None => ExecOutcome::Failed(failure),
                }
            }
            completed => completed,
        }
    }
}
