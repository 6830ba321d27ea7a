use serde::Serialize;

use crate::betpool::resync::error::Result;
use crate::betpool::resync::model::Row;

/// Always-true delete predicate: matches every row whose `column` holds a
/// value. Keyed tables never store a null key, so this selects the whole
/// table without comparing against a literal of the column's type. The
/// backend refuses unfiltered deletes, so a logical truncate is expressed
/// this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFilter {
    pub column: String,
}

impl DeleteFilter {
    pub fn not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }

    /// Whether the filter selects the given row.
    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column).is_some_and(|value| !value.is_null())
    }

    /// The filter in PostgREST query syntax, as a `(key, value)` pair.
    pub fn query_pair(&self) -> (&str, &str) {
        (&self.column, "not.is.null")
    }
}

/// Write side of the relational backend.
///
/// Every call blocks until the backend has answered.
pub trait TableBackend {
    /// Deletes every row of `table` selected by `filter`.
    fn delete_where(&mut self, table: &str, filter: &DeleteFilter) -> Result<()>;

    /// Inserts `rows` into `table`, replacing any existing row that shares
    /// the `conflict_key` value. Applying the same batch twice must leave the
    /// table as applying it once.
    fn upsert(&mut self, table: &str, rows: &[Row], conflict_key: &str) -> Result<()>;
}

impl<B: TableBackend + ?Sized> TableBackend for &mut B {
    fn delete_where(&mut self, table: &str, filter: &DeleteFilter) -> Result<()> {
        (**self).delete_where(table, filter)
    }

    fn upsert(&mut self, table: &str, rows: &[Row], conflict_key: &str) -> Result<()> {
        (**self).upsert(table, rows, conflict_key)
    }
}
