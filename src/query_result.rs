use std::slice;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::column::MySqlColumn;
use crate::row::MySqlRow;

/// One result set of a query: its rows, columns, and completion counters.
#[derive(Debug, Clone)]
pub struct MySqlResultSet {
    pub(crate) affected_rows: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) columns: Arc<Vec<MySqlColumn>>,
    #[allow(unused)]
    pub(crate) column_names: Arc<HashMap<String, usize>>,
    pub(crate) rows: Vec<MySqlRow>,
}

impl MySqlResultSet {
    /// Number of rows affected, for a statement without output columns.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// The value of `AUTO_INCREMENT` generated by an `INSERT`, if any.
    #[must_use]
    pub fn last_insert_id(&self) -> u64 {
        self.last_insert_id
    }

    /// The output columns of the result set.
    #[must_use]
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    /// The materialized rows.
    #[must_use]
    pub fn rows(&self) -> &[MySqlRow] {
        &self.rows
    }
}

/// The complete response to a query.
///
/// A multi-statement query produces several result sets, kept here in
/// arrival order as a flat collection; [`next`](Self::next) and iteration
/// walk the chain. Accessors without an index read the first set.
#[derive(Debug, Clone)]
pub struct MySqlQueryResult {
    pub(crate) sets: Vec<MySqlResultSet>,
}

impl MySqlQueryResult {
    /// Number of columns in the first result set.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.sets.first().map_or(0, |s| s.columns.len())
    }

    /// Number of rows in the first result set.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.sets.first().map_or(0, |s| s.rows.len())
    }

    /// Rows affected by the first statement.
    #[must_use]
    pub fn affected_rows(&self) -> u64 {
        self.sets.first().map_or(0, MySqlResultSet::affected_rows)
    }

    /// `AUTO_INCREMENT` id generated by the first statement.
    #[must_use]
    pub fn last_insert_id(&self) -> u64 {
        self.sets.first().map_or(0, MySqlResultSet::last_insert_id)
    }

    /// Columns of the first result set.
    #[must_use]
    pub fn columns(&self) -> &[MySqlColumn] {
        self.sets.first().map_or(&[], |s| &s.columns[..])
    }

    /// Rows of the first result set.
    #[must_use]
    pub fn rows(&self) -> &[MySqlRow] {
        self.sets.first().map_or(&[], |s| &s.rows[..])
    }

    /// The result set following the first, when the query produced more
    /// than one.
    #[must_use]
    pub fn next(&self) -> Option<&MySqlResultSet> {
        self.sets.get(1)
    }

    /// All result sets, in the order the server emitted them.
    #[must_use]
    pub fn result_sets(&self) -> &[MySqlResultSet] {
        &self.sets
    }

    /// Iterate over the result sets in arrival order.
    pub fn iter(&self) -> slice::Iter<'_, MySqlResultSet> {
        self.sets.iter()
    }
}

impl<'a> IntoIterator for &'a MySqlQueryResult {
    type Item = &'a MySqlResultSet;
    type IntoIter = slice::Iter<'a, MySqlResultSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

impl IntoIterator for MySqlQueryResult {
    type Item = MySqlResultSet;
    type IntoIter = std::vec::IntoIter<MySqlResultSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.into_iter()
    }
}
