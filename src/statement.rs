use std::sync::Arc;

use crate::column::MySqlColumn;

/// A statement prepared server-side, identified by its statement id.
///
/// The statement is only valid on the connection that prepared it; once that
/// connection closes, executing it fails with
/// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed).
#[derive(Debug, Clone)]
pub struct MySqlStatement {
    pub(crate) id: u32,
    pub(crate) parameters: usize,
    pub(crate) columns: Arc<Vec<MySqlColumn>>,
}

impl MySqlStatement {
    /// The server-assigned statement id.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of `?` parameters the statement takes.
    #[must_use]
    pub fn parameters(&self) -> usize {
        self.parameters
    }

    /// Output columns, as reported at prepare time.
    #[must_use]
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }
}
