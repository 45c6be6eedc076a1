mod column;
mod ping;
mod query;
mod quit;
mod row;

pub(crate) use column::{ColumnDefinition, COLLATE_BINARY};
pub use column::{ColumnFlags, ColumnType};
pub(crate) use ping::Ping;
pub(crate) use query::{InitDb, Query};
pub(crate) use quit::Quit;
pub(crate) use row::TextRow;
