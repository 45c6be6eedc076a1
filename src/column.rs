use crate::type_info::MySqlTypeInfo;

/// One output column of a result set.
#[derive(Debug, Clone)]
pub struct MySqlColumn {
    pub(crate) ordinal: usize,
    pub(crate) name: String,
    pub(crate) type_info: MySqlTypeInfo,
}

impl MySqlColumn {
    pub(crate) fn new(ordinal: usize, name: String, type_info: MySqlTypeInfo) -> Self {
        Self {
            ordinal,
            name,
            type_info,
        }
    }

    /// The zero-based position of the column in the result set.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// The column name or alias as selected by the query.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type information for the column.
    #[must_use]
    pub fn type_info(&self) -> &MySqlTypeInfo {
        &self.type_info
    }
}
