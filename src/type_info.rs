use std::fmt::{self, Display, Formatter};

use crate::protocol::text::{ColumnDefinition, ColumnFlags, ColumnType, COLLATE_BINARY};

/// Provides information about a MySQL column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlTypeInfo {
    pub(crate) r#type: ColumnType,
    pub(crate) charset: u16,
    pub(crate) flags: ColumnFlags,

    // (M) in types like TINYINT(M); 1 marks a BOOLEAN column
    pub(crate) max_size: u32,
}

impl MySqlTypeInfo {
    pub(crate) fn new(r#type: ColumnType, charset: u16, flags: ColumnFlags, max_size: u32) -> Self {
        Self {
            r#type,
            charset,
            flags,
            max_size,
        }
    }

    pub(crate) fn from_column(def: &ColumnDefinition) -> Self {
        Self {
            r#type: def.r#type,
            charset: def.charset,
            flags: def.flags,
            max_size: def.max_size,
        }
    }

    /// The wire type code of the column.
    #[must_use]
    pub fn r#type(&self) -> ColumnType {
        self.r#type
    }

    /// The SQL name for this type, e.g. `VARBINARY` or `BIGINT UNSIGNED`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        if self.is_boolean() {
            return "BOOLEAN";
        }

        // VARBINARY, BINARY, and BLOB share type codes with VARCHAR, CHAR,
        // and TEXT; a binary collation is the only difference
        match self.r#type {
            ColumnType::VarChar | ColumnType::VarString if self.is_binary_collation() => {
                "VARBINARY"
            }
            ColumnType::String if self.is_binary_collation() => "BINARY",
            ColumnType::Blob if self.is_binary_collation() => "BLOB",
            ColumnType::Blob => "TEXT",

            _ if self.flags.contains(ColumnFlags::UNSIGNED) => match self.r#type {
                ColumnType::Tiny => "TINYINT UNSIGNED",
                ColumnType::Short => "SMALLINT UNSIGNED",
                ColumnType::Int24 => "MEDIUMINT UNSIGNED",
                ColumnType::Long => "INT UNSIGNED",
                ColumnType::LongLong => "BIGINT UNSIGNED",
                other => other.name(),
            },

            other => other.name(),
        }
    }

    /// `true` if values of this column are delivered as raw bytes.
    ///
    /// GEOMETRY and BIT always are; the blob family is binary when the
    /// collation is the reserved binary collation or the BINARY flag is set.
    /// Everything else is textual and arrives as UTF-8.
    pub(crate) fn is_binary(&self) -> bool {
        match self.r#type {
            ColumnType::Geometry | ColumnType::Bit => true,

            ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
            | ColumnType::Blob => {
                self.charset == COLLATE_BINARY || self.flags.contains(ColumnFlags::BINARY)
            }

            _ => false,
        }
    }

    fn is_binary_collation(&self) -> bool {
        self.charset == COLLATE_BINARY || self.flags.contains(ColumnFlags::BINARY)
    }

    /// `true` for `TINYINT(1)`, which MySQL uses as its `BOOLEAN`.
    pub(crate) fn is_boolean(&self) -> bool {
        self.r#type == ColumnType::Tiny && self.max_size == 1
    }
}

impl Display for MySqlTypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
