use bitflags::bitflags;
use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{MySqlBufExt, ProtocolDecode};

/// The special collation id that marks a blob-family column as raw bytes.
pub(crate) const COLLATE_BINARY: u16 = 63;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnFlags: u16 {
        /// Field cannot be `NULL`.
        const NOT_NULL = 1;

        /// Field is part of a primary key.
        const PRIMARY_KEY = 2;

        /// Field is part of a unique key.
        const UNIQUE_KEY = 4;

        /// Field is part of a non-unique key.
        const MULTIPLE_KEY = 8;

        /// Field is a blob.
        const BLOB = 16;

        /// Field is unsigned.
        const UNSIGNED = 32;

        /// Field is zero-filled.
        const ZEROFILL = 64;

        /// Field is binary.
        const BINARY = 128;

        /// Field is an enumeration.
        const ENUM = 256;

        /// Field is auto-incremented.
        const AUTO_INCREMENT = 512;

        /// Field is a timestamp.
        const TIMESTAMP = 1024;

        /// Field is a set.
        const SET = 2048;

        /// Field does not have a default value.
        const NO_DEFAULT_VALUE = 4096;

        /// Field is set to NOW on UPDATE.
        const ON_UPDATE_NOW = 8192;

        /// Field is a number.
        const NUM = 32768;
    }
}

/// Type code of a column or parameter on the wire.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/field__types_8h_source.html>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl ColumnType {
    pub(crate) fn try_from_u8(id: u8) -> Result<Self> {
        Ok(match id {
            0x00 => ColumnType::Decimal,
            0x01 => ColumnType::Tiny,
            0x02 => ColumnType::Short,
            0x03 => ColumnType::Long,
            0x04 => ColumnType::Float,
            0x05 => ColumnType::Double,
            0x06 => ColumnType::Null,
            0x07 => ColumnType::Timestamp,
            0x08 => ColumnType::LongLong,
            0x09 => ColumnType::Int24,
            0x0a => ColumnType::Date,
            0x0b => ColumnType::Time,
            0x0c => ColumnType::Datetime,
            0x0d => ColumnType::Year,
            0x0f => ColumnType::VarChar,
            0x10 => ColumnType::Bit,
            0xf5 => ColumnType::Json,
            0xf6 => ColumnType::NewDecimal,
            0xf7 => ColumnType::Enum,
            0xf8 => ColumnType::Set,
            0xf9 => ColumnType::TinyBlob,
            0xfa => ColumnType::MediumBlob,
            0xfb => ColumnType::LongBlob,
            0xfc => ColumnType::Blob,
            0xfd => ColumnType::VarString,
            0xfe => ColumnType::String,
            0xff => ColumnType::Geometry,

            _ => {
                return Err(err_protocol!("unknown column type 0x{:02x}", id));
            }
        })
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            ColumnType::Decimal | ColumnType::NewDecimal => "DECIMAL",
            ColumnType::Tiny => "TINYINT",
            ColumnType::Short => "SMALLINT",
            ColumnType::Long => "INT",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Null => "NULL",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::LongLong => "BIGINT",
            ColumnType::Int24 => "MEDIUMINT",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Datetime => "DATETIME",
            ColumnType::Year => "YEAR",
            ColumnType::VarChar | ColumnType::VarString => "VARCHAR",
            ColumnType::Bit => "BIT",
            ColumnType::Json => "JSON",
            ColumnType::Enum => "ENUM",
            ColumnType::Set => "SET",
            ColumnType::TinyBlob => "TINYBLOB",
            ColumnType::MediumBlob => "MEDIUMBLOB",
            ColumnType::LongBlob => "LONGBLOB",
            ColumnType::Blob => "BLOB",
            ColumnType::String => "CHAR",
            ColumnType::Geometry => "GEOMETRY",
        }
    }
}

/// Describes one output column of a result set.
///
/// <https://dev.mysql.com/doc/internals/en/com-query-response.html#column-definition>
/// <https://mariadb.com/kb/en/resultset/#column-definition-packet>
#[derive(Debug)]
pub(crate) struct ColumnDefinition {
    #[allow(unused)]
    pub(crate) schema: String,
    #[allow(unused)]
    pub(crate) table: String,
    pub(crate) alias: String,
    pub(crate) name: String,
    pub(crate) charset: u16,
    pub(crate) max_size: u32,
    pub(crate) r#type: ColumnType,
    pub(crate) flags: ColumnFlags,
    #[allow(unused)]
    pub(crate) decimals: u8,
}

impl ProtocolDecode for ColumnDefinition {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        // catalog : string<lenenc> (always "def")
        let _catalog = buf.get_bytes_lenenc()?;

        let schema = buf.get_str_lenenc()?;

        // the table name after aliasing by the query
        let _table_alias = buf.get_str_lenenc()?;
        let table = buf.get_str_lenenc()?;

        // the column name after aliasing; what the caller indexes by
        let alias = buf.get_str_lenenc()?;
        let name = buf.get_str_lenenc()?;

        // length of the fixed fields; conventionally 0x0c
        let _fixed_len = buf.get_uint_lenenc();

        if buf.remaining() < 10 {
            return Err(err_protocol!(
                "column definition truncated at its fixed fields"
            ));
        }

        let charset = buf.get_u16_le();
        let max_size = buf.get_u32_le();
        let type_id = buf.get_u8();
        let flags = ColumnFlags::from_bits_truncate(buf.get_u16_le());
        let decimals = buf.get_u8();

        Ok(Self {
            schema,
            table,
            alias,
            name,
            charset,
            max_size,
            r#type: ColumnType::try_from_u8(type_id)?,
            flags,
            decimals,
        })
    }
}

impl ColumnDefinition {
    /// The name the caller sees: the alias when present, the column name
    /// otherwise.
    pub(crate) fn display_name(&self) -> &str {
        if self.alias.is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

}
