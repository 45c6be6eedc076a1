use std::fmt::{self, Display, Formatter};

use bytes::{Buf, Bytes};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::protocol::text::{ColumnFlags, ColumnType};
use crate::type_info::MySqlTypeInfo;
use crate::types::MySqlTime;

/// The protocol a value arrived on, which decides its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlValueFormat {
    /// Length-encoded ASCII, as produced by `COM_QUERY`.
    Text,

    /// Fixed-width little-endian, as produced by `COM_STMT_EXECUTE`.
    Binary,
}

/// A single raw cell of a result row, borrowed from the row.
///
/// Conversions are opt-in and checked: only the pairings that make sense for
/// the column's declared type are permitted, everything else fails with
/// [`Error::ColumnDecode`].
#[derive(Debug, Clone, Copy)]
pub struct MySqlValueRef<'r> {
    pub(crate) value: Option<&'r Bytes>,
    pub(crate) format: MySqlValueFormat,
    pub(crate) type_info: &'r MySqlTypeInfo,
}

impl<'r> MySqlValueRef<'r> {
    /// `true` if the cell is SQL `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Type information of the owning column.
    #[must_use]
    pub fn type_info(&self) -> &MySqlTypeInfo {
        self.type_info
    }

    /// The raw bytes of the cell, exactly as they came off the wire
    /// (without any length prefix).
    #[must_use]
    pub fn as_bytes(&self) -> Option<&'r [u8]> {
        self.value.map(|v| &v[..])
    }

    fn bad_conversion(&self, to: &'static str) -> Error {
        Error::ColumnDecode {
            from: self.type_info.name(),
            to,
        }
    }

    fn expect_value(&self, to: &'static str) -> Result<&'r Bytes> {
        self.value.ok_or_else(|| Error::ColumnDecode { from: "NULL", to })
    }

    /// Read the cell as a UTF-8 string.
    ///
    /// Permitted for any textual cell; opaque (binary-classified) cells stay
    /// opaque.
    pub fn as_str(&self) -> Result<&'r str> {
        let value = self.expect_value("a string")?;

        if self.type_info.is_binary() {
            return Err(self.bad_conversion("a string"));
        }

        if self.format == MySqlValueFormat::Binary && !is_string_family(self.type_info.r#type) {
            // fixed-width binary cells have no textual form
            return Err(self.bad_conversion("a string"));
        }

        std::str::from_utf8(value)
            .map_err(|err| err_protocol!("string is not valid UTF-8: {err}"))
    }

    /// Read the cell as a boolean. Permitted only for `TINYINT(1)`.
    ///
    /// `"0"` (or byte 0) is `false`; anything non-zero is `true`.
    pub fn as_bool(&self) -> Result<bool> {
        if !self.type_info.is_boolean() {
            return Err(self.bad_conversion("a boolean"));
        }

        let value = self.expect_value("a boolean")?;

        Ok(match self.format {
            MySqlValueFormat::Text => value.as_ref() != b"0",
            MySqlValueFormat::Binary => value.first().copied().unwrap_or(0) != 0,
        })
    }

    /// Read the cell as a signed integer.
    ///
    /// Permitted for the integer family (TINY through BIGINT, MEDIUMINT,
    /// YEAR).
    pub fn as_i64(&self) -> Result<i64> {
        if !is_integer_family(self.type_info.r#type) {
            return Err(self.bad_conversion("an integer"));
        }

        let value = self.expect_value("an integer")?;

        match self.format {
            MySqlValueFormat::Text => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| self.bad_conversion("an integer")),

            MySqlValueFormat::Binary => {
                if self.type_info.flags.contains(ColumnFlags::UNSIGNED) {
                    i64::try_from(read_uint_le(value))
                        .map_err(|_| self.bad_conversion("an integer"))
                } else {
                    Ok(read_int_le(value))
                }
            }
        }
    }

    /// Read the cell as an unsigned integer.
    pub fn as_u64(&self) -> Result<u64> {
        if !is_integer_family(self.type_info.r#type) {
            return Err(self.bad_conversion("an unsigned integer"));
        }

        let value = self.expect_value("an unsigned integer")?;

        match self.format {
            MySqlValueFormat::Text => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| self.bad_conversion("an unsigned integer")),

            MySqlValueFormat::Binary => {
                if self.type_info.flags.contains(ColumnFlags::UNSIGNED) {
                    Ok(read_uint_le(value))
                } else {
                    u64::try_from(read_int_le(value))
                        .map_err(|_| self.bad_conversion("an unsigned integer"))
                }
            }
        }
    }

    /// Read the cell as a double. Permitted for the numeric families.
    pub fn as_f64(&self) -> Result<f64> {
        let ty = self.type_info.r#type;

        if !is_integer_family(ty) && !matches!(ty, ColumnType::Float | ColumnType::Double) {
            return Err(self.bad_conversion("a double"));
        }

        let value = self.expect_value("a double")?;

        match self.format {
            MySqlValueFormat::Text => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| self.bad_conversion("a double")),

            MySqlValueFormat::Binary => match ty {
                ColumnType::Float => {
                    let mut buf = &value[..];
                    Ok(f64::from(buf.get_f32_le()))
                }
                ColumnType::Double => {
                    let mut buf = &value[..];
                    Ok(buf.get_f64_le())
                }

                // cannot represent every i64 exactly; accepted for a double
                #[allow(clippy::cast_precision_loss)]
                _ => Ok(self.as_i64()? as f64),
            },
        }
    }

    /// Read the cell as a date-time.
    ///
    /// Permitted for DATE, DATETIME, and TIMESTAMP. The zero date decodes to
    /// `None`.
    pub fn as_datetime(&self) -> Result<Option<NaiveDateTime>> {
        if !matches!(
            self.type_info.r#type,
            ColumnType::Date | ColumnType::Datetime | ColumnType::Timestamp
        ) {
            return Err(self.bad_conversion("a date-time"));
        }

        let value = self.expect_value("a date-time")?;

        match self.format {
            MySqlValueFormat::Binary => crate::types::decode_datetime(value.clone()),

            MySqlValueFormat::Text => {
                let s = std::str::from_utf8(value)
                    .map_err(|err| err_protocol!("string is not valid UTF-8: {err}"))?;

                if s.starts_with("0000-00-00") {
                    return Ok(None);
                }

                if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    return Ok(date.and_hms_opt(0, 0, 0));
                }

                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .map(Some)
                    .map_err(|_| self.bad_conversion("a date-time"))
            }
        }
    }

    /// The "best native type" for this cell, following the column's declared
    /// type. DECIMAL stays a string to preserve precision.
    pub fn to_scalar(&self) -> Result<MySqlScalar> {
        if self.value.is_none() {
            return Ok(MySqlScalar::Null);
        }

        let ty = self.type_info.r#type;

        Ok(if self.type_info.is_boolean() {
            MySqlScalar::Bool(self.as_bool()?)
        } else if is_integer_family(ty) {
            if self.type_info.flags.contains(ColumnFlags::UNSIGNED) {
                MySqlScalar::UInt(self.as_u64()?)
            } else {
                MySqlScalar::Int(self.as_i64()?)
            }
        } else if matches!(ty, ColumnType::Float | ColumnType::Double) {
            MySqlScalar::Double(self.as_f64()?)
        } else if matches!(
            ty,
            ColumnType::Date | ColumnType::Datetime | ColumnType::Timestamp
        ) {
            match self.as_datetime()? {
                Some(dt) => MySqlScalar::DateTime(dt),
                None => MySqlScalar::Null,
            }
        } else if ty == ColumnType::Time && self.format == MySqlValueFormat::Binary {
            MySqlScalar::Time(MySqlTime::decode(self.expect_value("a time")?.clone())?)
        } else if self.type_info.is_binary() {
            MySqlScalar::Bytes(self.expect_value("bytes")?.to_vec())
        } else {
            MySqlScalar::String(self.as_str()?.to_owned())
        })
    }
}

/// A fully owned cell value in its best native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum MySqlScalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
    Time(MySqlTime),
}

impl Display for MySqlScalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MySqlScalar::Null => f.write_str("NULL"),
            MySqlScalar::Bool(v) => Display::fmt(v, f),
            MySqlScalar::Int(v) => Display::fmt(v, f),
            MySqlScalar::UInt(v) => Display::fmt(v, f),
            MySqlScalar::Double(v) => Display::fmt(v, f),
            MySqlScalar::String(v) => f.write_str(v),
            MySqlScalar::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            MySqlScalar::DateTime(v) => Display::fmt(v, f),
            MySqlScalar::Time(v) => Display::fmt(v, f),
        }
    }
}

fn is_integer_family(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::Tiny
            | ColumnType::Short
            | ColumnType::Long
            | ColumnType::LongLong
            | ColumnType::Int24
            | ColumnType::Year
    )
}

fn is_string_family(ty: ColumnType) -> bool {
    matches!(
        ty,
        ColumnType::VarChar
            | ColumnType::VarString
            | ColumnType::String
            | ColumnType::Enum
            | ColumnType::Set
            | ColumnType::Decimal
            | ColumnType::NewDecimal
            | ColumnType::Json
            | ColumnType::TinyBlob
            | ColumnType::MediumBlob
            | ColumnType::LongBlob
            | ColumnType::Blob
    )
}

// Fixed-width little-endian integers of 1, 2, 4, or 8 bytes.

fn read_uint_le(value: &Bytes) -> u64 {
    let mut buf = &value[..];

    match buf.len() {
        1 => u64::from(buf.get_u8()),
        2 => u64::from(buf.get_u16_le()),
        4 => u64::from(buf.get_u32_le()),
        _ => buf.get_u64_le(),
    }
}

fn read_int_le(value: &Bytes) -> i64 {
    let mut buf = &value[..];

    match buf.len() {
        1 => i64::from(buf.get_i8()),
        2 => i64::from(buf.get_i16_le()),
        4 => i64::from(buf.get_i32_le()),
        _ => buf.get_i64_le(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{MySqlScalar, MySqlValueFormat, MySqlValueRef};
    use crate::protocol::text::{ColumnFlags, ColumnType, COLLATE_BINARY};
    use crate::type_info::MySqlTypeInfo;

    fn value_ref<'r>(
        value: &'r Bytes,
        format: MySqlValueFormat,
        type_info: &'r MySqlTypeInfo,
    ) -> MySqlValueRef<'r> {
        MySqlValueRef {
            value: Some(value),
            format,
            type_info,
        }
    }

    #[test]
    fn test_text_int_parses_ascii() {
        let ty = MySqlTypeInfo::new(ColumnType::Long, 63, ColumnFlags::empty(), 11);
        let raw = Bytes::from_static(b"-42");

        let v = value_ref(&raw, MySqlValueFormat::Text, &ty);

        assert_eq!(v.as_i64().unwrap(), -42);
        assert_eq!(v.as_f64().unwrap(), -42.0);
        assert_eq!(v.as_str().unwrap(), "-42");
    }

    #[test]
    fn test_binary_unsigned_bigint() {
        let ty = MySqlTypeInfo::new(ColumnType::LongLong, 63, ColumnFlags::UNSIGNED, 20);
        let raw = Bytes::from_static(b"\xff\xff\xff\xff\xff\xff\xff\xff");

        let v = value_ref(&raw, MySqlValueFormat::Binary, &ty);

        assert_eq!(v.as_u64().unwrap(), u64::MAX);
        assert!(v.as_i64().is_err());
    }

    #[test]
    fn test_string_to_integer_is_rejected() {
        let ty = MySqlTypeInfo::new(ColumnType::VarString, 45, ColumnFlags::empty(), 255);
        let raw = Bytes::from_static(b"12");

        let v = value_ref(&raw, MySqlValueFormat::Text, &ty);

        assert!(v.as_i64().is_err());
        assert_eq!(v.as_str().unwrap(), "12");
    }

    #[test]
    fn test_boolean_requires_tiny_1() {
        let bool_ty = MySqlTypeInfo::new(ColumnType::Tiny, 63, ColumnFlags::empty(), 1);
        let int_ty = MySqlTypeInfo::new(ColumnType::Tiny, 63, ColumnFlags::empty(), 4);

        let zero = Bytes::from_static(b"0");
        let one = Bytes::from_static(b"1");

        assert!(!value_ref(&zero, MySqlValueFormat::Text, &bool_ty).as_bool().unwrap());
        assert!(value_ref(&one, MySqlValueFormat::Text, &bool_ty).as_bool().unwrap());

        assert!(value_ref(&one, MySqlValueFormat::Text, &int_ty).as_bool().is_err());
    }

    #[test]
    fn test_opaque_bytes_stay_opaque() {
        let ty = MySqlTypeInfo::new(ColumnType::Blob, COLLATE_BINARY, ColumnFlags::BINARY, 0);
        let raw = Bytes::from_static(b"\x01\x02\x03");

        let v = value_ref(&raw, MySqlValueFormat::Text, &ty);

        assert!(v.as_str().is_err());
        assert_eq!(v.as_bytes(), Some(&b"\x01\x02\x03"[..]));
        assert_eq!(v.to_scalar().unwrap(), MySqlScalar::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn test_decimal_stays_textual() {
        let ty = MySqlTypeInfo::new(ColumnType::NewDecimal, 63, ColumnFlags::empty(), 10);
        let raw = Bytes::from_static(b"3.1415");

        let v = value_ref(&raw, MySqlValueFormat::Text, &ty);

        assert_eq!(
            v.to_scalar().unwrap(),
            MySqlScalar::String("3.1415".to_owned())
        );
    }

    #[test]
    fn test_text_datetime() {
        let ty = MySqlTypeInfo::new(ColumnType::Datetime, 63, ColumnFlags::empty(), 19);
        let raw = Bytes::from_static(b"2024-02-29 13:37:00");

        let v = value_ref(&raw, MySqlValueFormat::Text, &ty);
        let dt = v.as_datetime().unwrap().unwrap();

        assert_eq!(dt.to_string(), "2024-02-29 13:37:00");

        let zero = Bytes::from_static(b"0000-00-00 00:00:00");
        let v = value_ref(&zero, MySqlValueFormat::Text, &ty);

        assert_eq!(v.as_datetime().unwrap(), None);
    }

    #[test]
    fn test_null_scalar() {
        let ty = MySqlTypeInfo::new(ColumnType::Long, 63, ColumnFlags::empty(), 11);

        let v = MySqlValueRef {
            value: None,
            format: MySqlValueFormat::Text,
            type_info: &ty,
        };

        assert!(v.is_null());
        assert_eq!(v.to_scalar().unwrap(), MySqlScalar::Null);
        assert!(v.as_i64().is_err());
    }
}
