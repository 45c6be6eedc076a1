use chrono::{NaiveDate, NaiveDateTime};

use crate::io::BufMutExt;
use crate::protocol::text::ColumnType;

/// A dynamically typed value bound to a prepared-statement parameter.
///
/// The wire type is inferred from the variant and magnitude; see
/// [`MySqlArgument::wire_type`].
#[derive(Debug, Clone, PartialEq)]
pub enum MySqlArgument {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl MySqlArgument {
    pub(crate) fn is_null(&self) -> bool {
        matches!(self, MySqlArgument::Null)
    }

    /// The declared parameter type and the unsigned-flag byte for the
    /// COM_STMT_EXECUTE type block.
    ///
    /// Integers take the narrowest signed type that holds the value; byte
    /// sequences take a blob type by length threshold.
    pub(crate) fn wire_type(&self) -> (ColumnType, u8) {
        const UNSIGNED: u8 = 0x80;

        match self {
            MySqlArgument::Null => (ColumnType::Null, 0),
            MySqlArgument::Bool(_) => (ColumnType::Tiny, 0),

            MySqlArgument::Int(v) => match v {
                -128..=127 => (ColumnType::Tiny, 0),
                -32_768..=32_767 => (ColumnType::Short, 0),
                -2_147_483_648..=2_147_483_647 => (ColumnType::Long, 0),
                _ => (ColumnType::LongLong, 0),
            },

            MySqlArgument::UInt(v) => match v {
                0..=0xff => (ColumnType::Tiny, UNSIGNED),
                0x100..=0xffff => (ColumnType::Short, UNSIGNED),
                0x1_0000..=0xffff_ffff => (ColumnType::Long, UNSIGNED),
                _ => (ColumnType::LongLong, UNSIGNED),
            },

            MySqlArgument::Double(_) => (ColumnType::Double, 0),
            MySqlArgument::Text(_) => (ColumnType::VarString, 0),

            MySqlArgument::Bytes(v) => match v.len() {
                0..=255 => (ColumnType::TinyBlob, 0),
                256..=65_535 => (ColumnType::MediumBlob, 0),
                65_536..=16_777_215 => (ColumnType::LongBlob, 0),
                _ => (ColumnType::Blob, 0),
            },

            MySqlArgument::DateTime(_) => (ColumnType::Datetime, 0),
        }
    }

    /// Append the binary-protocol encoding of this value.
    ///
    /// NULL writes nothing; its presence is recorded in the NULL bitmap.
    pub(crate) fn encode_value(&self, buf: &mut Vec<u8>) {
        // cannot truncate: the width was chosen to hold the value
        #[allow(clippy::cast_possible_truncation)]
        match self {
            MySqlArgument::Null => {}

            MySqlArgument::Bool(v) => buf.push(u8::from(*v)),

            MySqlArgument::Int(v) => match self.wire_type().0 {
                ColumnType::Tiny => buf.extend_from_slice(&(*v as i8).to_le_bytes()),
                ColumnType::Short => buf.extend_from_slice(&(*v as i16).to_le_bytes()),
                ColumnType::Long => buf.extend_from_slice(&(*v as i32).to_le_bytes()),
                _ => buf.extend_from_slice(&v.to_le_bytes()),
            },

            MySqlArgument::UInt(v) => match self.wire_type().0 {
                ColumnType::Tiny => buf.push(*v as u8),
                ColumnType::Short => buf.extend_from_slice(&(*v as u16).to_le_bytes()),
                ColumnType::Long => buf.extend_from_slice(&(*v as u32).to_le_bytes()),
                _ => buf.extend_from_slice(&v.to_le_bytes()),
            },

            MySqlArgument::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),

            MySqlArgument::Text(v) => buf.put_str_lenenc(v),
            MySqlArgument::Bytes(v) => buf.put_bytes_lenenc(v),

            MySqlArgument::DateTime(v) => crate::types::encode_datetime(buf, v),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for MySqlArgument {
            fn from(v: $ty) -> Self {
                MySqlArgument::Int(i64::from(v))
            }
        }
    )*};
}

macro_rules! impl_from_uint {
    ($($ty:ty),*) => {$(
        impl From<$ty> for MySqlArgument {
            fn from(v: $ty) -> Self {
                MySqlArgument::UInt(u64::from(v))
            }
        }
    )*};
}

impl_from_int!(i8, i16, i32, i64);
impl_from_uint!(u8, u16, u32, u64);

impl From<bool> for MySqlArgument {
    fn from(v: bool) -> Self {
        MySqlArgument::Bool(v)
    }
}

impl From<f32> for MySqlArgument {
    fn from(v: f32) -> Self {
        MySqlArgument::Double(f64::from(v))
    }
}

impl From<f64> for MySqlArgument {
    fn from(v: f64) -> Self {
        MySqlArgument::Double(v)
    }
}

impl From<&str> for MySqlArgument {
    fn from(v: &str) -> Self {
        MySqlArgument::Text(v.to_owned())
    }
}

impl From<String> for MySqlArgument {
    fn from(v: String) -> Self {
        MySqlArgument::Text(v)
    }
}

impl From<&[u8]> for MySqlArgument {
    fn from(v: &[u8]) -> Self {
        MySqlArgument::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for MySqlArgument {
    fn from(v: Vec<u8>) -> Self {
        MySqlArgument::Bytes(v)
    }
}

impl From<NaiveDateTime> for MySqlArgument {
    fn from(v: NaiveDateTime) -> Self {
        MySqlArgument::DateTime(v)
    }
}

impl From<NaiveDate> for MySqlArgument {
    fn from(v: NaiveDate) -> Self {
        MySqlArgument::DateTime(v.and_hms_opt(0, 0, 0).unwrap_or_default())
    }
}

impl<T> From<Option<T>> for MySqlArgument
where
    T: Into<MySqlArgument>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(MySqlArgument::Null, Into::into)
    }
}

/// Build a positional parameter list from a comma-separated list of values.
///
/// ```
/// use myco::params;
///
/// let args = params![42, "hello", None::<i64>];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::MySqlArgument>::new() };

    ($($value:expr),+ $(,)?) => {
        <::std::vec::Vec<$crate::MySqlArgument>>::from([
            $($crate::MySqlArgument::from($value)),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::MySqlArgument;
    use crate::protocol::text::ColumnType;

    #[test]
    fn test_integer_narrowing() {
        let cases: &[(i64, ColumnType)] = &[
            (0, ColumnType::Tiny),
            (-128, ColumnType::Tiny),
            (127, ColumnType::Tiny),
            (128, ColumnType::Short),
            (-32_768, ColumnType::Short),
            (32_768, ColumnType::Long),
            (-2_147_483_648, ColumnType::Long),
            (2_147_483_648, ColumnType::LongLong),
            (i64::MIN, ColumnType::LongLong),
        ];

        for (value, expected) in cases {
            assert_eq!(MySqlArgument::Int(*value).wire_type().0, *expected, "{value}");
        }
    }

    #[test]
    fn test_unsigned_carries_flag() {
        let (ty, flags) = MySqlArgument::UInt(255).wire_type();

        assert_eq!(ty, ColumnType::Tiny);
        assert_eq!(flags, 0x80);
    }

    #[test]
    fn test_blob_thresholds() {
        assert_eq!(
            MySqlArgument::Bytes(vec![0; 255]).wire_type().0,
            ColumnType::TinyBlob
        );
        assert_eq!(
            MySqlArgument::Bytes(vec![0; 256]).wire_type().0,
            ColumnType::MediumBlob
        );
        assert_eq!(
            MySqlArgument::Bytes(vec![0; 70_000]).wire_type().0,
            ColumnType::LongBlob
        );
    }

    #[test]
    fn test_encode_tiny_int() {
        let mut buf = Vec::new();
        MySqlArgument::Int(-1).encode_value(&mut buf);

        assert_eq!(buf, [0xff]);
    }

    #[test]
    fn test_encode_text_is_length_encoded() {
        let mut buf = Vec::new();
        MySqlArgument::from("ab").encode_value(&mut buf);

        assert_eq!(buf, [0x02, b'a', b'b']);
    }

    #[test]
    fn test_option_binds_null() {
        assert!(MySqlArgument::from(None::<i64>).is_null());
        assert_eq!(MySqlArgument::from(Some(3_i64)), MySqlArgument::Int(3));
    }
}
