use bytes::{Buf, Bytes};

use crate::column::MySqlColumn;
use crate::error::{Error, Result};
use crate::io::{MySqlBufExt, ProtocolDecode};
use crate::protocol::text::ColumnType;

/// One binary-protocol result row: tag byte 0x00, a NULL bitmap offset by
/// two bits, then the non-NULL values in column order.
///
/// <https://dev.mysql.com/doc/internals/en/binary-protocol-resultset-row.html>
#[derive(Debug)]
pub(crate) struct BinaryRow {
    pub(crate) values: Vec<Option<Bytes>>,
}

impl<'a> ProtocolDecode<&'a [MySqlColumn]> for BinaryRow {
    fn decode_with(mut buf: Bytes, columns: &'a [MySqlColumn]) -> Result<Self, Error> {
        let header = buf.get_u8();
        if header != 0x00 {
            return Err(err_protocol!(
                "expected 0x00 (binary row) but found 0x{:02x}",
                header
            ));
        }

        let bitmap_len = (columns.len() + 9) / 8;

        if buf.remaining() < bitmap_len {
            return Err(err_protocol!("binary row shorter than its NULL bitmap"));
        }

        let bitmap = buf.split_to(bitmap_len);

        let mut values = Vec::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            // the first two bits of the bitmap are reserved
            let offset = i + 2;

            if bitmap[offset / 8] & (1 << (offset % 8)) != 0 {
                values.push(None);
                continue;
            }

            values.push(Some(take_value(&mut buf, column.type_info().r#type())?));
        }

        Ok(Self { values })
    }
}

/// Split the wire encoding of a single value off the front of `buf`.
///
/// Length-prefixed temporals keep their leading length byte so the value
/// reader can distinguish the 0/4/7/11 (or 0/8/12) layouts.
fn take_value(buf: &mut Bytes, r#type: ColumnType) -> Result<Bytes> {
    let fixed = match r#type {
        ColumnType::Null => Some(0),
        ColumnType::Tiny => Some(1),
        ColumnType::Short | ColumnType::Year => Some(2),
        ColumnType::Long | ColumnType::Int24 | ColumnType::Float => Some(4),
        ColumnType::LongLong | ColumnType::Double => Some(8),

        ColumnType::Date
        | ColumnType::Datetime
        | ColumnType::Timestamp
        | ColumnType::Time => {
            let len = *buf.first().ok_or_else(|| err_protocol!("binary row truncated"))? as usize;
            Some(len + 1)
        }

        // strings, blobs, decimals, enums, sets, bit, geometry, json
        _ => None,
    };

    match fixed {
        Some(len) => {
            if buf.remaining() < len {
                return Err(err_protocol!(
                    "binary row value needs {len} bytes but {} remain",
                    buf.remaining()
                ));
            }

            Ok(buf.split_to(len))
        }

        None => buf.get_bytes_lenenc(),
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryRow;
    use crate::column::MySqlColumn;
    use crate::io::ProtocolDecode;
    use crate::protocol::text::{ColumnFlags, ColumnType};
    use crate::type_info::MySqlTypeInfo;

    fn column(ordinal: usize, r#type: ColumnType) -> MySqlColumn {
        MySqlColumn::new(
            ordinal,
            format!("c{ordinal}"),
            MySqlTypeInfo::new(r#type, 45, ColumnFlags::empty(), 0),
        )
    }

    #[test]
    fn test_decode_ints_and_null() {
        let columns = [
            column(0, ColumnType::Long),
            column(1, ColumnType::VarString),
            column(2, ColumnType::Tiny),
        ];

        // NULL bitmap: column 1 is NULL -> bit 3 of byte 0
        const DATA: &[u8] = b"\x00\x08\x2a\x00\x00\x00\x01";

        let row = BinaryRow::decode_with(DATA.into(), &columns).unwrap();

        assert_eq!(row.values[0].as_deref(), Some(&b"\x2a\x00\x00\x00"[..]));
        assert_eq!(row.values[1], None);
        assert_eq!(row.values[2].as_deref(), Some(&b"\x01"[..]));
    }

    #[test]
    fn test_decode_datetime_keeps_length_prefix() {
        let columns = [column(0, ColumnType::Datetime)];

        // length 4: 2024-02-29
        const DATA: &[u8] = b"\x00\x00\x04\xe8\x07\x02\x1d";

        let row = BinaryRow::decode_with(DATA.into(), &columns).unwrap();

        assert_eq!(row.values[0].as_deref(), Some(&b"\x04\xe8\x07\x02\x1d"[..]));
    }

    #[test]
    fn test_rejects_wrong_tag() {
        let columns = [column(0, ColumnType::Tiny)];

        assert!(BinaryRow::decode_with(b"\x01\x00\x05".as_slice().into(), &columns).is_err());
    }

    #[test]
    fn test_bitmap_len_rounds_up() {
        // 7 columns need (7 + 9) / 8 = 2 bitmap bytes; all NULL
        let columns: Vec<_> = (0..7).map(|i| column(i, ColumnType::Tiny)).collect();

        const DATA: &[u8] = b"\x00\xfc\x01";

        let row = BinaryRow::decode_with(DATA.into(), &columns).unwrap();

        assert!(row.values.iter().all(Option::is_none));
    }
}
