use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{MySqlBufExt, ProtocolDecode};

/// One text-protocol result row: per column, either the NULL marker (0xfb)
/// or a length-encoded byte string.
#[derive(Debug)]
pub(crate) struct TextRow {
    pub(crate) values: Vec<Option<Bytes>>,
}

impl ProtocolDecode<usize> for TextRow {
    fn decode_with(mut buf: Bytes, columns: usize) -> Result<Self, Error> {
        let mut values = Vec::with_capacity(columns);

        for _ in 0..columns {
            if buf.is_empty() {
                return Err(err_protocol!("text row ended short of its column count"));
            }

            if buf.first() == Some(&0xfb) {
                buf.advance(1);
                values.push(None);
            } else {
                values.push(Some(buf.get_bytes_lenenc()?));
            }
        }

        Ok(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::TextRow;
    use crate::io::ProtocolDecode;

    #[test]
    fn test_decode_row_with_null() {
        const DATA: &[u8] = b"\x011\xfb\x05hello";

        let row = TextRow::decode_with(DATA.into(), 3).unwrap();

        assert_eq!(row.values.len(), 3);
        assert_eq!(row.values[0].as_deref(), Some(&b"1"[..]));
        assert_eq!(row.values[1], None);
        assert_eq!(row.values[2].as_deref(), Some(&b"hello"[..]));
    }
}
