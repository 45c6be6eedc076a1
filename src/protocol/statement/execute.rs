use crate::arguments::MySqlArgument;
use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/mysql__com_8h.html#a3e5e9e744ff6f7b989a604fd669977da
const NO_CURSOR: u8 = 0;

/// Execute a prepared statement with bound parameter values.
///
/// <https://dev.mysql.com/doc/internals/en/com-stmt-execute.html>
#[derive(Debug)]
pub(crate) struct Execute<'q> {
    pub(crate) statement_id: u32,
    pub(crate) arguments: &'q [MySqlArgument],
}

impl ProtocolEncode<Capabilities> for Execute<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x17); // COM_STMT_EXECUTE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.push(NO_CURSOR);

        // number of times to execute the statement; can only be 1
        buf.extend_from_slice(&1_u32.to_le_bytes());

        if self.arguments.is_empty() {
            return Ok(());
        }

        // NULL bitmap : bit i of byte i/8 set iff parameter i is NULL
        let mut bitmap = vec![0_u8; (self.arguments.len() + 7) / 8];

        for (i, argument) in self.arguments.iter().enumerate() {
            if argument.is_null() {
                bitmap[i / 8] |= 1 << (i % 8);
            }
        }

        buf.extend_from_slice(&bitmap);

        // new-params-bound : always 1, we re-declare types on every execute
        buf.push(1);

        for argument in self.arguments {
            let (r#type, flags) = argument.wire_type();

            buf.push(r#type as u8);
            buf.push(flags);
        }

        for argument in self.arguments {
            argument.encode_value(buf);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Execute;
    use crate::arguments::MySqlArgument;
    use crate::io::ProtocolEncode;
    use crate::protocol::Capabilities;

    #[test]
    fn test_encode_no_parameters() {
        let mut buf = Vec::new();

        Execute {
            statement_id: 7,
            arguments: &[],
        }
        .encode_with(&mut buf, Capabilities::BASE)
        .unwrap();

        assert_eq!(buf, b"\x17\x07\x00\x00\x00\x00\x01\x00\x00\x00");
    }

    #[test]
    fn test_encode_null_bitmap_and_types() {
        let arguments = [
            MySqlArgument::Null,
            MySqlArgument::Int(5),
            MySqlArgument::from("ab"),
        ];

        let mut buf = Vec::new();

        Execute {
            statement_id: 1,
            arguments: &arguments,
        }
        .encode_with(&mut buf, Capabilities::BASE)
        .unwrap();

        // tag + id + cursor + iterations
        let body = &buf[10..];

        // one bitmap byte with bit 0 set, then new-params-bound
        assert_eq!(body[0], 0b0000_0001);
        assert_eq!(body[1], 1);

        // (type, flag) pairs: NULL, TINY, VAR_STRING
        assert_eq!(&body[2..8], &[0x06, 0, 0x01, 0, 0xfd, 0]);

        // values: the NULL writes nothing
        assert_eq!(&body[8..], &[0x05, 0x02, b'a', b'b']);
    }
}
