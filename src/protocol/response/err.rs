use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{BufExt, ProtocolDecode};

/// Signals that something went wrong server-side.
///
/// <https://dev.mysql.com/doc/internals/en/packet-ERR_Packet.html>
/// <https://mariadb.com/kb/en/err_packet/>
#[derive(Debug)]
pub(crate) struct ErrPacket {
    pub(crate) error_code: u16,
    pub(crate) error_message: String,
}

impl ProtocolDecode for ErrPacket {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let tag = buf.get_u8();
        if tag != 0xff {
            return Err(err_protocol!("expected 0xff (ERR) but found 0x{:02x}", tag));
        }

        let error_code = buf.get_u16_le();

        // '#' marker and the 5-byte SQL state; both discarded.
        // absent before the handshake completes.
        if buf.first() == Some(&b'#') {
            buf.advance(6);
        }

        let error_message = buf.get_str_eof()?;

        Ok(Self {
            error_code,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ErrPacket;
    use crate::io::ProtocolDecode;

    #[test]
    fn test_decode_err_packet_unknown_db() {
        const DATA: &[u8] = b"\xff\x19\x04#42000Unknown database 'unknown'";

        let err = ErrPacket::decode(DATA.into()).unwrap();

        assert_eq!(err.error_code, 1049);
        assert_eq!(err.error_message, "Unknown database 'unknown'");
    }

    #[test]
    fn test_decode_err_packet_without_sql_state() {
        const DATA: &[u8] = b"\xff\x15\x04Access denied for user 'root'";

        let err = ErrPacket::decode(DATA.into()).unwrap();

        assert_eq!(err.error_code, 1045);
        assert_eq!(err.error_message, "Access denied for user 'root'");
    }
}
