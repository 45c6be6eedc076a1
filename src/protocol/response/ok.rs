use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{MySqlBufExt, ProtocolDecode};
use crate::protocol::Status;

/// Signals successful completion of a command.
///
/// Trailing fields (warnings, session-state info) are tolerated but not
/// exposed; only the status flags participate in control flow.
///
/// <https://dev.mysql.com/doc/internals/en/packet-OK_Packet.html>
/// <https://mariadb.com/kb/en/ok_packet/>
#[derive(Debug)]
pub(crate) struct OkPacket {
    pub(crate) affected_rows: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) status: Status,
}

impl ProtocolDecode for OkPacket {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let tag = buf.get_u8();

        // a short 0xfe packet would have been routed to EofPacket already
        if tag != 0x00 && tag != 0xfe {
            return Err(err_protocol!("expected 0x00 or 0xfe (OK) but found 0x{:02x}", tag));
        }

        let affected_rows = buf.get_uint_lenenc();
        let last_insert_id = buf.get_uint_lenenc();

        let status = if buf.remaining() >= 2 {
            Status::from_bits_truncate(buf.get_u16_le())
        } else {
            Status::empty()
        };

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::OkPacket;
    use crate::io::ProtocolDecode;
    use crate::protocol::Status;

    #[test]
    fn test_decode_ok_packet() {
        const DATA: &[u8] = b"\x00\x00\x00\x02@\x00\x00";

        let ok = OkPacket::decode(DATA.into()).unwrap();

        assert_eq!(ok.affected_rows, 0);
        assert_eq!(ok.last_insert_id, 0);
        assert!(ok.status.contains(Status::SERVER_STATUS_AUTOCOMMIT));
    }

    #[test]
    fn test_decode_ok_packet_lenenc_counts() {
        // 300 affected rows, last insert id 5
        const DATA: &[u8] = b"\x00\xfc\x2c\x01\x05\x02\x00\x00\x00";

        let ok = OkPacket::decode(DATA.into()).unwrap();

        assert_eq!(ok.affected_rows, 300);
        assert_eq!(ok.last_insert_id, 5);
    }

    #[test]
    fn test_rejects_err_tag() {
        assert!(OkPacket::decode(b"\xff\x00\x00".as_slice().into()).is_err());
    }
}
