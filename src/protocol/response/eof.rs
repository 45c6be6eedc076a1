use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::ProtocolDecode;
use crate::protocol::Status;

/// Marks the end of a sequence of column definitions or result rows.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_eof_packet.html>
/// <https://mariadb.com/kb/en/eof_packet/>
#[derive(Debug)]
pub(crate) struct EofPacket {
    pub(crate) status: Status,
}

impl ProtocolDecode for EofPacket {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let tag = buf.get_u8();
        if tag != 0xfe {
            return Err(err_protocol!("expected 0xfe (EOF) but found 0x{:02x}", tag));
        }

        // a bare 0xfe (or a short OK-variant) still terminates the sequence
        if buf.remaining() < 4 {
            return Ok(Self {
                status: Status::empty(),
            });
        }

        // warnings; discarded
        let _ = buf.get_u16_le();

        let status = Status::from_bits_truncate(buf.get_u16_le());

        Ok(Self { status })
    }
}

#[cfg(test)]
mod tests {
    use super::EofPacket;
    use crate::io::ProtocolDecode;
    use crate::protocol::Status;

    #[test]
    fn test_decode_eof_more_results() {
        const DATA: &[u8] = b"\xfe\x00\x00\x08\x00";

        let eof = EofPacket::decode(DATA.into()).unwrap();

        assert!(eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS));
    }
}
