use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

/// A truncated handshake response, sent before the TLS upgrade.
///
/// The 32-byte preamble is identical to the one that opens the full
/// handshake response.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_ssl_request.html>
/// <https://mariadb.com/kb/en/connection/#sslrequest-packet>
#[derive(Debug)]
pub(crate) struct SslRequest {
    pub(crate) max_packet_size: u32,
    pub(crate) collation: u8,
}

impl ProtocolEncode<Capabilities> for SslRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        // client capabilities : int<4>
        buf.extend_from_slice(&capabilities.bits().to_le_bytes());

        // max packet size : int<4>
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());

        // client character collation : int<1>
        buf.push(self.collation);

        // reserved : string<23>
        buf.extend_from_slice(&[0_u8; 23]);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SslRequest;
    use crate::io::ProtocolEncode;
    use crate::protocol::Capabilities;

    #[test]
    fn test_encode_is_32_bytes() {
        let mut buf = Vec::new();

        SslRequest {
            max_packet_size: 50 * 1024 * 1024,
            collation: 45,
        }
        .encode_with(&mut buf, Capabilities::BASE | Capabilities::SSL)
        .unwrap();

        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[..4], &(Capabilities::BASE | Capabilities::SSL).bits().to_le_bytes());
    }
}
