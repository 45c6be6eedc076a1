use crate::error::{Error, Result};
use crate::io::{BufMutExt, ProtocolEncode};
use crate::protocol::Capabilities;

/// The v4.1 handshake response: the 32-byte preamble shared with
/// [`SslRequest`](super::SslRequest), then the credentials.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_response.html>
/// <https://mariadb.com/kb/en/connection/#handshake-response-packet>
#[derive(Debug)]
pub(crate) struct HandshakeResponse<'a> {
    pub(crate) max_packet_size: u32,
    pub(crate) collation: u8,
    pub(crate) username: &'a str,
    pub(crate) database: Option<&'a str>,
    pub(crate) auth_plugin_name: &'a str,
    pub(crate) auth_response: &'a [u8],
}

impl ProtocolEncode<Capabilities> for HandshakeResponse<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, capabilities: Capabilities) -> Result<(), Error> {
        // client capabilities : int<4>
        buf.extend_from_slice(&capabilities.bits().to_le_bytes());

        // max packet size : int<4>
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());

        // client character collation : int<1>
        buf.push(self.collation);

        // reserved : string<23>
        buf.extend_from_slice(&[0_u8; 23]);

        // username : string<NUL>
        buf.put_str_nul(self.username);

        // auth response : string<lenenc>
        buf.put_bytes_lenenc(self.auth_response);

        if capabilities.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = self.database {
                // database : string<NUL>
                buf.put_str_nul(database);
            }
        }

        // client auth plugin name : string<NUL>
        buf.put_str_nul(self.auth_plugin_name);

        Ok(())
    }
}
