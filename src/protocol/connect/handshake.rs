use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::auth::AuthPlugin;
use crate::protocol::Capabilities;

/// The initial handshake packet, sent by the server immediately after the
/// transport connects.
///
/// The capability flags arrive split across the wire (low 16 bits, then high
/// 16 bits) and are recombined here.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_handshake_v10.html>
/// <https://mariadb.com/kb/en/connection/#initial-handshake-packet>
#[derive(Debug)]
pub(crate) struct Handshake {
    pub(crate) protocol_version: u8,
    pub(crate) server_version: String,
    pub(crate) connection_id: u32,
    pub(crate) server_capabilities: Capabilities,
    #[allow(unused)]
    pub(crate) server_default_collation: u8,
    pub(crate) auth_plugin: Option<AuthPlugin>,
    pub(crate) auth_plugin_data: Bytes,
}

impl ProtocolDecode for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let protocol_version = buf.get_u8(); // int<1>

        if protocol_version != 10 {
            return Err(err_protocol!(
                "unsupported protocol version {protocol_version}; expected 10"
            ));
        }

        let server_version = buf.get_str_nul()?; // string<NUL>

        // connection id through the reserved block
        if buf.remaining() < 31 {
            return Err(err_protocol!("initial handshake truncated"));
        }

        let connection_id = buf.get_u32_le(); // int<4>

        let auth_plugin_data_1 = buf.get_bytes(8); // string<8>

        buf.advance(1); // reserved: string<1>

        let capabilities_1 = buf.get_u16_le(); // int<2>
        let mut capabilities = u32::from(capabilities_1);

        let server_default_collation = buf.get_u8(); // int<1>

        let _status = buf.get_u16_le(); // int<2>

        let capabilities_2 = buf.get_u16_le(); // int<2>
        capabilities |= u32::from(capabilities_2) << 16;

        let server_capabilities = Capabilities::from_bits_truncate(capabilities);

        let auth_plugin_data_len = if server_capabilities.contains(Capabilities::PLUGIN_AUTH) {
            buf.get_u8() // int<1>
        } else {
            buf.advance(1); // string<1>
            0
        };

        buf.advance(10); // reserved: string<10>

        let mut auth_plugin_data = auth_plugin_data_1;

        if server_capabilities.contains(Capabilities::SECURE_CONNECTION) {
            // an extra auth-data fragment of at least 13 bytes
            let len = std::cmp::max(13, auth_plugin_data_len.saturating_sub(8)) as usize;
            let auth_plugin_data_2 = buf.get_bytes(len.min(buf.remaining()));

            let mut combined = Vec::with_capacity(auth_plugin_data.len() + auth_plugin_data_2.len());
            combined.extend_from_slice(&auth_plugin_data);
            combined.extend_from_slice(&auth_plugin_data_2);
            auth_plugin_data = combined.into();
        }

        let auth_plugin = if server_capabilities.contains(Capabilities::PLUGIN_AUTH) {
            // some servers are missing the trailing NUL
            let name = match buf.get_str_nul() {
                Ok(name) => name,
                Err(_) => buf.get_str_eof()?,
            };

            Some(name.parse()?)
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            server_version,
            connection_id,
            server_capabilities,
            server_default_collation,
            auth_plugin,
            auth_plugin_data,
        })
    }
}
