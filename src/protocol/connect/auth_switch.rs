use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::auth::AuthPlugin;

/// Sent by the server mid-handshake to restart authentication under a
/// different plugin.
///
/// <https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_connection_phase_packets_protocol_auth_switch_request.html>
#[derive(Debug)]
pub(crate) struct AuthSwitchRequest {
    pub(crate) plugin: AuthPlugin,
    pub(crate) data: Bytes,
}

impl ProtocolDecode for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self, Error> {
        let tag = buf.get_u8();
        if tag != 0xfe {
            return Err(err_protocol!(
                "expected 0xfe (AUTH_SWITCH) but found 0x{:02x}",
                tag
            ));
        }

        let plugin = buf.get_str_nul()?.parse()?;

        // the plugin data is usually a 20-byte challenge plus a trailing NUL
        let mut data = buf;
        if data.last() == Some(&0) {
            data.truncate(data.len() - 1);
        }

        Ok(Self { plugin, data })
    }
}

#[cfg(test)]
mod tests {
    use super::AuthSwitchRequest;
    use crate::io::ProtocolDecode;
    use crate::protocol::auth::AuthPlugin;

    #[test]
    fn test_decode_auth_switch() {
        const DATA: &[u8] = b"\xfemysql_native_password\x00abcdefghijabcdefghij\x00";

        let p = AuthSwitchRequest::decode(DATA.into()).unwrap();

        assert_eq!(p.plugin, AuthPlugin::MySqlNativePassword);
        assert_eq!(&p.data[..], b"abcdefghijabcdefghij");
    }

    #[test]
    fn test_decode_auth_switch_unknown_plugin() {
        const DATA: &[u8] = b"\xfedialog\x00";

        assert!(AuthSwitchRequest::decode(DATA.into()).is_err());
    }
}
