use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

/// Tell the server we are going away. The server closes the connection;
/// no reply is awaited.
///
/// <https://dev.mysql.com/doc/internals/en/com-quit.html>
#[derive(Debug)]
pub(crate) struct Quit;

impl ProtocolEncode<Capabilities> for Quit {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x01); // COM_QUIT

        Ok(())
    }
}
