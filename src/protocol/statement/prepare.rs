use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

/// Ask the server to parse a SQL statement for later execution.
///
/// <https://dev.mysql.com/doc/internals/en/com-stmt-prepare.html>
#[derive(Debug)]
pub(crate) struct Prepare<'q> {
    pub(crate) query: &'q str,
}

impl ProtocolEncode<Capabilities> for Prepare<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x16); // COM_STMT_PREPARE
        buf.extend_from_slice(self.query.as_bytes());

        Ok(())
    }
}
