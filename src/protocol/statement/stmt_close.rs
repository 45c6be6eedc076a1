use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

/// Deallocate a prepared statement server-side. No response is sent.
///
/// <https://dev.mysql.com/doc/internals/en/com-stmt-close.html>
#[derive(Debug)]
pub(crate) struct StmtClose {
    pub(crate) statement_id: u32,
}

impl ProtocolEncode<Capabilities> for StmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x19); // COM_STMT_CLOSE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());

        Ok(())
    }
}
