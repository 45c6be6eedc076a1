use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

/// Execute a SQL statement immediately, over the text protocol.
///
/// <https://dev.mysql.com/doc/internals/en/com-query.html>
#[derive(Debug)]
pub(crate) struct Query<'q>(pub(crate) &'q str);

impl ProtocolEncode<Capabilities> for Query<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x03); // COM_QUERY
        buf.extend_from_slice(self.0.as_bytes());

        Ok(())
    }
}

/// Change the default schema of the connection.
///
/// <https://dev.mysql.com/doc/internals/en/com-init-db.html>
#[derive(Debug)]
pub(crate) struct InitDb<'q>(pub(crate) &'q str);

impl ProtocolEncode<Capabilities> for InitDb<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.push(0x02); // COM_INIT_DB
        buf.extend_from_slice(self.0.as_bytes());

        Ok(())
    }
}
