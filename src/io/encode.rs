use crate::error::{Error, Result};

pub(crate) trait ProtocolEncode<Context = ()> {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()>
    where
        Self: ProtocolEncode<()>,
    {
        <Self as ProtocolEncode<()>>::encode_with(self, buf, ())
    }

    fn encode_with(&self, buf: &mut Vec<u8>, context: Context) -> Result<(), Error>;
}
