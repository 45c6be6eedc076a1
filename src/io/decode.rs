use bytes::Bytes;

use crate::error::{Error, Result};

pub(crate) trait ProtocolDecode<Context = ()>
where
    Self: Sized,
{
    fn decode(buf: Bytes) -> Result<Self>
    where
        Self: ProtocolDecode<()>,
    {
        <Self as ProtocolDecode<()>>::decode_with(buf, ())
    }

    fn decode_with(buf: Bytes, context: Context) -> Result<Self, Error>;
}
