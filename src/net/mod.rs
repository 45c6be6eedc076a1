mod buffered;
mod socket;
mod tls;

pub(crate) use buffered::BufStream;
pub(crate) use socket::Socket;
pub(crate) use tls::MaybeTlsStream;
