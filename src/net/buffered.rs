use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// Tokio, async-std, and std all use this as the default capacity for their buffered I/O.
const DEFAULT_BUF_SIZE: usize = 8192;

/// A duplex byte stream with a rolling read buffer and a write buffer.
///
/// The read buffer doubles as the packet framer's reassembly buffer: bytes
/// arrive in arbitrarily sized chunks and whole frames are split off the
/// front once enough bytes are buffered. Any partial frame carries over to
/// the next read, including across a TLS upgrade (the buffer lives here, not
/// in the transport).
pub struct BufStream<S> {
    pub(crate) stream: S,

    wbuf: Vec<u8>,
    rbuf: BytesMut,
}

impl<S> BufStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            wbuf: Vec::with_capacity(DEFAULT_BUF_SIZE),
            rbuf: BytesMut::with_capacity(DEFAULT_BUF_SIZE),
        }
    }

    /// Read exactly `len` bytes off the front of the stream, pulling more
    /// bytes from the transport as needed.
    pub async fn read_exact(&mut self, len: usize) -> io::Result<Bytes> {
        while self.rbuf.len() < len {
            let read = self.stream.read_buf(&mut self.rbuf).await?;

            if read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "expected to read {} bytes, found {} bytes at EOF",
                        len,
                        self.rbuf.len()
                    ),
                ));
            }
        }

        Ok(self.rbuf.split_to(len).freeze())
    }

    /// Number of buffered inbound bytes that have not yet been consumed.
    #[cfg(test)]
    pub fn unread(&self) -> usize {
        self.rbuf.len()
    }

    pub fn write_buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.wbuf
    }

    pub fn is_write_buffer_empty(&self) -> bool {
        self.wbuf.is_empty()
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        if !self.wbuf.is_empty() {
            self.stream.write_all(&self.wbuf).await?;
            self.wbuf.clear();
        }

        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.flush().await?;
        self.stream.shutdown().await
    }

    /// Take the transport out, keeping the buffers for
    /// [`from_parts`](Self::from_parts).
    ///
    /// Used for the TLS upgrade: the reader must resume on the new transport
    /// without dropping any inbound bytes, so the reassembly buffer travels.
    pub fn into_parts(self) -> (S, Vec<u8>, BytesMut) {
        (self.stream, self.wbuf, self.rbuf)
    }

    pub fn from_parts(stream: S, wbuf: Vec<u8>, rbuf: BytesMut) -> Self {
        Self { stream, wbuf, rbuf }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncWriteExt;

    use super::BufStream;

    // Frames must come out the same regardless of how the inbound bytes were
    // chunked, and exactly the framed bytes must be consumed.
    #[tokio::test]
    async fn test_reassembles_split_frames() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut stream = BufStream::new(client);

        // two adjacent 5-byte frames ([4-byte header][1-byte payload]),
        // delivered as a 7-byte chunk and then the remainder
        server.write_all(b"\x01\x00\x00\x00a\x01\x00").await.unwrap();

        let first = stream.read_exact(5).await.unwrap();
        assert_eq!(&first[..], b"\x01\x00\x00\x00a");

        server.write_all(b"\x00\x01b").await.unwrap();

        let second = stream.read_exact(5).await.unwrap();
        assert_eq!(&second[..], b"\x01\x00\x00\x01b");

        assert_eq!(stream.unread(), 0);
    }

    #[tokio::test]
    async fn test_byte_at_a_time_equals_single_chunk() {
        let payload = b"\x03\x00\x00\x00xyz\x02\x00\x00\x01ok";

        for chunked in [false, true] {
            let (client, mut server) = tokio::io::duplex(64);
            let mut stream = BufStream::new(client);

            let writer = async {
                if chunked {
                    for b in payload {
                        server.write_all(&[*b]).await.unwrap();
                    }
                } else {
                    server.write_all(payload).await.unwrap();
                }
            };

            let reader = async {
                let first = stream.read_exact(7).await.unwrap();
                let second = stream.read_exact(6).await.unwrap();
                (first, second)
            };

            let (_, (first, second)) = tokio::join!(writer, reader);

            assert_eq!(&first[..], b"\x03\x00\x00\x00xyz");
            assert_eq!(&second[..], b"\x02\x00\x00\x01ok");
        }
    }
}
