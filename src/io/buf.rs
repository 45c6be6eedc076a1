use bytes::{Buf, Bytes};
use memchr::memchr;

use crate::error::Result;

pub(crate) trait BufExt: Buf {
    // Read a nul-terminated byte sequence. The nul is consumed but not returned.
    fn get_bytes_nul(&mut self) -> Result<Bytes>;

    // Read a fixed-size byte sequence.
    fn get_bytes(&mut self, len: usize) -> Bytes;

    // Read a fixed-size UTF-8 string.
    fn get_str(&mut self, len: usize) -> Result<String>;

    // Read a nul-terminated UTF-8 string. The nul is consumed but not returned.
    fn get_str_nul(&mut self) -> Result<String>;

    // Read a UTF-8 string occupying the rest of the buffer.
    fn get_str_eof(&mut self) -> Result<String>;
}

impl BufExt for Bytes {
    fn get_bytes_nul(&mut self) -> Result<Bytes> {
        let nul =
            memchr(b'\0', self).ok_or_else(|| err_protocol!("expected NUL in byte sequence"))?;

        let bytes = self.split_to(nul);
        self.advance(1);

        Ok(bytes)
    }

    fn get_bytes(&mut self, len: usize) -> Bytes {
        self.split_to(len)
    }

    fn get_str(&mut self, len: usize) -> Result<String> {
        if len > self.remaining() {
            return Err(err_protocol!(
                "string of {len} bytes overruns the packet ({} bytes remain)",
                self.remaining()
            ));
        }

        let buf = self.split_to(len);

        String::from_utf8(buf.to_vec())
            .map_err(|err| err_protocol!("string is not valid UTF-8: {}", err))
    }

    fn get_str_nul(&mut self) -> Result<String> {
        let bytes = self.get_bytes_nul()?;

        String::from_utf8(bytes.to_vec())
            .map_err(|err| err_protocol!("string is not valid UTF-8: {}", err))
    }

    fn get_str_eof(&mut self) -> Result<String> {
        let len = self.remaining();
        self.get_str(len)
    }
}

pub(crate) trait MySqlBufExt: Buf {
    /// Read a length-encoded integer.
    ///
    /// The first byte selects the width: a value below 0xfb is the integer
    /// itself, and 0xfc/0xfd/0xfe prefix a 2-, 3-, or 8-byte little-endian
    /// integer. Exactly 1, 3, 4, or 9 bytes are consumed; the prepared-
    /// statement and column-definition decoders rely on this to know where
    /// the next field starts. 0xfb never reaches this reader, it marks NULL
    /// in text result rows and is intercepted by the row decoder.
    fn get_uint_lenenc(&mut self) -> u64;

    /// Read a length-encoded UTF-8 string.
    fn get_str_lenenc(&mut self) -> Result<String>;

    /// Read a length-encoded byte sequence, checked against the bytes that
    /// remain in the packet.
    fn get_bytes_lenenc(&mut self) -> Result<Bytes>;
}

impl MySqlBufExt for Bytes {
    fn get_uint_lenenc(&mut self) -> u64 {
        let prefix = self.get_u8();

        let width = match prefix {
            0xfc => 2,
            0xfd => 3,
            0xfe => 8,

            // the prefix byte is the value
            _ => return u64::from(prefix),
        };

        self.get_uint_le(width)
    }

    fn get_str_lenenc(&mut self) -> Result<String> {
        let bytes = self.get_bytes_lenenc()?;

        String::from_utf8(bytes.to_vec())
            .map_err(|err| err_protocol!("string is not valid UTF-8: {}", err))
    }

    fn get_bytes_lenenc(&mut self) -> Result<Bytes> {
        let size = self.get_uint_lenenc();
        let size = usize::try_from(size)
            .map_err(|_| err_protocol!("string length overflows usize: {size}"))?;

        if size > self.remaining() {
            return Err(err_protocol!(
                "length-encoded sequence of {size} bytes overruns the packet ({} bytes remain)",
                self.remaining()
            ));
        }

        Ok(self.split_to(size))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{BufExt, MySqlBufExt};

    #[test]
    fn test_uint_lenenc_boundaries() {
        // (encoding, value) per the boundary rules
        let cases: &[(&[u8], u64)] = &[
            (b"\x00", 0),
            (b"\xfa", 0xfa),
            (b"\xfc\xfb\x00", 0xfb),
            (b"\xfc\xff\xff", 0xffff),
            (b"\xfd\x00\x00\x01", 0x0001_0000),
            (b"\xfd\xff\xff\xff", 0x00ff_ffff),
            (b"\xfe\x00\x00\x00\x01\x00\x00\x00\x00", 0x0100_0000),
            (b"\xfe\xff\xff\xff\xff\xff\xff\xff\xff", u64::MAX),
        ];

        for (encoded, value) in cases {
            let mut buf = Bytes::from_static(encoded);
            assert_eq!(buf.get_uint_lenenc(), *value);
            assert!(buf.is_empty(), "{value} consumed {} bytes too few", buf.len());
        }
    }

    #[test]
    fn test_str_lenenc() {
        let mut buf = Bytes::from_static(b"\x05hello world");

        assert_eq!(buf.get_str_lenenc().unwrap(), "hello");
        assert_eq!(&buf[..], b" world");
    }

    #[test]
    fn test_bytes_lenenc_overrun() {
        let mut buf = Bytes::from_static(b"\x10short");

        assert!(buf.get_bytes_lenenc().is_err());
    }

    #[test]
    fn test_str_nul() {
        let mut buf = Bytes::from_static(b"mysql_native_password\0rest");

        assert_eq!(buf.get_str_nul().unwrap(), "mysql_native_password");
        assert_eq!(&buf[..], b"rest");
    }
}
