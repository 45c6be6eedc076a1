pub(crate) trait BufMutExt {
    // Write a length-encoded integer.
    fn put_uint_lenenc(&mut self, v: u64);

    // Write a length-encoded byte sequence.
    fn put_bytes_lenenc(&mut self, v: &[u8]);

    // Write a length-encoded string.
    fn put_str_lenenc(&mut self, v: &str);

    // Write a nul-terminated string.
    fn put_str_nul(&mut self, v: &str);
}

impl BufMutExt for Vec<u8> {
    fn put_uint_lenenc(&mut self, v: u64) {
        // https://dev.mysql.com/doc/internals/en/integer.html
        if v < 0xfb {
            self.push(v as u8);
        } else if v <= u64::from(u16::MAX) {
            self.push(0xfc);
            self.extend_from_slice(&(v as u16).to_le_bytes());
        } else if v <= 0x00ff_ffff {
            self.push(0xfd);
            self.extend_from_slice(&(v as u32).to_le_bytes()[..3]);
        } else {
            self.push(0xfe);
            self.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn put_bytes_lenenc(&mut self, v: &[u8]) {
        self.put_uint_lenenc(v.len() as u64);
        self.extend_from_slice(v);
    }

    fn put_str_lenenc(&mut self, v: &str) {
        self.put_bytes_lenenc(v.as_bytes());
    }

    fn put_str_nul(&mut self, v: &str) {
        self.extend_from_slice(v.as_bytes());
        self.push(0);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::BufMutExt;
    use crate::io::MySqlBufExt;

    #[test]
    fn test_uint_lenenc_round_trip_lengths() {
        // encoded length must be 1/3/4/9 at the boundaries
        for (v, len) in [
            (0_u64, 1_usize),
            (0xfa, 1),
            (0xfb, 3),
            (0xffff, 3),
            (0x0001_0000, 4),
            (0x00ff_ffff, 4),
            (0x0100_0000, 9),
            (u64::MAX, 9),
        ] {
            let mut buf = Vec::new();
            buf.put_uint_lenenc(v);

            assert_eq!(buf.len(), len, "encoding of {v}");

            let mut bytes = Bytes::from(buf);
            assert_eq!(bytes.get_uint_lenenc(), v);
        }
    }

    #[test]
    fn test_str_nul() {
        let mut buf = Vec::new();
        buf.put_str_nul("root");

        assert_eq!(&buf[..], b"root\0");
    }
}
