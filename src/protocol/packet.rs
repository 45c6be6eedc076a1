use std::ops::Deref;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::io::ProtocolDecode;
use crate::protocol::response::{EofPacket, OkPacket};
use crate::protocol::Capabilities;

/// One inbound packet payload, header already stripped by the framer.
///
/// ERR packets are intercepted where the packet is received, so decoders
/// downstream only ever see the payload shape they expect.
#[derive(Debug)]
pub(crate) struct Packet(pub(crate) Bytes);

impl Packet {
    pub(crate) fn decode<T>(self) -> Result<T>
    where
        T: ProtocolDecode<()>,
    {
        self.decode_with(())
    }

    pub(crate) fn decode_with<T, C>(self, context: C) -> Result<T, Error>
    where
        T: ProtocolDecode<C>,
    {
        T::decode_with(self.0, context)
    }

    /// Decode as an OK packet (also accepts the 0xFE OK variant).
    pub(crate) fn ok(self) -> Result<OkPacket> {
        self.decode()
    }

    /// Decode as an EOF packet.
    pub(crate) fn eof(self) -> Result<EofPacket> {
        self.decode()
    }

    /// `true` if this payload begins a result-set EOF: tag 0xFE with a
    /// payload shorter than 9 bytes. Some servers send a short 0xFE OK
    /// variant here; it must be treated as EOF as well.
    pub(crate) fn is_eof(&self) -> bool {
        !self.0.is_empty() && self.0[0] == 0xfe && self.0.len() < 9
    }

    pub(crate) fn is_ok(&self) -> bool {
        !self.0.is_empty() && self.0[0] == 0x00 && self.0.len() >= 7
    }
}

impl Deref for Packet {
    type Target = Bytes;

    fn deref(&self) -> &Bytes {
        &self.0
    }
}

/// Prefix `payload` with the 4-byte packet header and append it to `buf`.
///
/// Payloads of 2^24-1 bytes or more would overflow the 3-byte length field;
/// they are rejected rather than silently truncated.
pub(crate) fn write_packet(
    buf: &mut Vec<u8>,
    sequence_id: &mut u8,
    capabilities: Capabilities,
    payload: &impl crate::io::ProtocolEncode<Capabilities>,
) -> Result<()> {
    // reserve room for the header; the length is known only after encoding
    let offset = buf.len();
    buf.extend_from_slice(&[0; 4]);

    payload.encode_with(buf, capabilities)?;

    let len = buf.len() - offset - 4;

    if len >= 0xff_ff_ff {
        buf.truncate(offset);
        return Err(err_protocol!(
            "outbound payload of {len} bytes exceeds the maximum packet size"
        ));
    }

    // cannot truncate: len < 2^24
    #[allow(clippy::cast_possible_truncation)]
    let header = (len as u32).to_le_bytes();

    buf[offset] = header[0];
    buf[offset + 1] = header[1];
    buf[offset + 2] = header[2];
    buf[offset + 3] = *sequence_id;

    *sequence_id = sequence_id.wrapping_add(1);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_packet;
    use crate::protocol::text::Query;
    use crate::protocol::Capabilities;

    #[test]
    fn test_writes_header_and_increments_sequence() {
        let mut buf = Vec::new();
        let mut sequence_id = 0;

        write_packet(
            &mut buf,
            &mut sequence_id,
            Capabilities::BASE,
            &Query("SELECT 1"),
        )
        .unwrap();

        assert_eq!(&buf[..4], b"\x09\x00\x00\x00");
        assert_eq!(&buf[4..], b"\x03SELECT 1");
        assert_eq!(sequence_id, 1);
    }
}
