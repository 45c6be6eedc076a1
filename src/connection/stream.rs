use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::io::ProtocolDecode;
use crate::net::{BufStream, MaybeTlsStream, Socket};
use crate::protocol::response::ErrPacket;
use crate::protocol::statement::PrepareOk;
use crate::protocol::{write_packet, Capabilities, Packet, Status};
use crate::MySqlDatabaseError;

/// What the stream still owes the server a read for.
///
/// Commands whose response was not fully consumed (a dropped row stream, a
/// timed-out future) leave an entry here; the next command first drains the
/// stale packets so the wire stays in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Waiting {
    // expecting the head of a result set (OK or column count)
    Result,

    // expecting rows terminated by EOF
    Row,

    // expecting a COM_STMT_PREPARE response
    Prepare,

    // expecting exactly N more packets, contents irrelevant
    Skip(usize),
}

pub(crate) struct MySqlStream {
    socket: BufStream<MaybeTlsStream<Socket>>,

    pub(crate) capabilities: Capabilities,
    pub(crate) sequence_id: u8,
    pub(crate) pending: VecDeque<Waiting>,

    pub(crate) server_version: String,
    pub(crate) connection_id: u32,

    is_unix: bool,
}

impl MySqlStream {
    pub(crate) fn new(socket: Socket, capabilities: Capabilities) -> Self {
        #[cfg(unix)]
        let is_unix = matches!(socket, Socket::Unix(_));

        #[cfg(not(unix))]
        let is_unix = false;

        Self {
            socket: BufStream::new(MaybeTlsStream::Raw(socket)),
            capabilities,
            sequence_id: 0,
            pending: VecDeque::new(),
            server_version: String::new(),
            connection_id: 0,
            is_unix,
        }
    }

    pub(crate) fn is_tls(&self) -> bool {
        self.socket.stream.is_tls()
    }

    /// `true` when the transport itself is considered secure: TLS or a
    /// Unix domain socket.
    pub(crate) fn is_secure(&self) -> bool {
        self.is_tls() || self.is_unix
    }

    /// Swap the transport for its TLS upgrade. The read and write buffers
    /// carry across; no inbound bytes are lost.
    pub(crate) async fn upgrade_tls(mut self, options: &crate::MySqlConnectOptions) -> Result<Self> {
        // the SSL request must be on the wire before the TLS hello
        self.flush().await?;

        let (stream, wbuf, rbuf) = self.socket.into_parts();

        self.socket = BufStream::from_parts(stream.upgrade(options).await?, wbuf, rbuf);

        Ok(self)
    }

    /// Begin a new command: reset the sequence id, write one packet, flush.
    pub(crate) async fn send_packet<T>(&mut self, payload: T) -> Result<()>
    where
        T: crate::io::ProtocolEncode<Capabilities>,
    {
        self.sequence_id = 0;
        self.write_packet(payload)?;
        self.flush().await
    }

    /// Write one packet at the current sequence id, without flushing.
    pub(crate) fn write_packet<T>(&mut self, payload: T) -> Result<()>
    where
        T: crate::io::ProtocolEncode<Capabilities>,
    {
        write_packet(
            self.socket.write_buffer_mut(),
            &mut self.sequence_id,
            self.capabilities,
            &payload,
        )
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        self.socket.flush().await?;
        Ok(())
    }

    /// Receive the next packet, reassembling split payloads and
    /// intercepting server ERR packets.
    pub(crate) async fn recv_packet(&mut self) -> Result<Packet> {
        let payload = self.recv_packet_part().await?;

        let payload: Bytes = if payload.len() < 0xff_ff_ff {
            payload
        } else {
            // the payload continues in follow-up packets until one arrives
            // under the maximum size
            let mut joined = BytesMut::from(&payload[..]);

            loop {
                let part = self.recv_packet_part().await?;
                let last = part.len();

                joined.extend_from_slice(&part);

                if last < 0xff_ff_ff {
                    break;
                }
            }

            joined.freeze()
        };

        if payload.is_empty() {
            return Err(err_protocol!("received a packet with an empty payload"));
        }

        if payload[0] == 0xff {
            // surface the server error here so decoders downstream only see
            // the shapes they expect
            return Err(MySqlDatabaseError(ErrPacket::decode_with(payload, ())?).into());
        }

        tracing::trace!(len = payload.len(), first = payload[0], "read packet");

        Ok(Packet(payload))
    }

    async fn recv_packet_part(&mut self) -> Result<Bytes> {
        // https://dev.mysql.com/doc/dev/mysql-server/8.0.12/page_protocol_basic_packets.html
        // https://mariadb.com/kb/en/library/0-packet/#standard-packet
        let mut header = self.socket.read_exact(4).await?;

        // cannot truncate: the length is 3 bytes
        #[allow(clippy::cast_possible_truncation)]
        let payload_len = header.get_uint_le(3) as usize;
        let sequence_id = header.get_u8();

        self.sequence_id = sequence_id.wrapping_add(1);

        let payload = self.socket.read_exact(payload_len).await?;

        Ok(payload)
    }

    pub(crate) async fn recv<T>(&mut self) -> Result<T>
    where
        T: ProtocolDecode<()>,
    {
        self.recv_packet().await?.decode()
    }

    /// Drain response packets owed for previous commands so a new command
    /// starts on a quiet wire. Server errors here belong to the abandoned
    /// command and are swallowed.
    pub(crate) async fn wait_until_ready(&mut self) -> Result<()> {
        if !self.socket.is_write_buffer_empty() {
            self.flush().await?;
        }

        while !self.pending.is_empty() {
            let packet = match self.recv_packet().await {
                Ok(packet) => packet,

                Err(Error::Database(_)) => {
                    // the abandoned command failed server-side; its response
                    // sequence is over
                    self.pending.pop_front();
                    continue;
                }

                Err(err) => return Err(err),
            };

            match self.pending.front().copied() {
                Some(Waiting::Result) => {
                    if packet.is_ok() {
                        let ok = packet.ok()?;

                        if !ok.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                            self.pending.pop_front();
                        }
                    } else {
                        // head of a result set; skip the column definitions
                        // and wait out the rows
                        *self.pending.front_mut().expect("pending is non-empty") = Waiting::Row;
                    }
                }

                Some(Waiting::Row) => {
                    if packet.is_eof() {
                        let eof = packet.eof()?;

                        if eof.status.contains(Status::SERVER_MORE_RESULTS_EXISTS) {
                            *self.pending.front_mut().expect("pending is non-empty") =
                                Waiting::Result;
                        } else {
                            self.pending.pop_front();
                        }
                    }
                }

                Some(Waiting::Prepare) => {
                    // an abandoned prepare; the head packet tells us how many
                    // definition packets (and their EOFs) are still owed
                    let ok: PrepareOk = packet.decode()?;

                    let mut skip = 0;
                    if ok.params > 0 {
                        skip += usize::from(ok.params) + 1;
                    }
                    if ok.columns > 0 {
                        skip += usize::from(ok.columns) + 1;
                    }

                    if skip == 0 {
                        self.pending.pop_front();
                    } else {
                        *self.pending.front_mut().expect("pending is non-empty") =
                            Waiting::Skip(skip);
                    }
                }

                Some(Waiting::Skip(n)) => {
                    if n <= 1 {
                        self.pending.pop_front();
                    } else {
                        *self.pending.front_mut().expect("pending is non-empty") =
                            Waiting::Skip(n - 1);
                    }
                }

                None => break,
            }
        }

        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) -> Result<()> {
        self.socket.shutdown().await?;
        Ok(())
    }
}
