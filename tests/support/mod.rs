//! A scripted MySQL server for wire-level tests.
//!
//! Each test spawns a task that speaks the server side of the protocol over
//! a real TCP socket, byte for byte, and asserts on what the client sends.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const NONCE: &[u8; 20] = b"abcdefghijklmnopqrst";

/// Server status flag: more result sets follow.
pub const MORE_RESULTS: u16 = 0x0008;

pub struct MockSession {
    socket: TcpStream,
    next_seq: u8,
}

/// Bind a listener and hand its first accepted connection to `script`.
///
/// Await the returned handle at the end of the test so script assertions
/// propagate.
pub async fn one_shot<F, Fut>(script: F) -> (SocketAddr, tokio::task::JoinHandle<()>)
where
    F: FnOnce(MockSession) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = io::Result<()>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("mock accept");

        if let Err(err) = script(MockSession::new(socket)).await {
            // broken pipes at the end of a script are expected when the
            // client closes first
            if err.kind() != io::ErrorKind::BrokenPipe
                && err.kind() != io::ErrorKind::UnexpectedEof
            {
                panic!("mock server script failed: {err}");
            }
        }
    });

    (addr, handle)
}

/// Accept any number of connections, running `script` for each.
pub async fn serve<F, Fut>(script: F) -> SocketAddr
where
    F: Fn(MockSession) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = io::Result<()>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let script = script.clone();

            tokio::spawn(async move {
                let _ = script(MockSession::new(socket)).await;
            });
        }
    });

    addr
}

impl MockSession {
    pub fn new(socket: TcpStream) -> Self {
        Self {
            socket,
            next_seq: 0,
        }
    }

    /// Write one packet at an explicit sequence id.
    pub async fn write_packet(&mut self, seq: u8, payload: &[u8]) -> io::Result<()> {
        let mut header = (payload.len() as u32).to_le_bytes();
        header[3] = seq;

        self.socket.write_all(&header).await?;
        self.socket.write_all(payload).await?;
        self.socket.flush().await?;

        self.next_seq = seq.wrapping_add(1);

        Ok(())
    }

    /// Write one packet at the tracked next sequence id.
    pub async fn reply(&mut self, payload: &[u8]) -> io::Result<()> {
        self.write_packet(self.next_seq, payload).await
    }

    /// Write raw bytes with no framing, to exercise chunk reassembly.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.socket.write_all(bytes).await?;
        self.socket.flush().await
    }

    /// Read one packet, returning its sequence id and payload.
    pub async fn read_packet(&mut self) -> io::Result<(u8, Vec<u8>)> {
        let mut header = [0_u8; 4];
        self.socket.read_exact(&mut header).await?;

        let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
        let seq = header[3];

        let mut payload = vec![0_u8; len];
        self.socket.read_exact(&mut payload).await?;

        self.next_seq = seq.wrapping_add(1);

        Ok((seq, payload))
    }

    /// Send the initial handshake advertising the given auth plugin.
    pub async fn send_handshake(&mut self, auth_plugin: &str) -> io::Result<()> {
        let mut payload = Vec::new();

        payload.push(10); // protocol version
        payload.extend_from_slice(b"8.0.0-mock\0");
        payload.extend_from_slice(&7_u32.to_le_bytes()); // connection id
        payload.extend_from_slice(&NONCE[..8]);
        payload.push(0); // filler

        // capabilities: PROTOCOL_41 | SECURE_CONNECTION,
        // then PLUGIN_AUTH | PLUGIN_AUTH_LENENC_DATA in the high half
        payload.extend_from_slice(&0x8200_u16.to_le_bytes());
        payload.push(45); // server default collation
        payload.extend_from_slice(&2_u16.to_le_bytes()); // status: autocommit
        payload.extend_from_slice(&0x0028_u16.to_le_bytes());

        payload.push(21); // auth plugin data length
        payload.extend_from_slice(&[0_u8; 10]); // reserved
        payload.extend_from_slice(&NONCE[8..]);
        payload.push(0); // nul terminating the nonce
        payload.extend_from_slice(auth_plugin.as_bytes());
        payload.push(0);

        self.write_packet(0, &payload).await
    }

    /// The standard session opening: handshake, any handshake response,
    /// OK, and the collation-pinning SET that follows it.
    pub async fn accept_login(&mut self) -> io::Result<()> {
        self.send_handshake("mysql_native_password").await?;

        let (seq, _response) = self.read_packet().await?;
        assert_eq!(seq, 1, "handshake response arrives at sequence 1");

        self.reply(&ok(0, 0, 2)).await?;

        self.expect_collation_set().await
    }

    /// Expect the internal `SET` fixing the session character set, and
    /// acknowledge it.
    pub async fn expect_collation_set(&mut self) -> io::Result<()> {
        let (seq, set) = self.read_packet().await?;

        assert_eq!(seq, 0, "commands start a new sequence");
        assert_eq!(set[0], 0x03, "expected COM_QUERY");

        let sql = String::from_utf8_lossy(&set[1..]).into_owned();
        assert!(
            sql.contains("character_set_client") && sql.contains("utf8mb4"),
            "expected the collation SET, got {sql:?}"
        );

        self.reply(&ok(0, 0, 2)).await
    }

    /// Answer one text query with a single-column result set of string
    /// cells.
    pub async fn answer_text_rows(
        &mut self,
        column: &str,
        cells: &[&[u8]],
        final_status: u16,
    ) -> io::Result<()> {
        self.reply(&[1]).await?; // column count
        let def = column_def(column, 0xfd, 45, 0); // VAR_STRING, utf8mb4
        self.reply(&def).await?;
        self.reply(&eof(0)).await?;

        for cell in cells {
            let row = text_row(&[Some(cell)]);
            self.reply(&row).await?;
        }

        self.reply(&eof(final_status)).await
    }
}

// ---- packet builders ----

pub fn lenenc(v: u64) -> Vec<u8> {
    if v < 0xfb {
        vec![v as u8]
    } else if v <= 0xffff {
        let mut out = vec![0xfc];
        out.extend_from_slice(&(v as u16).to_le_bytes());
        out
    } else if v <= 0x00ff_ffff {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(v as u32).to_le_bytes()[..3]);
        out
    } else {
        let mut out = vec![0xfe];
        out.extend_from_slice(&v.to_le_bytes());
        out
    }
}

pub fn lenenc_str(s: &str) -> Vec<u8> {
    let mut out = lenenc(s.len() as u64);
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn ok(affected: u64, last_insert_id: u64, status: u16) -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&lenenc(affected));
    payload.extend_from_slice(&lenenc(last_insert_id));
    payload.extend_from_slice(&status.to_le_bytes());
    payload.extend_from_slice(&0_u16.to_le_bytes()); // warnings
    payload
}

pub fn eof(status: u16) -> Vec<u8> {
    let mut payload = vec![0xfe];
    payload.extend_from_slice(&0_u16.to_le_bytes()); // warnings
    payload.extend_from_slice(&status.to_le_bytes());
    payload
}

pub fn err(code: u16, message: &str) -> Vec<u8> {
    let mut payload = vec![0xff];
    payload.extend_from_slice(&code.to_le_bytes());
    payload.extend_from_slice(b"#42000");
    payload.extend_from_slice(message.as_bytes());
    payload
}

pub fn column_def(name: &str, type_id: u8, charset: u16, flags: u16) -> Vec<u8> {
    let mut payload = Vec::new();

    payload.extend_from_slice(&lenenc_str("def")); // catalog
    payload.extend_from_slice(&lenenc_str("")); // schema
    payload.extend_from_slice(&lenenc_str("")); // table alias
    payload.extend_from_slice(&lenenc_str("")); // table
    payload.extend_from_slice(&lenenc_str(name)); // column alias
    payload.extend_from_slice(&lenenc_str(name)); // column

    payload.push(0x0c); // length of the fixed fields
    payload.extend_from_slice(&charset.to_le_bytes());
    payload.extend_from_slice(&255_u32.to_le_bytes()); // column length
    payload.push(type_id);
    payload.extend_from_slice(&flags.to_le_bytes());
    payload.push(0); // decimals
    payload.extend_from_slice(&[0, 0]); // filler

    payload
}

pub fn text_row(cells: &[Option<&[u8]>]) -> Vec<u8> {
    let mut payload = Vec::new();

    for cell in cells {
        match cell {
            None => payload.push(0xfb),
            Some(cell) => {
                payload.extend_from_slice(&lenenc(cell.len() as u64));
                payload.extend_from_slice(cell);
            }
        }
    }

    payload
}

pub fn prepare_ok(statement_id: u32, params: u16, columns: u16) -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend_from_slice(&statement_id.to_le_bytes());
    payload.extend_from_slice(&columns.to_le_bytes());
    payload.extend_from_slice(&params.to_le_bytes());
    payload.push(0); // reserved
    payload.extend_from_slice(&0_u16.to_le_bytes()); // warnings
    payload
}

/// The `mysql_native_password` response the client must produce for
/// `password` against the 20-byte challenge.
pub fn native_scramble(password: &str, nonce: &[u8]) -> Vec<u8> {
    use sha1::{Digest, Sha1};

    let mut ctx = Sha1::new();

    ctx.update(password);
    let mut pw_hash = ctx.finalize_reset();

    ctx.update(pw_hash);
    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(nonce);
    ctx.update(pw_hash_hash);
    let pw_nonce_hash = ctx.finalize();

    for (x, y) in pw_hash.iter_mut().zip(pw_nonce_hash.iter()) {
        *x ^= y;
    }

    pw_hash.to_vec()
}
