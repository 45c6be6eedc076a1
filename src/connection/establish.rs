use crate::cache::StatementCache;
use crate::collation;
use crate::connection::stream::MySqlStream;
use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::io::ProtocolEncode;
use crate::net::Socket;
use crate::options::MySqlConnectOptions;
use crate::protocol::auth::AuthPlugin;
use crate::protocol::connect::{AuthSwitchRequest, Handshake, HandshakeResponse, SslRequest};
use crate::protocol::{Capabilities, Packet};

// https://dev.mysql.com/doc/internals/en/connection-phase.html
//
// the connection phase:
//  - exchange the capabilities of client and server
//  - set up a TLS channel if requested
//  - authenticate the client against the server

const MAX_PACKET_SIZE: u32 = 50 * 1024 * 1024;

impl MySqlConnection {
    pub(crate) async fn establish(options: &MySqlConnectOptions) -> Result<Self> {
        tokio::time::timeout(options.connect_timeout, do_establish(options))
            .await
            .map_err(|_| Error::Timeout)?
    }
}

async fn do_establish(options: &MySqlConnectOptions) -> Result<MySqlConnection> {
    let collation_id = collation::collation_id(&options.collation).ok_or_else(|| {
        Error::config(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unknown collation {:?}", options.collation),
        ))
    })?;

    let socket = match &options.socket {
        Some(path) => Socket::connect_uds(path).await?,
        None => Socket::connect_tcp(&options.host, options.port).await?,
    };

    let mut capabilities = Capabilities::BASE;

    if options.database.is_some() {
        capabilities |= Capabilities::CONNECT_WITH_DB;
    }

    if options.ssl_mode.wants_tls() {
        capabilities |= Capabilities::SSL;
    }

    let mut stream = MySqlStream::new(socket, capabilities);

    let handshake: Handshake = stream.recv_packet().await?.decode()?;

    stream.server_version = handshake.server_version;
    stream.connection_id = handshake.connection_id;

    // TLS negotiation comes before credentials
    if options.ssl_mode.wants_tls() {
        if handshake.server_capabilities.contains(Capabilities::SSL) {
            stream.write_packet(SslRequest {
                max_packet_size: MAX_PACKET_SIZE,
                collation: collation_id,
            })?;

            stream = stream.upgrade_tls(options).await?;
        } else if options.ssl_mode.requires_tls() {
            return Err(Error::TlsUnsupported);
        } else {
            // `preferred` falls back to plain TCP; stop advertising SSL
            stream.capabilities &= !Capabilities::SSL;
        }
    }

    let mut plugin = handshake.auth_plugin.unwrap_or(AuthPlugin::MySqlNativePassword);
    let mut nonce = handshake.auth_plugin_data;

    let password = options.password.as_deref().unwrap_or_default();

    stream.write_packet(HandshakeResponse {
        max_packet_size: MAX_PACKET_SIZE,
        collation: collation_id,
        username: &options.username,
        database: options.database.as_deref(),
        auth_plugin_name: plugin.name(),
        auth_response: &plugin.scramble(password, &nonce),
    })?;

    stream.flush().await?;

    loop {
        let packet = stream.recv_packet().await?;

        match packet[0] {
            0x00 => {
                // authenticated
                break;
            }

            0xfe => {
                // restart authentication, answering at the next sequence id.
                // only a switch to mysql_native_password is honored
                let switch: AuthSwitchRequest = packet.decode()?;

                if switch.plugin != AuthPlugin::MySqlNativePassword {
                    return Err(Error::UnsupportedAuthPlugin(
                        switch.plugin.name().to_owned(),
                    ));
                }

                plugin = switch.plugin;
                nonce = switch.data;

                stream.write_packet(RawPayload(&plugin.scramble(password, &nonce)))?;
                stream.flush().await?;
            }

            0x01 => {
                handle_extra_auth(&mut stream, &packet, plugin, password).await?;
            }

            tag => {
                return Err(err_protocol!(
                    "unexpected packet 0x{tag:02x} during authentication"
                ));
            }
        }
    }

    let mut conn = MySqlConnection {
        stream,
        cache: StatementCache::new(options.statement_cache_capacity),
        command_timeout: options.command_timeout,
        in_transaction: false,
        closed: false,
        close_observers: Vec::new(),
    };

    // fix the session character set and collation; the wire is always utf8mb4.
    // the collation assignment comes last: assigning a character set resets
    // the collation to that set's default
    conn.raw_query(&format!(
        "SET character_set_client = utf8mb4, character_set_connection = utf8mb4, \
         character_set_results = utf8mb4, collation_connection = '{}'",
        options.collation
    ))
    .await?;

    Ok(conn)
}

async fn handle_extra_auth(
    stream: &mut MySqlStream,
    packet: &Packet,
    plugin: AuthPlugin,
    password: &str,
) -> Result<()> {
    if plugin != AuthPlugin::CachingSha2Password || packet.len() < 2 {
        return Err(err_protocol!(
            "unexpected extra auth data for auth plugin {:?}",
            plugin.name()
        ));
    }

    match packet[1] {
        // fast path succeeded against the server's scramble cache;
        // OK (or ERR) follows
        0x03 => Ok(()),

        // full authentication: the server does not have the scramble cached
        // and needs the password itself, which may only travel over a
        // secured transport
        0x04 => {
            if !stream.is_secure() {
                return Err(Error::InsecureAuth);
            }

            let mut cleartext = password.as_bytes().to_vec();
            cleartext.push(0);

            stream.write_packet(RawPayload(&cleartext))?;
            stream.flush().await?;

            Ok(())
        }

        status => Err(err_protocol!(
            "unexpected authentication status 0x{status:02x}; expected 0x03 (fast) or 0x04 (full)"
        )),
    }
}

// An already-encoded payload, written verbatim.
struct RawPayload<'a>(&'a [u8]);

impl ProtocolEncode<Capabilities> for RawPayload<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<(), Error> {
        buf.extend_from_slice(self.0);
        Ok(())
    }
}
