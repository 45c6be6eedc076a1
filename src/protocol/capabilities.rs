use bitflags::bitflags;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/group__group__cs__capabilities__flags.html
// https://mariadb.com/kb/en/connection/#capabilities

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        // Database name can be specified on connect in the handshake response.
        const CONNECT_WITH_DB = 0x0000_0008;

        // New 4.1+ protocol.
        const PROTOCOL_41 = 0x0000_0200;

        // Client supports switching to TLS after the initial handshake.
        const SSL = 0x0000_0800;

        // New 4.1+ authentication.
        const SECURE_CONNECTION = 0x0000_8000;

        // Client may send multiple statements per query.
        const MULTI_STATEMENTS = 0x0001_0000;

        // Client can handle multiple result sets per query.
        const MULTI_RESULTS = 0x0002_0000;

        // Client supports pluggable authentication.
        const PLUGIN_AUTH = 0x0008_0000;

        // Length-encoded auth response in the handshake response.
        const PLUGIN_AUTH_LENENC_DATA = 0x0020_0000;
    }
}

impl Capabilities {
    /// The capability set the client always advertises.
    pub(crate) const BASE: Capabilities = Capabilities::PROTOCOL_41
        .union(Capabilities::SECURE_CONNECTION)
        .union(Capabilities::PLUGIN_AUTH)
        .union(Capabilities::PLUGIN_AUTH_LENENC_DATA)
        .union(Capabilities::MULTI_STATEMENTS)
        .union(Capabilities::MULTI_RESULTS);
}
