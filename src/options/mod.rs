mod parse;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::collation;
use crate::connection::MySqlConnection;
use crate::error::{Error, Result};

/// Options which can be used to configure how a MySQL connection is opened.
///
/// Can be built by hand or parsed from a connection URL:
///
/// ```text
/// mysql://[user[:password]@][host][:port][/database][?ssl-mode=...]
/// ```
#[derive(Debug, Clone)]
pub struct MySqlConnectOptions {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) socket: Option<PathBuf>,
    pub(crate) username: String,
    pub(crate) password: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) ssl_mode: MySqlSslMode,
    pub(crate) ssl_ca: Option<PathBuf>,
    pub(crate) collation: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) command_timeout: Option<Duration>,
    pub(crate) statement_cache_capacity: usize,
}

impl Default for MySqlConnectOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlConnectOptions {
    /// Creates a new, default set of options ready for configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            socket: None,
            username: "root".to_owned(),
            password: None,
            database: None,
            ssl_mode: MySqlSslMode::Required,
            ssl_ca: None,
            collation: collation::DEFAULT_COLLATION.to_owned(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: None,
            statement_cache_capacity: 32,
        }
    }

    /// Sets the name of the host to connect to.
    #[must_use]
    pub fn host(mut self, host: &str) -> Self {
        host.clone_into(&mut self.host);
        self
    }

    /// Sets the port to connect to. Defaults to 3306.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Connect through a Unix domain socket instead of TCP.
    #[must_use]
    pub fn socket(mut self, path: impl AsRef<Path>) -> Self {
        self.socket = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the username to authenticate as.
    #[must_use]
    pub fn username(mut self, username: &str) -> Self {
        username.clone_into(&mut self.username);
        self
    }

    /// Sets the password to authenticate with.
    #[must_use]
    pub fn password(mut self, password: &str) -> Self {
        self.password = Some(password.to_owned());
        self
    }

    /// Sets the database to open on connect.
    #[must_use]
    pub fn database(mut self, database: &str) -> Self {
        self.database = Some(database.to_owned());
        self
    }

    /// Sets whether and how the connection negotiates TLS.
    ///
    /// Defaults to [`MySqlSslMode::Required`].
    #[must_use]
    pub fn ssl_mode(mut self, mode: MySqlSslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Sets a PEM file of trusted root certificates for server verification.
    #[must_use]
    pub fn ssl_ca(mut self, path: impl AsRef<Path>) -> Self {
        self.ssl_ca = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the connection collation, fixed by a `SET` statement right after
    /// the handshake. Defaults to `utf8mb4_general_ci`.
    #[must_use]
    pub fn collation(mut self, collation: &str) -> Self {
        collation.clone_into(&mut self.collation);
        self
    }

    /// Bounds the whole connect-and-authenticate sequence.
    /// Defaults to 10 seconds.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bounds each command's wait for its response. Unset by default.
    ///
    /// On expiry the command fails with [`Error::Timeout`]; the socket stays
    /// open, so the session should be closed afterwards.
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Capacity of the per-connection cache of automatically prepared
    /// statements. Defaults to 32; 0 disables the cache.
    #[must_use]
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    /// Open and authenticate a connection with these options.
    pub async fn connect(&self) -> Result<MySqlConnection> {
        MySqlConnection::establish(self).await
    }
}

/// Options for controlling the desired security state of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MySqlSslMode {
    /// Never use TLS, even if the server supports it.
    Disabled,

    /// Use TLS when the server supports it, plain TCP otherwise.
    Preferred,

    /// Require TLS; fail to connect when the server does not support it.
    /// The server certificate is NOT verified.
    #[default]
    Required,

    /// Like `Required`, and verify the certificate chain against the trusted
    /// roots, tolerating a hostname mismatch.
    VerifyCa,

    /// Like `VerifyCa`, and verify the hostname too.
    VerifyIdentity,
}

impl MySqlSslMode {
    pub(crate) fn wants_tls(self) -> bool {
        !matches!(self, MySqlSslMode::Disabled)
    }

    /// `true` when a server without TLS support is a hard error.
    pub(crate) fn requires_tls(self) -> bool {
        matches!(
            self,
            MySqlSslMode::Required | MySqlSslMode::VerifyCa | MySqlSslMode::VerifyIdentity
        )
    }
}

impl FromStr for MySqlSslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match &*s.to_ascii_lowercase() {
            "disabled" => MySqlSslMode::Disabled,
            "preferred" => MySqlSslMode::Preferred,
            "required" => MySqlSslMode::Required,
            "verify_ca" | "verify-ca" => MySqlSslMode::VerifyCa,
            "verify_identity" | "verify-identity" => MySqlSslMode::VerifyIdentity,

            _ => {
                return Err(Error::config(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unknown value {s:?} for `ssl-mode`"),
                )));
            }
        })
    }
}
