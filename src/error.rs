use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use crate::protocol::response::ErrPacket;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents all the ways a method can fail within the client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Error occurred while parsing the connection options.
    #[error("error with configuration: {0}")]
    Configuration(#[source] Box<dyn StdError + Send + Sync>),

    /// Error communicating with the database server.
    #[error("error communicating with database server: {0}")]
    Io(#[from] io::Error),

    /// Error occurred while attempting to establish a TLS connection.
    #[error("error occurred while attempting to establish a TLS connection: {0}")]
    Tls(#[source] Box<dyn StdError + Send + Sync>),

    /// Unexpected or invalid data encountered while communicating with the server.
    ///
    /// This should indicate there is a programming error in the client or
    /// there is something corrupted with the connection to the server itself.
    /// The session is force-closed when this surfaces mid-command.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// An error returned by the database server.
    ///
    /// Non-fatal: the session may continue to serve further commands.
    #[error("error returned from database: {0}")]
    Database(#[source] MySqlDatabaseError),

    /// The connection is closed; no further commands may be issued on it.
    #[error("connection is closed")]
    ConnectionClosed,

    /// The server requested TLS-incompatible or unknown authentication.
    #[error("unsupported authentication plugin: {0}")]
    UnsupportedAuthPlugin(String),

    /// TLS was requested but the server does not advertise support for it.
    #[error("server does not support TLS")]
    TlsUnsupported,

    /// The authentication method requires sending the password in clear text
    /// and the transport is not secured.
    #[error("refusing to send the password in clear text over an insecure transport")]
    InsecureAuth,

    /// A statement was executed with the wrong number of parameters.
    #[error("statement takes {expected} parameters but {given} were given")]
    ParameterCountMismatch { expected: usize, given: usize },

    /// A bound parameter value has no MySQL wire representation.
    #[error("parameter of type `{0}` cannot be represented in the binary protocol")]
    UnsupportedParameterType(&'static str),

    /// `transactional` was invoked on a session that is already inside a
    /// transaction.
    #[error("cannot begin a transaction within a transaction")]
    NestedTransaction,

    /// A command did not receive its response within the configured timeout.
    ///
    /// The socket is left open; response bytes for the timed-out command may
    /// still arrive, so the session should be closed by the caller.
    #[error("timed out waiting for a response from the server")]
    Timeout,

    /// A column value could not be converted to the requested type.
    #[error("column value of type {from} cannot be read as {to}")]
    ColumnDecode {
        from: &'static str,
        to: &'static str,
    },

    /// No column with the given name exists in the row.
    #[error("no column found for name: {0}")]
    ColumnNotFound(String),

    /// Column index was out of bounds.
    #[error("column index out of bounds: the len is {len}, but the index is {index}")]
    ColumnIndexOutOfBounds { index: usize, len: usize },

    /// `Pool::acquire` waited longer than the configured acquire timeout.
    #[error("pool timed out while waiting for an open connection")]
    PoolTimedOut,

    /// `Pool::close` was called while the connection was waiting in the pool
    /// or a method was called on a closed pool.
    #[error("attempted to acquire a connection on a closed pool")]
    PoolClosed,
}

impl Error {
    #[inline]
    pub(crate) fn config(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Configuration(err.into())
    }

    #[inline]
    pub(crate) fn tls(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Tls(err.into())
    }

    /// Returns `true` for transport-layer errors and timeouts.
    ///
    /// This is the default eligibility test for the pool's retry policy when
    /// no user predicate is configured.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Timeout | Error::PoolTimedOut)
    }

    /// Returns the server error, if this error was returned by the server.
    #[must_use]
    pub fn as_database_error(&self) -> Option<&MySqlDatabaseError> {
        match self {
            Error::Database(error) => Some(error),
            _ => None,
        }
    }
}

/// An error returned from the MySQL database server.
#[derive(Debug)]
pub struct MySqlDatabaseError(pub(crate) ErrPacket);

impl MySqlDatabaseError {
    /// Returns a human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.error_message
    }

    /// Returns the MySQL error code.
    ///
    /// All possible error codes are documented in the
    /// [Server Error Message Reference](https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html).
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.0.error_code
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0.error_code, self.message())
    }
}

impl StdError for MySqlDatabaseError {}

impl From<MySqlDatabaseError> for Error {
    fn from(error: MySqlDatabaseError) -> Self {
        Error::Database(error)
    }
}

// Constructs `Error::Protocol` with a formatted message.
macro_rules! err_protocol {
    ($($args:tt)*) => {
        $crate::error::Error::Protocol(format!($($args)*))
    };
}
