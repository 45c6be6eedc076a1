use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use futures_core::future::BoxFuture;

use crate::arguments::MySqlArgument;
use crate::connection::MySqlConnection;
use crate::error::Result;
use crate::options::MySqlConnectOptions;
use crate::query_result::MySqlQueryResult;

mod inner;
mod options;

pub use options::{MySqlPoolOptions, RetryOptions};

use inner::{PoolEntry, PoolInner};

/// A bounded pool of MySQL sessions shared across concurrent callers.
///
/// Cloning is cheap; all clones draw from the same set of sessions.
#[derive(Clone)]
pub struct MySqlPool(Arc<PoolInner>);

impl Debug for MySqlPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let status = self.status();

        f.debug_struct("MySqlPool")
            .field("idle", &status.idle)
            .field("active", &status.active)
            .field("pending", &status.pending)
            .finish()
    }
}

/// A point-in-time view of the pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlPoolStatus {
    /// Sessions parked in the pool, ready to be handed out.
    pub idle: usize,

    /// Sessions currently borrowed by callers.
    pub active: usize,

    /// Dial-and-handshake attempts in flight.
    pub pending: usize,
}

impl MySqlPool {
    pub(crate) fn new(options: MySqlPoolOptions, connect_options: MySqlConnectOptions) -> Self {
        Self(Arc::new(PoolInner::new(options, connect_options)))
    }

    /// Create a pool for `url` with default options, validating it by
    /// opening one session.
    pub async fn connect(url: &str) -> Result<Self> {
        MySqlPoolOptions::new().connect(url).await
    }

    /// Create a pool with explicit connection options and default pool
    /// options.
    pub async fn connect_with(options: MySqlConnectOptions) -> Result<Self> {
        MySqlPoolOptions::new().connect_with(options).await
    }

    /// Borrow a session from the pool, opening one if the pool has
    /// headroom. Returned to the pool when the guard drops.
    pub async fn acquire(&self) -> Result<PoolConnection> {
        let entry = self.0.acquire().await?;

        Ok(PoolConnection {
            entry: Some(entry),
            had_error: false,
            pool: Arc::clone(&self.0),
        })
    }

    /// Execute SQL on a pooled session.
    pub async fn execute(&self, sql: &str) -> Result<MySqlQueryResult> {
        let mut conn = self.acquire().await?;
        let result = conn.execute(sql).await;
        conn.note_result(&result);

        result
    }

    /// Execute SQL with positional parameters on a pooled session.
    pub async fn execute_with(
        &self,
        sql: &str,
        arguments: &[MySqlArgument],
    ) -> Result<MySqlQueryResult> {
        let mut conn = self.acquire().await?;
        let result = conn.execute_with(sql, arguments).await;
        conn.note_result(&result);

        result
    }

    /// Execute SQL with named parameters on a pooled session.
    pub async fn execute_named(
        &self,
        sql: &str,
        parameters: &[(&str, MySqlArgument)],
    ) -> Result<MySqlQueryResult> {
        let mut conn = self.acquire().await?;
        let result = conn.execute_named(sql, parameters).await;
        conn.note_result(&result);

        result
    }

    /// Run `f` with a borrowed session, retrying per the pool's
    /// [`RetryOptions`] when it fails with an eligible error.
    ///
    /// Each attempt borrows a fresh session, which may or may not be the
    /// same underlying connection.
    pub async fn with_connection<'a, T, F>(&'a self, f: F) -> Result<T>
    where
        F: for<'c> Fn(&'c mut MySqlConnection) -> BoxFuture<'c, Result<T>> + 'a,
    {
        let retry = self.0.options.retry.clone();
        let mut attempt: u32 = 1;

        loop {
            let mut conn = self.acquire().await?;

            match f(&mut *conn).await {
                Ok(value) => return Ok(value),

                Err(err) => {
                    // the release below counts this toward the session's
                    // error budget
                    conn.had_error = true;
                    drop(conn);

                    let eligible = attempt < retry.max_attempts
                        && retry
                            .retry_if
                            .as_ref()
                            .map_or_else(|| err.is_transient(), |p| p(&err));

                    if !eligible {
                        return Err(err);
                    }

                    tracing::debug!(attempt, "retrying pooled callback after error: {err}");
                    tokio::time::sleep(retry.delay * attempt).await;

                    attempt += 1;
                }
            }
        }
    }

    /// Run `f` inside a transaction on a borrowed session, with the same
    /// retry behaviour as [`with_connection`](Self::with_connection).
    pub async fn transactional<'a, T, F>(&'a self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> Fn(&'c mut MySqlConnection) -> BoxFuture<'c, Result<T>> + Send + Sync + 'a + 'static,
    {
        let f = Arc::new(f);

        self.with_connection(move |conn| {
            let f = Arc::clone(&f);
            Box::pin(async move { conn.transactional(move |conn| (*f)(conn)).await })
        })
        .await
    }

    /// A snapshot of the pool's idle/active/pending counts.
    #[must_use]
    pub fn status(&self) -> MySqlPoolStatus {
        let snapshot = self.0.status();

        MySqlPoolStatus {
            idle: snapshot.idle,
            active: snapshot.active,
            pending: snapshot.pending,
        }
    }

    /// `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Close every idle session and block new acquisitions. Sessions
    /// currently borrowed are closed as they come back.
    pub async fn close(&self) {
        self.0.close().await;
    }
}

/// A session borrowed from a [`MySqlPool`], returned on drop.
///
/// Dereferences to [`MySqlConnection`], so every session method is
/// available on the guard.
pub struct PoolConnection {
    entry: Option<PoolEntry>,
    had_error: bool,
    pool: Arc<PoolInner>,
}

impl PoolConnection {
    // Count command failures toward the session's error budget.
    fn note_result<T>(&mut self, result: &Result<T>) {
        if result.is_err() {
            self.had_error = true;
        }
    }
}

impl Debug for PoolConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConnection").finish()
    }
}

impl Deref for PoolConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &MySqlConnection {
        &self.entry.as_ref().expect("connection already released").conn
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut MySqlConnection {
        &mut self.entry.as_mut().expect("connection already released").conn
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.release(entry, self.had_error);
        }
    }
}
