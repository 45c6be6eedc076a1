use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use futures_core::future::BoxFuture;

use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::options::MySqlConnectOptions;
use crate::pool::MySqlPool;

pub(crate) type AfterConnect =
    Arc<dyn for<'c> Fn(&'c mut MySqlConnection) -> BoxFuture<'c, Result<()>> + Send + Sync>;

pub(crate) type RetryPredicate = Arc<dyn Fn(&Error) -> bool + Send + Sync>;

/// Configuration for the retry behaviour of
/// [`MySqlPool::with_connection`] and [`MySqlPool::transactional`].
#[derive(Clone)]
pub struct RetryOptions {
    pub(crate) max_attempts: u32,
    pub(crate) delay: Duration,
    pub(crate) retry_if: Option<RetryPredicate>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_millis(50),
            retry_if: None,
        }
    }
}

impl Debug for RetryOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("retry_if", &self.retry_if.as_ref().map(|_| ".."))
            .finish()
    }
}

impl RetryOptions {
    /// Total number of attempts a callback may take, first try included.
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Base delay between attempts; attempt `n` waits `delay * n`.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Custom eligibility test for retrying an error. When absent, only
    /// transport errors and timeouts are retried.
    #[must_use]
    pub fn retry_if(mut self, predicate: impl Fn(&Error) -> bool + Send + Sync + 'static) -> Self {
        self.retry_if = Some(Arc::new(predicate));
        self
    }
}

/// Configuration for [`MySqlPool`].
#[derive(Clone)]
pub struct MySqlPoolOptions {
    pub(crate) max_connections: usize,
    pub(crate) acquire_timeout: Duration,
    pub(crate) idle_test_threshold: Duration,
    pub(crate) max_connection_age: Duration,
    pub(crate) max_session_use: Duration,
    pub(crate) max_error_count: u32,
    pub(crate) time_zone: Option<String>,
    pub(crate) after_connect: Option<AfterConnect>,
    pub(crate) retry: RetryOptions,
}

impl Default for MySqlPoolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MySqlPoolOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlPoolOptions")
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("idle_test_threshold", &self.idle_test_threshold)
            .field("max_connection_age", &self.max_connection_age)
            .field("max_session_use", &self.max_session_use)
            .field("max_error_count", &self.max_error_count)
            .field("time_zone", &self.time_zone)
            .field("retry", &self.retry)
            .finish()
    }
}

impl MySqlPoolOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_test_threshold: Duration::from_secs(60),
            max_connection_age: Duration::from_secs(12 * 60 * 60),
            max_session_use: Duration::from_secs(8 * 60 * 60),
            max_error_count: 64,
            time_zone: None,
            after_connect: None,
            retry: RetryOptions::default(),
        }
    }

    /// Upper bound on open sessions, in-flight dials included.
    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// How long an acquisition may wait for a free session before failing
    /// with [`Error::PoolTimedOut`].
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sessions idle for longer than this are health-checked with
    /// `SELECT 1` before being handed out.
    #[must_use]
    pub fn idle_test_threshold(mut self, threshold: Duration) -> Self {
        self.idle_test_threshold = threshold;
        self
    }

    /// Sessions older than this are recycled on release or acquisition.
    #[must_use]
    pub fn max_connection_age(mut self, age: Duration) -> Self {
        self.max_connection_age = age;
        self
    }

    /// Sessions whose accumulated borrowed time exceeds this are recycled.
    #[must_use]
    pub fn max_session_use(mut self, usage: Duration) -> Self {
        self.max_session_use = usage;
        self
    }

    /// Sessions that produced this many callback errors are recycled.
    #[must_use]
    pub fn max_error_count(mut self, count: u32) -> Self {
        self.max_error_count = count;
        self
    }

    /// Run `SET time_zone = ...` on every new pooled session.
    #[must_use]
    pub fn time_zone(mut self, time_zone: &str) -> Self {
        self.time_zone = Some(time_zone.to_owned());
        self
    }

    /// Callback to run once on every newly opened pooled session.
    #[must_use]
    pub fn after_connect<F>(mut self, callback: F) -> Self
    where
        F: for<'c> Fn(&'c mut MySqlConnection) -> BoxFuture<'c, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.after_connect = Some(Arc::new(callback));
        self
    }

    /// Retry policy for [`MySqlPool::with_connection`] callbacks.
    #[must_use]
    pub fn retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    /// Create a pool for `url`, validating it by opening one session.
    pub async fn connect(self, url: &str) -> Result<MySqlPool> {
        self.connect_with(url.parse()?).await
    }

    /// Create a pool with explicit connection options, validating them by
    /// opening one session.
    pub async fn connect_with(self, options: MySqlConnectOptions) -> Result<MySqlPool> {
        let pool = self.connect_lazy_with(options);

        // open one session eagerly so configuration errors surface now
        let conn = pool.acquire().await?;
        drop(conn);

        Ok(pool)
    }

    /// Create a pool that opens sessions only on demand.
    #[must_use]
    pub fn connect_lazy_with(self, options: MySqlConnectOptions) -> MySqlPool {
        MySqlPool::new(self, options)
    }
}
