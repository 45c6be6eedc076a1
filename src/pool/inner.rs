use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::options::MySqlConnectOptions;
use crate::pool::options::MySqlPoolOptions;

// How long a full pool sleeps before re-checking for a free session.
const ACQUIRE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One pooled session plus its bookkeeping.
pub(crate) struct PoolEntry {
    pub(crate) conn: MySqlConnection,
    pub(crate) opened_at: Instant,
    pub(crate) borrowed_at: Instant,

    // accumulated borrowed time across all uses
    pub(crate) total_usage: Duration,
    pub(crate) error_count: u32,
}

struct IdleEntry {
    entry: PoolEntry,
    since: Instant,
}

// `idle` and `active` are disjoint by construction: an entry is either in
// the `idle` queue or moved out into a caller's guard (counted by `active`).
// `pending` counts dials in flight. At all times
// idle.len() + active + pending <= max_connections.
struct PoolState {
    idle: VecDeque<IdleEntry>,
    active: usize,
    pending: usize,
}

pub(crate) struct PoolInner {
    pub(crate) options: MySqlPoolOptions,
    connect_options: MySqlConnectOptions,
    state: Mutex<PoolState>,
    closed: AtomicBool,
}

pub(crate) struct PoolStatusSnapshot {
    pub(crate) idle: usize,
    pub(crate) active: usize,
    pub(crate) pending: usize,
}

impl PoolInner {
    pub(crate) fn new(options: MySqlPoolOptions, connect_options: MySqlConnectOptions) -> Self {
        Self {
            options,
            connect_options,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                active: 0,
                pending: 0,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn status(&self) -> PoolStatusSnapshot {
        let state = self.state.lock().expect("pool state poisoned");

        PoolStatusSnapshot {
            idle: state.idle.len(),
            active: state.active,
            pending: state.pending,
        }
    }

    /// The acquisition loop: reuse an idle session when one validates, dial
    /// when there is headroom, otherwise wait cooperatively for a release.
    pub(crate) async fn acquire(self: &Arc<Self>) -> Result<PoolEntry> {
        let deadline = Instant::now() + self.options.acquire_timeout;

        loop {
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }

            enum Plan {
                Reuse(Box<IdleEntry>),
                Dial,
                Wait,
            }

            let plan = {
                let mut state = self.state.lock().expect("pool state poisoned");

                if let Some(idle) = state.idle.pop_front() {
                    state.active += 1;
                    Plan::Reuse(Box::new(idle))
                } else if state.idle.len() + state.active + state.pending
                    < self.options.max_connections
                {
                    state.pending += 1;
                    Plan::Dial
                } else {
                    Plan::Wait
                }
            };

            match plan {
                Plan::Reuse(idle) => {
                    if let Some(entry) = self.validate(*idle).await {
                        return Ok(entry);
                    }

                    // the entry was retired; try again
                    let mut state = self.state.lock().expect("pool state poisoned");
                    state.active -= 1;
                }

                Plan::Dial => {
                    let guard = PendingGuard {
                        pool: self,
                        armed: true,
                    };

                    let conn = self.connect().await?;
                    guard.complete_to_active();

                    let now = Instant::now();

                    return Ok(PoolEntry {
                        conn,
                        opened_at: now,
                        borrowed_at: now,
                        total_usage: Duration::ZERO,
                        error_count: 0,
                    });
                }

                Plan::Wait => {
                    if Instant::now() >= deadline {
                        return Err(Error::PoolTimedOut);
                    }

                    tokio::time::sleep(ACQUIRE_POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Health-check an entry taken from the idle queue. Returns `None` when
    /// the entry was retired instead of handed out.
    async fn validate(&self, idle: IdleEntry) -> Option<PoolEntry> {
        let IdleEntry { mut entry, since } = idle;

        if self.should_recycle(&entry) {
            self.retire(entry.conn);
            return None;
        }

        if since.elapsed() >= self.options.idle_test_threshold {
            if let Err(err) = entry.conn.execute("SELECT 1").await {
                tracing::debug!("pooled session failed its idle test: {err}");
                self.retire(entry.conn);
                return None;
            }
        }

        entry.borrowed_at = Instant::now();

        Some(entry)
    }

    pub(crate) fn should_recycle(&self, entry: &PoolEntry) -> bool {
        entry.opened_at.elapsed() >= self.options.max_connection_age
            || entry.total_usage >= self.options.max_session_use
            || entry.error_count >= self.options.max_error_count
    }

    /// Return a borrowed entry to the pool, applying the recycling policy.
    pub(crate) fn release(&self, mut entry: PoolEntry, had_error: bool) {
        entry.total_usage += entry.borrowed_at.elapsed();

        if had_error {
            entry.error_count += 1;
        }

        let retire =
            self.is_closed() || !entry.conn.is_connected() || self.should_recycle(&entry);

        let mut state = self.state.lock().expect("pool state poisoned");
        state.active -= 1;

        if retire {
            drop(state);
            self.retire(entry.conn);
        } else {
            state.idle.push_back(IdleEntry {
                entry,
                since: Instant::now(),
            });
        }
    }

    /// Close a session in the background, ignoring close errors.
    fn retire(&self, conn: MySqlConnection) {
        tokio::spawn(async move {
            let _ = conn.close().await;
        });
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        let mut conn = self.connect_options.connect().await?;

        if let Some(time_zone) = &self.options.time_zone {
            conn.execute(&format!("SET time_zone = '{}'", time_zone.replace('\'', "''")))
                .await?;
        }

        if let Some(callback) = &self.options.after_connect {
            callback(&mut conn).await?;
        }

        Ok(conn)
    }

    /// Close every idle session and refuse new acquisitions. Borrowed
    /// sessions are closed as they are released.
    pub(crate) async fn close(&self) {
        self.closed.store(true, Ordering::Release);

        let drained: Vec<IdleEntry> = {
            let mut state = self.state.lock().expect("pool state poisoned");
            state.idle.drain(..).collect()
        };

        for idle in drained {
            // close errors during shutdown are deliberately swallowed
            let _ = idle.entry.conn.close().await;
        }
    }
}

// Decrements `pending` even when the dialing future is dropped mid-flight;
// `complete_to_active` converts the reservation into an active slot in one
// locked step so the size invariant holds throughout.
struct PendingGuard<'a> {
    pool: &'a PoolInner,
    armed: bool,
}

impl PendingGuard<'_> {
    fn complete_to_active(mut self) {
        let mut state = self.pool.state.lock().expect("pool state poisoned");
        state.pending -= 1;
        state.active += 1;

        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.pool.state.lock().expect("pool state poisoned");
            state.pending -= 1;
        }
    }
}
