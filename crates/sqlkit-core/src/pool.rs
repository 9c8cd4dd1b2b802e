//! Connection pool (spec.md §5 "Shared-resource policy", §6.1).
//!
//! No teacher file owns connection pooling — `oxide-migrate` delegates to
//! `sqlx`'s built-in pool — so this module is built directly from
//! spec.md's prose: a single state lock plus condition variable for
//! acquire/release, and a secondary min-heap monitor thread that expires
//! timed-out waiters with one broadcast rather than each waiter polling
//! its own timer (spec.md §9 "Open questions" resolves this in favor of
//! the single centralised monitor).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant};

use crate::error::{Error, PoolError, Result};
use crate::exec::Connection;

/// Pool sizing and timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Connections kept warm even when idle. Currently informational;
    /// the pool does not pre-open connections eagerly past this count.
    pub min_size: usize,
    /// Hard ceiling on concurrently checked-out connections.
    pub max_size: usize,
    /// How long `acquire` waits for a free connection before failing.
    pub acquire_timeout: Duration,
    /// Idle duration past which a connection is health-checked
    /// (`SELECT 1`) before being handed out again.
    pub health_check_interval: Duration,
}

/// A point-in-time snapshot of pool metrics (spec.md §5, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Connections currently checked out.
    pub in_use: usize,
    /// The pool's configured maximum size.
    pub max_size: usize,
    /// Cumulative health-check failures.
    pub health_check_failures: u64,
    /// Cumulative reconnections performed after a failed health check.
    pub reconnections: u64,
}

struct Idle<C> {
    conn: C,
    last_used: Instant,
}

struct PoolState<C> {
    idle: VecDeque<Idle<C>>,
    in_use: usize,
    closed: bool,
}

/// A bounded pool of connections of type `C`, built from a factory
/// closure rather than driving any particular wire protocol itself.
pub struct Pool<C: Connection + Send + 'static> {
    config: PoolConfig,
    factory: Box<dyn Fn() -> Result<C> + Send + Sync + 'static>,
    state: Mutex<PoolState<C>>,
    state_changed: Condvar,
    deadlines: Mutex<BinaryHeap<Reverse<(Instant, u64)>>>,
    expired: Mutex<HashSet<u64>>,
    cancelled: Mutex<HashSet<u64>>,
    monitor_wake: Condvar,
    monitor_lock: Mutex<()>,
    next_waiter_id: AtomicU64,
    stop: AtomicBool,
    health_check_failures: AtomicU64,
    reconnections: AtomicU64,
    self_weak: Weak<Self>,
}

impl<C: Connection + Send + 'static> Pool<C> {
    /// Builds a pool and starts its background timeout monitor.
    pub fn new(config: PoolConfig, factory: impl Fn() -> Result<C> + Send + Sync + 'static) -> Arc<Self> {
        let pool = Arc::new_cyclic(|weak| Self {
            config,
            factory: Box::new(factory),
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                in_use: 0,
                closed: false,
            }),
            state_changed: Condvar::new(),
            deadlines: Mutex::new(BinaryHeap::new()),
            expired: Mutex::new(HashSet::new()),
            cancelled: Mutex::new(HashSet::new()),
            monitor_wake: Condvar::new(),
            monitor_lock: Mutex::new(()),
            next_waiter_id: AtomicU64::new(0),
            stop: AtomicBool::new(false),
            health_check_failures: AtomicU64::new(0),
            reconnections: AtomicU64::new(0),
            self_weak: weak.clone(),
        });
        let monitor_pool = Arc::clone(&pool);
        std::thread::spawn(move || monitor_pool.run_monitor());
        pool
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        let state = self.state.lock().unwrap();
        PoolMetrics {
            in_use: state.in_use,
            max_size: self.config.max_size,
            health_check_failures: self.health_check_failures.load(Ordering::Relaxed),
            reconnections: self.reconnections.load(Ordering::Relaxed),
        }
    }

    /// Checks out a connection, blocking until one is free or
    /// `acquire_timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the pool has been shut down, or
    /// [`PoolError::AcquisitionTimeout`] if no connection became free in
    /// time, or [`PoolError::HealthCheckFatal`] if a stale connection
    /// failed its health check and a replacement could not be opened.
    pub fn acquire(&self) -> Result<PooledConnection<C>> {
        let deadline = Instant::now() + self.config.acquire_timeout;
        let waiter_id = self.next_waiter_id.fetch_add(1, Ordering::Relaxed);
        let mut registered = false;

        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                if registered {
                    self.cancel_waiter(waiter_id);
                }
                return Err(Error::Pool(PoolError::Closed));
            }

            if let Some(conn) = self.try_take_idle(&mut state)? {
                if registered {
                    self.cancel_waiter(waiter_id);
                }
                return Ok(self.check_out(conn));
            }

            if state.in_use < self.config.max_size {
                let conn = (self.factory)()?;
                state.in_use += 1;
                if registered {
                    self.cancel_waiter(waiter_id);
                }
                return Ok(self.check_out(conn));
            }

            if !registered {
                self.register_waiter(waiter_id, deadline);
                registered = true;
            }

            state = self.state_changed.wait(state).unwrap();

            if self.expired.lock().unwrap().remove(&waiter_id) {
                let in_use = state.in_use;
                return Err(Error::Pool(PoolError::AcquisitionTimeout {
                    in_use,
                    max_size: self.config.max_size,
                }));
            }
        }
    }

    fn try_take_idle(&self, state: &mut PoolState<C>) -> Result<Option<C>> {
        while let Some(idle) = state.idle.pop_front() {
            if idle.last_used.elapsed() < self.config.health_check_interval {
                state.in_use += 1;
                return Ok(Some(idle.conn));
            }
            let mut conn = idle.conn;
            match conn.execute_sql("SELECT 1", &[]) {
                Ok(_) => {
                    state.in_use += 1;
                    return Ok(Some(conn));
                }
                Err(_) => {
                    self.health_check_failures.fetch_add(1, Ordering::Relaxed);
                    match (self.factory)() {
                        Ok(fresh) => {
                            self.reconnections.fetch_add(1, Ordering::Relaxed);
                            state.in_use += 1;
                            return Ok(Some(fresh));
                        }
                        Err(e) => return Err(Error::Pool(PoolError::HealthCheckFatal(e.to_string()))),
                    }
                }
            }
        }
        Ok(None)
    }

    fn check_out(&self, conn: C) -> PooledConnection<C> {
        PooledConnection {
            pool: self.self_weak.upgrade().expect("pool outlives its own connections"),
            conn: Some(conn),
        }
    }

    fn release(&self, conn: C) {
        let mut state = self.state.lock().unwrap();
        state.in_use -= 1;
        if state.closed {
            drop(conn);
        } else {
            state.idle.push_back(Idle {
                conn,
                last_used: Instant::now(),
            });
        }
        drop(state);
        self.state_changed.notify_one();
    }

    /// Shuts the pool down: further `acquire` calls fail with
    /// [`PoolError::Closed`], and idle connections are dropped.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.idle.clear();
        }
        self.stop.store(true, Ordering::Relaxed);
        self.state_changed.notify_all();
        let _guard = self.monitor_lock.lock().unwrap();
        self.monitor_wake.notify_all();
    }

    fn register_waiter(&self, id: u64, deadline: Instant) {
        self.deadlines.lock().unwrap().push(Reverse((deadline, id)));
        let _guard = self.monitor_lock.lock().unwrap();
        self.monitor_wake.notify_one();
    }

    fn cancel_waiter(&self, id: u64) {
        self.cancelled.lock().unwrap().insert(id);
    }

    fn run_monitor(&self) {
        loop {
            if self.stop.load(Ordering::Relaxed) {
                return;
            }

            let next_deadline = self.deadlines.lock().unwrap().peek().map(|Reverse((d, _))| *d);

            let guard = self.monitor_lock.lock().unwrap();
            let _guard = match next_deadline {
                None => self.monitor_wake.wait_timeout(guard, Duration::from_secs(60)).unwrap().0,
                Some(deadline) => {
                    let now = Instant::now();
                    let wait_for = deadline.saturating_duration_since(now);
                    self.monitor_wake.wait_timeout(guard, wait_for).unwrap().0
                }
            };

            if self.stop.load(Ordering::Relaxed) {
                return;
            }

            let mut expired_ids = Vec::new();
            {
                let mut heap = self.deadlines.lock().unwrap();
                let now = Instant::now();
                while let Some(&Reverse((deadline, id))) = heap.peek() {
                    if deadline > now {
                        break;
                    }
                    heap.pop();
                    expired_ids.push(id);
                }
            }

            if expired_ids.is_empty() {
                continue;
            }

            let mut cancelled = self.cancelled.lock().unwrap();
            let mut expired = self.expired.lock().unwrap();
            for id in expired_ids {
                if !cancelled.remove(&id) {
                    expired.insert(id);
                }
            }
            drop(expired);
            drop(cancelled);

            self.state_changed.notify_all();
        }
    }
}

/// A checked-out connection; returns to the pool's idle set when dropped.
pub struct PooledConnection<C: Connection + Send + 'static> {
    pool: Arc<Pool<C>>,
    conn: Option<C>,
}

impl<C: Connection + Send + 'static> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("connection checked out")
    }
}

impl<C: Connection + Send + 'static> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection checked out")
    }
}

impl<C: Connection + Send + 'static> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{RawRow, WireValue};
    use crate::exec::ColumnInfo;
    use std::sync::atomic::AtomicU32;

    struct FakeRow;
    impl RawRow for FakeRow {
        fn columns(&self) -> Vec<String> {
            Vec::new()
        }
        fn get(&self, _column: &str) -> Option<WireValue> {
            None
        }
    }

    struct FakeConnection {
        healthy: Arc<AtomicBool>,
    }

    impl Connection for FakeConnection {
        type Row = FakeRow;

        fn execute_sql(&mut self, sql: &str, _params: &[WireValue]) -> Result<Vec<Self::Row>> {
            if sql == "SELECT 1" && !self.healthy.load(Ordering::Relaxed) {
                return Err(Error::Execution(crate::error::ExecutionError::message("down")));
            }
            Ok(Vec::new())
        }

        fn list_tables(&mut self, _schema: Option<&str>) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn describe_table(&mut self, _table: &str, _schema: Option<&str>) -> Result<Vec<ColumnInfo>> {
            Ok(Vec::new())
        }
    }

    fn test_config() -> PoolConfig {
        PoolConfig {
            min_size: 0,
            max_size: 2,
            acquire_timeout: Duration::from_millis(200),
            health_check_interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_acquire_and_release_reuses_connection() {
        let created = Arc::new(AtomicU32::new(0));
        let created_for_factory = Arc::clone(&created);
        let healthy = Arc::new(AtomicBool::new(true));
        let pool = Pool::new(test_config(), move || {
            created_for_factory.fetch_add(1, Ordering::Relaxed);
            Ok(FakeConnection { healthy: Arc::clone(&healthy) })
        });

        {
            let _conn = pool.acquire().unwrap();
            assert_eq!(pool.metrics().in_use, 1);
        }
        assert_eq!(pool.metrics().in_use, 0);
        let _conn2 = pool.acquire().unwrap();
        assert_eq!(created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_acquire_times_out_at_max_size() {
        let healthy = Arc::new(AtomicBool::new(true));
        let pool = Pool::new(test_config(), move || Ok(FakeConnection { healthy: Arc::clone(&healthy) }));

        let _a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();
        match err {
            Error::Pool(PoolError::AcquisitionTimeout { in_use, max_size }) => {
                assert_eq!(in_use, 2);
                assert_eq!(max_size, 2);
            }
            other => panic!("expected AcquisitionTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_closed_pool_rejects_acquire() {
        let healthy = Arc::new(AtomicBool::new(true));
        let pool = Pool::new(test_config(), move || Ok(FakeConnection { healthy: Arc::clone(&healthy) }));
        pool.close();
        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, Error::Pool(PoolError::Closed)));
    }

    #[test]
    fn test_unhealthy_idle_connection_is_replaced() {
        let healthy = Arc::new(AtomicBool::new(true));
        let healthy_for_factory = Arc::clone(&healthy);
        let mut config = test_config();
        config.health_check_interval = Duration::from_millis(1);
        let pool = Pool::new(config, move || Ok(FakeConnection { healthy: Arc::clone(&healthy_for_factory) }));

        {
            let _conn = pool.acquire().unwrap();
        }
        healthy.store(false, Ordering::Relaxed);
        std::thread::sleep(Duration::from_millis(5));
        let _conn = pool.acquire().unwrap();
        assert_eq!(pool.metrics().health_check_failures, 1);
        assert_eq!(pool.metrics().reconnections, 1);
    }
}
