//! Thread-safe pool service.
//!
//! Wraps a [`PoolManager`] in a mutex so the select-journal-mutate sequence
//! of each call runs as one unit: concurrent callers never pick the same
//! resource, and journal lines are totally ordered.
//!
//! Also offers [`SharedPool::allocate_wait`], which parks the caller until a
//! release makes something idle or a timeout passes.

use crate::manager::{PoolManager, PoolSnapshot, ResourceHandle};
use parking_lot::Mutex;
use respool_core::{PoolError, PoolResult, ResourceId};
use respool_journal::JournalSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct Shared<J: JournalSink> {
    manager: Mutex<PoolManager<J>>,
    /// Signalled whenever a resource becomes idle.
    idle: Notify,
}

pub struct SharedPool<J: JournalSink> {
    inner: Arc<Shared<J>>,
}

impl<J: JournalSink> Clone for SharedPool<J> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: JournalSink> SharedPool<J> {
    pub fn new(manager: PoolManager<J>) -> Self {
        Self {
            inner: Arc::new(Shared {
                manager: Mutex::new(manager),
                idle: Notify::new(),
            }),
        }
    }

    /// Immediate allocation; `PoolExhausted` when nothing is idle.
    pub fn allocate(&self) -> PoolResult<ResourceHandle> {
        self.inner.manager.lock().allocate()
    }

    /// Allocates, waiting up to `timeout` for a release if the pool is
    /// exhausted.
    ///
    /// - Waiters are not queued: every release wakes all of them and they
    ///   race for the lock. Whoever loses goes back to waiting.
    /// - Returns `WaitTimedOut(timeout)` once the deadline passes.
    /// - Dropping the future cancels the wait. Nothing is allocated until an
    ///   attempt under the lock succeeds, so cancellation has no side
    ///   effects.
    /// - Any error other than exhaustion is returned immediately.
    pub async fn allocate_wait(&self, timeout: Duration) -> PoolResult<ResourceHandle> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register before trying so a release between the attempt and
            // the await is not missed.
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.allocate() {
                Err(PoolError::PoolExhausted) => {}
                other => return other,
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                tracing::debug!(?timeout, "allocation wait timed out");
                return Err(PoolError::WaitTimedOut(timeout));
            }
        }
    }

    pub fn release(&self, handle: ResourceHandle) -> PoolResult<()> {
        self.inner.manager.lock().release(handle)?;
        self.inner.idle.notify_waiters();
        Ok(())
    }

    pub fn release_id(&self, id: ResourceId) -> PoolResult<()> {
        self.inner.manager.lock().release_id(id)?;
        self.inner.idle.notify_waiters();
        Ok(())
    }

    pub fn begin_maintenance(&self, id: ResourceId) -> PoolResult<()> {
        self.inner.manager.lock().begin_maintenance(id)
    }

    pub fn end_maintenance(&self, id: ResourceId) -> PoolResult<()> {
        self.inner.manager.lock().end_maintenance(id)?;
        self.inner.idle.notify_waiters();
        Ok(())
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.inner.manager.lock().snapshot()
    }

    /// Runs `f` with exclusive access to the manager.
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut PoolManager<J>) -> R) -> R {
        let mut manager = self.inner.manager.lock();
        f(&mut *manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use respool_journal::MemoryJournal;

    fn shared(n: u64) -> (SharedPool<MemoryJournal>, MemoryJournal) {
        let journal = MemoryJournal::new();
        let mut manager = PoolManager::new(journal.clone(), PoolConfig::default());
        manager.seed_many((1..=n).map(ResourceId)).unwrap();
        (SharedPool::new(manager), journal)
    }

    #[test]
    fn clones_share_state() {
        let (pool, _) = shared(2);
        let other = pool.clone();
        assert_eq!(pool.allocate().unwrap().id(), ResourceId(1));
        assert_eq!(other.allocate().unwrap().id(), ResourceId(2));
        assert!(matches!(other.allocate(), Err(PoolError::PoolExhausted)));
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_idle() {
        let (pool, _) = shared(1);
        let h = pool.allocate_wait(Duration::from_millis(10)).await.unwrap();
        assert_eq!(h.id(), ResourceId(1));
    }

    #[tokio::test]
    async fn wait_times_out() {
        let (pool, journal) = shared(1);
        pool.allocate().unwrap();

        let err = pool
            .allocate_wait(Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::WaitTimedOut(_)));
        assert_eq!(journal.len(), 1);
    }

    #[tokio::test]
    async fn wait_picks_up_release() {
        let (pool, journal) = shared(1);
        let held = pool.allocate().unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.allocate_wait(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.release(held).unwrap();

        let h = waiter.await.unwrap().unwrap();
        assert_eq!(h.id(), ResourceId(1));
        assert_eq!(
            journal.lines(),
            vec![
                "Allocated resource ID: 1",
                "Released resource ID: 1",
                "Allocated resource ID: 1",
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_wait_allocates_nothing() {
        let (pool, journal) = shared(1);
        let held = pool.allocate().unwrap();

        let wait = pool.allocate_wait(Duration::from_secs(5));
        let cancelled = tokio::time::timeout(Duration::from_millis(10), wait).await;
        assert!(cancelled.is_err());

        pool.release(held).unwrap();
        assert_eq!(pool.snapshot().idle, 1);
        assert_eq!(journal.len(), 2);
    }

    #[tokio::test]
    async fn end_maintenance_wakes_waiter() {
        let (pool, _) = shared(1);
        pool.begin_maintenance(ResourceId(1)).unwrap();

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.allocate_wait(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.end_maintenance(ResourceId(1)).unwrap();

        assert_eq!(waiter.await.unwrap().unwrap().id(), ResourceId(1));
    }

    #[test]
    fn with_manager_gives_exclusive_access() {
        let (pool, _) = shared(3);
        let len = pool.with_manager(|m| m.len());
        assert_eq!(len, 3);
    }
}
