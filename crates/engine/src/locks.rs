//! Keyed mutual exclusion.
//!
//! Every balance read-modify-write runs while holding the lock of the asset it
//! touches, so two writers never both observe the pre-mutation balance.
//! Writers touching several assets lock them in ascending id order. The budget
//! evaluator uses a second table keyed by budget id so its read-decide-insert
//! of alerts is never interleaved.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    time::{Instant, timeout_at},
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

type LockTable = HashMap<Uuid, Arc<AsyncMutex<()>>>;

/// Keyed table of async mutexes, one per id.
///
/// Entries are created on demand and dropped again once no guard or waiter
/// references them. Clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct KeyedLocks {
    table: Arc<Mutex<LockTable>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(id).or_default().clone()
    }

    /// Locks every id in `ids` (duplicates allowed), in ascending order,
    /// within `timeout` overall.
    ///
    /// On expiry the locks taken so far are released and
    /// [`EngineError::LockTimeout`] is returned.
    pub async fn acquire(
        &self,
        ids: &[Uuid],
        timeout: Duration,
    ) -> ResultEngine<KeyedLockGuard> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let deadline = Instant::now() + timeout;
        let mut guard = KeyedLockGuard {
            locks: self.clone(),
            ids: Vec::with_capacity(ids.len()),
            held: Vec::with_capacity(ids.len()),
        };

        for id in ids {
            let mutex = self.entry(id);
            guard.ids.push(id);
            match timeout_at(deadline, mutex.lock_owned()).await {
                Ok(held) => guard.held.push(held),
                Err(_) => {
                    tracing::debug!(%id, ?timeout, "lock timed out");
                    return Err(EngineError::LockTimeout(format!(
                        "{id} still locked after {}ms",
                        timeout.as_millis()
                    )));
                }
            }
        }

        Ok(guard)
    }

    /// Number of ids with a live lock entry.
    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prune(&self, ids: &[Uuid]) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            if table
                .get(id)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                table.remove(id);
            }
        }
    }
}

/// Holds the locks of one or more ids until dropped.
#[derive(Debug)]
pub struct KeyedLockGuard {
    locks: KeyedLocks,
    ids: Vec<Uuid>,
    held: Vec<OwnedMutexGuard<()>>,
}

impl KeyedLockGuard {
    #[cfg(test)]
    fn ids(&self) -> &[Uuid] {
        &self.ids
    }
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        // Release in reverse acquisition order, then forget idle entries.
        while let Some(held) = self.held.pop() {
            drop(held);
        }
        self.locks.prune(&self.ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = KeyedLocks::new();
        let id = Uuid::new_v4();

        let _held = locks.acquire(&[id], Duration::from_secs(1)).await.unwrap();
        let err = locks
            .acquire(&[id], Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.code(), "lock_timeout");
    }

    #[tokio::test]
    async fn release_allows_next_writer_and_prunes() {
        let locks = KeyedLocks::new();
        let id = Uuid::new_v4();

        let held = locks.acquire(&[id], Duration::from_secs(1)).await.unwrap();
        assert_eq!(locks.tracked(), 1);
        drop(held);
        assert_eq!(locks.tracked(), 0);

        let again = locks.acquire(&[id], Duration::from_millis(50)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn ids_are_sorted_and_deduplicated() {
        let locks = KeyedLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let guard = locks
            .acquire(&[b, a, b], Duration::from_secs(1))
            .await
            .unwrap();
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(guard.ids(), expected.as_slice());
    }

    #[tokio::test]
    async fn different_assets_do_not_block_each_other() {
        let locks = KeyedLocks::new();
        let _a = locks
            .acquire(&[Uuid::new_v4()], Duration::from_secs(1))
            .await
            .unwrap();
        let b = locks
            .acquire(&[Uuid::new_v4()], Duration::from_millis(20))
            .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn opposite_order_requests_do_not_deadlock() {
        let locks = KeyedLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut tasks = Vec::new();
        for i in 0..20 {
            let locks = locks.clone();
            let ids = if i % 2 == 0 { [a, b] } else { [b, a] };
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire(&ids, Duration::from_secs(5)).await?;
                tokio::task::yield_now().await;
                Ok::<_, EngineError>(())
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(locks.tracked(), 0);
    }
}
