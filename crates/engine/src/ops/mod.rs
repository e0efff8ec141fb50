use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{AlertDeduplicator, KeyedLocks, ResultEngine};

mod access;
mod alerts;
mod assets;
mod balances;
mod budgets;
mod categories;
mod transactions;
mod users;

pub use balances::BalanceCheck;
pub use transactions::Page;

/// Default wait for an asset lock before failing with `LockTimeout`.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Tunables of the write path and the budget evaluator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineSettings {
    pub lock_timeout: Duration,
    pub dedup: AlertDeduplicator,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            dedup: AlertDeduplicator::default(),
        }
    }
}

/// The ledger engine.
///
/// All methods take `&self`; share one instance across tasks with an `Arc`.
/// Balance mutations on the same asset are serialized by an in-process lock
/// table, so one process must own the database for writes. Alert evaluation of
/// a budget is serialized the same way by a table keyed by budget id.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    asset_locks: KeyedLocks,
    budget_locks: KeyedLocks,
    settings: EngineSettings,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn lock_timeout(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.settings.lock_timeout)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    asset_locks: Option<KeyedLocks>,
    lock_timeout: Option<Duration>,
    dedup_window: Option<f64>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Share an asset lock table, e.g. between engines over one database in
    /// the same process.
    pub fn asset_locks(mut self, locks: KeyedLocks) -> EngineBuilder {
        self.asset_locks = Some(locks);
        self
    }

    /// Default time a write waits for its asset locks.
    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Width in percentage points of the alert deduplication window.
    pub fn alert_dedup_window(mut self, window: f64) -> EngineBuilder {
        self.dedup_window = Some(window);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let dedup = match self.dedup_window {
            Some(window) => AlertDeduplicator::new(window)?,
            None => AlertDeduplicator::default(),
        };
        Ok(Engine {
            database: self.database,
            asset_locks: self.asset_locks.unwrap_or_default(),
            budget_locks: KeyedLocks::new(),
            settings: EngineSettings {
                lock_timeout: self.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT),
                dedup,
            },
        })
    }
}
