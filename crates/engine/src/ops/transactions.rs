//! Transaction ledger: reads live in `list`, balance-mutating writes in `write`.

use uuid::Uuid;

use crate::{ResultEngine, Transaction};

use super::Engine;

mod list;
mod write;

pub use list::Page;

/// Retries of the optimistic read when a transaction moves to another asset
/// while the write waits for the lock.
const MAX_LOCK_ATTEMPTS: usize = 3;

impl Engine {
    /// Return a single transaction owned by `user_id`.
    pub async fn transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Transaction> {
        self.require_transaction(&self.database, transaction_id, user_id)
            .await
    }
}
