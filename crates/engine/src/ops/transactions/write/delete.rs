use std::time::Duration;

use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{Direction, EngineError, ResultEngine, transactions};

use super::super::{
    super::{Engine, balances::persist_balance, with_tx},
    MAX_LOCK_ATTEMPTS,
};

impl Engine {
    /// Delete a transaction and remove its effect from the asset balance.
    ///
    /// Removing history is never refused for lack of funds: deleting an income
    /// may leave the asset with a negative balance.
    pub async fn delete_transaction(
        &self,
        transaction_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.delete_transaction_with_timeout(transaction_id, user_id, None)
            .await
    }

    /// Same as [`Engine::delete_transaction`] with an explicit lock wait.
    pub async fn delete_transaction_with_timeout(
        &self,
        transaction_id: Uuid,
        user_id: &str,
        lock_timeout: Option<Duration>,
    ) -> ResultEngine<()> {
        let timeout = self.lock_timeout(lock_timeout);

        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let seen = self
                .require_transaction(&self.database, transaction_id, user_id)
                .await?;

            let guard = self.asset_locks.acquire(&[seen.asset_id], timeout).await?;
            let deleted = with_tx!(self, |db_tx| {
                let current = self
                    .require_transaction(&db_tx, transaction_id, user_id)
                    .await?;
                if current.asset_id != seen.asset_id {
                    Ok(None)
                } else {
                    let mut asset = self
                        .require_asset(&db_tx, current.asset_id, user_id)
                        .await?;
                    asset.revert(current.direction, current.amount_minor)?;
                    persist_balance(&db_tx, &asset).await?;
                    transactions::Entity::delete_by_id(current.id)
                        .exec(&db_tx)
                        .await?;
                    tracing::debug!(
                        %transaction_id,
                        asset_id = %asset.id,
                        balance = asset.balance,
                        "transaction deleted"
                    );
                    Ok(Some(current))
                }
            })?;
            drop(guard);

            let Some(deleted) = deleted else {
                tracing::debug!(
                    %transaction_id,
                    attempt,
                    "transaction moved to another asset while waiting for the lock"
                );
                continue;
            };
            if deleted.direction == Direction::Expense {
                self.evaluate_budgets_best_effort(user_id).await;
            }
            return Ok(());
        }

        Err(EngineError::Conflict(format!(
            "transaction {transaction_id} kept changing asset, retry later"
        )))
    }
}
