use chrono::Utc;
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};

use crate::{
    Direction, EngineError, ResultEngine, Transaction, UpdateTransactionCmd, transactions,
    transactions::validate_amount, util::normalize_optional_text,
};

use super::super::{
    super::{Engine, balances::persist_balance, with_tx},
    MAX_LOCK_ATTEMPTS,
};

impl Engine {
    /// Amend a transaction, moving its balance effect accordingly.
    ///
    /// The old effect is reverted before the new one is checked and applied,
    /// so the balance check sees the ledger as if the old version never
    /// existed. When the asset changes, the old asset gets the reversal and
    /// the new asset the new effect; both are locked in ascending id order.
    /// Moving to an asset of another currency fails with `CurrencyMismatch`.
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        if let Some(amount_minor) = cmd.amount_minor {
            validate_amount(amount_minor)?;
        }
        if let Some(category_id) = cmd.category_id {
            self.require_category(&self.database, category_id, &cmd.user_id)
                .await?;
        }
        if let Some(asset_id) = cmd.asset_id {
            self.require_asset(&self.database, asset_id, &cmd.user_id)
                .await?;
        }
        let timeout = self.lock_timeout(cmd.lock_timeout);

        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            let seen = self
                .require_transaction(&self.database, cmd.transaction_id, &cmd.user_id)
                .await?;
            if cmd.is_empty() {
                return Ok(seen);
            }
            let target_asset = cmd.asset_id.unwrap_or(seen.asset_id);

            let guard = self
                .asset_locks
                .acquire(&[seen.asset_id, target_asset], timeout)
                .await?;
            let outcome = with_tx!(self, |db_tx| {
                let current = self
                    .require_transaction(&db_tx, cmd.transaction_id, &cmd.user_id)
                    .await?;
                if current.asset_id != seen.asset_id {
                    Ok(None)
                } else {
                    let updated = self.rewrite_transaction(&db_tx, &current, &cmd).await?;
                    Ok(Some((current, updated)))
                }
            })?;
            drop(guard);

            let Some((old, new)) = outcome else {
                tracing::debug!(
                    transaction_id = %cmd.transaction_id,
                    attempt,
                    "transaction moved to another asset while waiting for the lock"
                );
                continue;
            };
            if old.direction == Direction::Expense || new.direction == Direction::Expense {
                self.evaluate_budgets_best_effort(&new.user_id).await;
            }
            return Ok(new);
        }

        Err(EngineError::Conflict(format!(
            "transaction {} kept changing asset, retry later",
            cmd.transaction_id
        )))
    }

    /// Applies `cmd` on top of `old` inside `db_tx`. Caller holds the locks of
    /// both the old and the new asset.
    async fn rewrite_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        old: &Transaction,
        cmd: &UpdateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        let mut new = old.clone();
        if let Some(amount_minor) = cmd.amount_minor {
            new.amount_minor = amount_minor;
        }
        if let Some(direction) = cmd.direction {
            new.direction = direction;
        }
        if let Some(category_id) = cmd.category_id {
            new.category_id = category_id;
        }
        if let Some(asset_id) = cmd.asset_id {
            new.asset_id = asset_id;
        }
        if let Some(occurred_at) = cmd.occurred_at {
            new.occurred_at = occurred_at;
        }
        if let Some(description) = cmd.description.as_deref() {
            new.description = normalize_optional_text(Some(description));
        }
        new.updated_at = Utc::now();

        if new.asset_id == old.asset_id {
            let mut asset = self.require_asset(db_tx, old.asset_id, &old.user_id).await?;
            asset.revert(old.direction, old.amount_minor)?;
            asset.ensure_covers(new.direction, new.amount_minor)?;
            asset.apply(new.direction, new.amount_minor)?;
            persist_balance(db_tx, &asset).await?;
            tracing::debug!(
                transaction_id = %new.id,
                asset_id = %asset.id,
                balance = asset.balance,
                "transaction updated"
            );
        } else {
            let mut source = self.require_asset(db_tx, old.asset_id, &old.user_id).await?;
            let mut target = self.require_asset(db_tx, new.asset_id, &old.user_id).await?;
            if source.currency != target.currency {
                return Err(EngineError::CurrencyMismatch(format!(
                    "cannot move a transaction from a {} asset to a {} asset",
                    source.currency, target.currency
                )));
            }
            source.revert(old.direction, old.amount_minor)?;
            target.ensure_covers(new.direction, new.amount_minor)?;
            target.apply(new.direction, new.amount_minor)?;
            persist_balance(db_tx, &source).await?;
            persist_balance(db_tx, &target).await?;
            tracing::debug!(
                transaction_id = %new.id,
                from_asset = %source.id,
                from_balance = source.balance,
                to_asset = %target.id,
                to_balance = target.balance,
                "transaction moved between assets"
            );
        }

        transactions::ActiveModel::from(&new).update(db_tx).await?;
        Ok(new)
    }
}
