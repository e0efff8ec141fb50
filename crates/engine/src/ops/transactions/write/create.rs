use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    CreateTransactionCmd, Direction, ResultEngine, Transaction, transactions,
    util::normalize_optional_text,
};

use super::super::super::{Engine, balances::persist_balance, with_tx};

impl Engine {
    /// Record an income or expense and apply it to the asset balance.
    ///
    /// The asset row update and the transaction insert commit together; an
    /// expense larger than the balance fails with `InsufficientBalance` and
    /// changes nothing.
    pub async fn create_transaction(&self, cmd: CreateTransactionCmd) -> ResultEngine<Transaction> {
        let transaction = Transaction::new(
            cmd.user_id,
            cmd.category_id,
            cmd.asset_id,
            cmd.amount_minor,
            cmd.direction,
            cmd.occurred_at,
            normalize_optional_text(cmd.description.as_deref()),
        )?;
        let user_id = transaction.user_id.clone();
        self.require_category(&self.database, transaction.category_id, &user_id)
            .await?;
        self.require_asset(&self.database, transaction.asset_id, &user_id)
            .await?;

        let guard = self
            .asset_locks
            .acquire(&[transaction.asset_id], self.lock_timeout(cmd.lock_timeout))
            .await?;
        let transaction = with_tx!(self, |db_tx| {
            let mut asset = self
                .require_asset(&db_tx, transaction.asset_id, &user_id)
                .await?;
            asset.ensure_covers(transaction.direction, transaction.amount_minor)?;
            asset.apply(transaction.direction, transaction.amount_minor)?;
            persist_balance(&db_tx, &asset).await?;
            transactions::ActiveModel::from(&transaction)
                .insert(&db_tx)
                .await?;
            tracing::debug!(
                transaction_id = %transaction.id,
                asset_id = %asset.id,
                balance = asset.balance,
                "transaction created"
            );
            Ok(transaction)
        })?;
        drop(guard);

        if transaction.direction == Direction::Expense {
            self.evaluate_budgets_best_effort(&user_id).await;
        }
        Ok(transaction)
    }
}
