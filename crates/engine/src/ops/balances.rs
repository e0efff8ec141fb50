use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Asset, ResultEngine, assets, transactions};

use super::{Engine, with_tx};

/// Stored balance of an asset next to the balance its ledger implies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceCheck {
    pub asset_id: Uuid,
    pub stored_minor: i64,
    pub ledger_minor: i64,
}

impl BalanceCheck {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.stored_minor == self.ledger_minor
    }

    #[must_use]
    pub fn drift_minor(&self) -> i64 {
        self.stored_minor - self.ledger_minor
    }
}

const SIGNED_SUM: &str =
    "COALESCE(SUM(CASE WHEN direction = 'income' THEN amount_minor ELSE -amount_minor END), 0)";

/// Signed sum of every transaction of an asset (income adds, expense subtracts).
pub(super) async fn ledger_sum(db: &impl ConnectionTrait, asset_id: Uuid) -> ResultEngine<i64> {
    let total = transactions::Entity::find()
        .select_only()
        .column_as(
            Expr::cust(SIGNED_SUM),
            "total",
        )
        .filter(transactions::Column::AssetId.eq(asset_id))
        .into_tuple::<i64>()
        .one(db)
        .await?;
    Ok(total.unwrap_or(0))
}

/// Writes the in-memory balance of `asset` back to its row.
pub(super) async fn persist_balance(db: &impl ConnectionTrait, asset: &Asset) -> ResultEngine<()> {
    assets::ActiveModel {
        id: ActiveValue::Set(asset.id),
        balance_minor: ActiveValue::Set(asset.balance),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

impl Engine {
    /// Balance implied by the asset's transaction history.
    pub async fn ledger_balance(&self, asset_id: Uuid, user_id: &str) -> ResultEngine<i64> {
        self.require_asset(&self.database, asset_id, user_id).await?;
        ledger_sum(&self.database, asset_id).await
    }

    /// Compares the stored balance with the ledger, without taking the lock.
    pub async fn verify_asset_balance(
        &self,
        asset_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<BalanceCheck> {
        with_tx!(self, |db_tx| {
            let asset = self.require_asset(&db_tx, asset_id, user_id).await?;
            let ledger_minor = ledger_sum(&db_tx, asset_id).await?;
            Ok(BalanceCheck {
                asset_id,
                stored_minor: asset.balance,
                ledger_minor,
            })
        })
    }

    /// Rewrites the stored balance from the ledger.
    ///
    /// Repairs drift left by out-of-band edits of the database. Returns the
    /// state observed before the repair.
    pub async fn recompute_asset_balance(
        &self,
        asset_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<BalanceCheck> {
        let _guard = self
            .asset_locks
            .acquire(&[asset_id], self.lock_timeout(None))
            .await?;
        with_tx!(self, |db_tx| {
            let mut asset = self.require_asset(&db_tx, asset_id, user_id).await?;
            let ledger_minor = ledger_sum(&db_tx, asset_id).await?;
            let check = BalanceCheck {
                asset_id,
                stored_minor: asset.balance,
                ledger_minor,
            };
            if !check.is_consistent() {
                tracing::warn!(
                    %asset_id,
                    stored = check.stored_minor,
                    ledger = check.ledger_minor,
                    "asset balance drifted from ledger, rewriting"
                );
                asset.balance = ledger_minor;
                persist_balance(&db_tx, &asset).await?;
            }
            Ok(check)
        })
    }
}
