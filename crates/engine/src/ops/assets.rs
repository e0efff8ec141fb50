use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Asset, AssetKind, Currency, EngineError, ResultEngine, assets, budgets, transactions,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Open a new asset with a zero balance.
    pub async fn new_asset(
        &self,
        user_id: &str,
        name: &str,
        kind: AssetKind,
        currency: Currency,
    ) -> ResultEngine<Asset> {
        let name = normalize_required_name(name, "asset")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let exists = assets::Entity::find()
                .filter(assets::Column::UserId.eq(user_id.to_string()))
                .filter(assets::Column::Name.eq(name.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let asset = Asset::new(user_id.to_string(), name.clone(), kind, currency);
            assets::ActiveModel::from(&asset).insert(&db_tx).await?;
            Ok(asset)
        })
    }

    /// Return an asset snapshot from DB.
    pub async fn asset(&self, asset_id: Uuid, user_id: &str) -> ResultEngine<Asset> {
        self.require_asset(&self.database, asset_id, user_id).await
    }

    pub async fn assets(&self, user_id: &str) -> ResultEngine<Vec<Asset>> {
        assets::Entity::find()
            .filter(assets::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(assets::Column::CreatedAt)
            .order_by_asc(assets::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Asset::try_from)
            .collect()
    }

    /// Delete an asset that no transaction or budget references.
    ///
    /// Runs under the asset lock so a concurrent create cannot slip a
    /// transaction in between the reference check and the delete.
    pub async fn delete_asset(&self, asset_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let _guard = self
            .asset_locks
            .acquire(&[asset_id], self.lock_timeout(None))
            .await?;
        with_tx!(self, |db_tx| {
            let asset = self.require_asset(&db_tx, asset_id, user_id).await?;

            let tx_refs = transactions::Entity::find()
                .filter(transactions::Column::AssetId.eq(asset_id))
                .count(&db_tx)
                .await?;
            if tx_refs > 0 {
                return Err(EngineError::AssetInUse(format!(
                    "asset '{}' has {tx_refs} transaction(s)",
                    asset.name
                )));
            }
            let budget_refs = budgets::Entity::find()
                .filter(budgets::Column::AssetId.eq(asset_id))
                .count(&db_tx)
                .await?;
            if budget_refs > 0 {
                return Err(EngineError::AssetInUse(format!(
                    "asset '{}' is referenced by {budget_refs} budget(s)",
                    asset.name
                )));
            }

            assets::Entity::delete_by_id(asset_id).exec(&db_tx).await?;
            tracing::debug!(%asset_id, user_id, "asset deleted");
            Ok(())
        })
    }
}
