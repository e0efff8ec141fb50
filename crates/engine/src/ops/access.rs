use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    Asset, Budget, EngineError, ResultEngine, Transaction, assets, budgets, categories,
    transactions, users,
};

use super::Engine;

/// Generates a `require_*` lookup that fails with `$err` when the row is
/// missing or belongs to another user.
macro_rules! impl_require_owned {
    ($fn_name:ident, $entity:path, $user_col:expr, $domain:ty, $err:path, $label:literal) => {
        pub(super) async fn $fn_name(
            &self,
            db: &impl ConnectionTrait,
            id: Uuid,
            user_id: &str,
        ) -> ResultEngine<$domain> {
            let model = <$entity>::find_by_id(id)
                .filter($user_col.eq(user_id.to_string()))
                .one(db)
                .await?
                .ok_or_else(|| $err(format!("{} {id}", $label)))?;
            <$domain>::try_from(model)
        }
    };
}

impl Engine {
    impl_require_owned!(
        require_transaction,
        transactions::Entity,
        transactions::Column::UserId,
        Transaction,
        EngineError::TransactionNotFound,
        "transaction"
    );

    impl_require_owned!(
        require_budget,
        budgets::Entity,
        budgets::Column::UserId,
        Budget,
        EngineError::KeyNotFound,
        "budget"
    );

    pub(super) async fn require_user(
        &self,
        db: &impl ConnectionTrait,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    /// A category owned by `user_id` that is not archived.
    pub(super) async fn require_category(
        &self,
        db: &impl ConnectionTrait,
        category_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<categories::Model> {
        categories::Entity::find_by_id(category_id)
            .filter(categories::Column::UserId.eq(user_id.to_string()))
            .filter(categories::Column::Archived.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::CategoryNotFound(format!("category {category_id}")))
    }

    /// Loads an asset and checks it belongs to `user_id`.
    ///
    /// Unlike transactions, a foreign asset is reported as
    /// `AssetOwnershipMismatch` rather than hidden behind `AssetNotFound`.
    pub(super) async fn require_asset(
        &self,
        db: &impl ConnectionTrait,
        asset_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Asset> {
        let model = assets::Entity::find_by_id(asset_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::AssetNotFound(format!("asset {asset_id}")))?;
        if model.user_id != user_id {
            return Err(EngineError::AssetOwnershipMismatch(format!(
                "asset {asset_id} is not owned by {user_id}"
            )));
        }
        Asset::try_from(model)
    }
}
