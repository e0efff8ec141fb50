use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetSummary, Direction, EngineError, NewBudgetCmd, ResultEngine, assets,
    budget_alerts, budgets, transactions,
};

use super::{Engine, with_tx};

/// Sum of the expenses counted by `budget` over its whole window.
///
/// Only expenses booked on assets in the budget's currency count. Reads
/// committed rows without any asset lock.
pub(super) async fn spent_in_window(
    db: &impl ConnectionTrait,
    budget: &Budget,
) -> ResultEngine<i64> {
    let mut query = transactions::Entity::find()
        .select_only()
        .column_as(
            Expr::cust("COALESCE(SUM(transactions.amount_minor), 0)"),
            "spent",
        )
        .inner_join(assets::Entity)
        .filter(assets::Column::Currency.eq(budget.currency.code()))
        .filter(transactions::Column::UserId.eq(budget.user_id.clone()))
        .filter(transactions::Column::CategoryId.eq(budget.category_id))
        .filter(transactions::Column::Direction.eq(Direction::Expense.as_str()))
        .filter(transactions::Column::OccurredAt.gte(budget.start_date))
        .filter(transactions::Column::OccurredAt.lte(budget.end_date));
    if let Some(asset_id) = budget.asset_id {
        query = query.filter(transactions::Column::AssetId.eq(asset_id));
    }
    Ok(query.into_tuple::<i64>().one(db).await?.unwrap_or(0))
}

/// Active budgets of `user_id` whose window contains `at`.
pub(super) async fn active_budgets_at(
    db: &impl ConnectionTrait,
    user_id: &str,
    at: DateTime<Utc>,
) -> ResultEngine<Vec<Budget>> {
    budgets::Entity::find()
        .filter(budgets::Column::UserId.eq(user_id.to_string()))
        .filter(budgets::Column::IsActive.eq(true))
        .filter(budgets::Column::StartDate.lte(at))
        .filter(budgets::Column::EndDate.gte(at))
        .order_by_asc(budgets::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(Budget::try_from)
        .collect()
}

impl Engine {
    /// Create a budget. The end date is derived from the start and the period.
    ///
    /// An asset-scoped budget takes the asset's currency; asking for another
    /// one fails with `CurrencyMismatch`.
    pub async fn new_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        let mut budget = Budget::new(
            cmd.user_id,
            cmd.category_id,
            cmd.asset_id,
            cmd.amount_minor,
            cmd.currency.unwrap_or_default(),
            cmd.period,
            cmd.start_date,
            cmd.alert_threshold,
        )?;
        with_tx!(self, |db_tx| {
            self.require_category(&db_tx, budget.category_id, &budget.user_id)
                .await?;
            if let Some(asset_id) = budget.asset_id {
                let asset = self
                    .require_asset(&db_tx, asset_id, &budget.user_id)
                    .await?;
                if let Some(requested) = cmd.currency
                    && requested != asset.currency
                {
                    return Err(EngineError::CurrencyMismatch(format!(
                        "budget in {requested} over asset '{}' in {}",
                        asset.name, asset.currency
                    )));
                }
                budget.currency = asset.currency;
            }
            budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            Ok(budget)
        })
    }

    /// Budgets of a user with their current spend and status.
    ///
    /// The status is recomputed on every call and never stored.
    pub async fn budgets(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<BudgetSummary>> {
        let mut query = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id.to_string()))
            .order_by_asc(budgets::Column::CreatedAt)
            .order_by_asc(budgets::Column::Id);
        if !include_inactive {
            query = query.filter(budgets::Column::IsActive.eq(true));
        }

        let mut out = Vec::new();
        for model in query.all(&self.database).await? {
            let budget = Budget::try_from(model)?;
            let spent = spent_in_window(&self.database, &budget).await?;
            out.push(BudgetSummary::new(budget, spent));
        }
        Ok(out)
    }

    /// One budget with its current spend and status.
    pub async fn budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<BudgetSummary> {
        let budget = self
            .require_budget(&self.database, budget_id, user_id)
            .await?;
        let spent = spent_in_window(&self.database, &budget).await?;
        Ok(BudgetSummary::new(budget, spent))
    }

    /// Stop evaluating a budget. Its alerts are kept.
    pub async fn deactivate_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_budget(&db_tx, budget_id, user_id).await?;
            budgets::ActiveModel {
                id: ActiveValue::Set(budget_id),
                is_active: ActiveValue::Set(false),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Ok(())
        })
    }

    /// Delete a budget together with its alerts.
    pub async fn delete_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_budget(&db_tx, budget_id, user_id).await?;
            budget_alerts::Entity::delete_many()
                .filter(budget_alerts::Column::BudgetId.eq(budget_id))
                .exec(&db_tx)
                .await?;
            budgets::Entity::delete_by_id(budget_id).exec(&db_tx).await?;
            Ok(())
        })
    }
}
