use chrono::Utc;
use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetAlert, EngineError, ResultEngine, alert_message, budget_alerts,
    budgets::spent_percentage, categories,
};

use super::{
    Engine,
    budgets::{active_budgets_at, spent_in_window},
    with_tx,
};

impl Engine {
    /// Re-evaluates every active budget of `user_id` and records an alert for
    /// each one at or above its threshold, unless the deduplication policy
    /// suppresses it. Returns the alerts created.
    ///
    /// Each alert is written on its own; a failure midway keeps the alerts
    /// already written.
    pub async fn check_budget_alerts(&self, user_id: &str) -> ResultEngine<Vec<BudgetAlert>> {
        let now = Utc::now();
        let mut created = Vec::new();
        for budget in active_budgets_at(&self.database, user_id, now).await? {
            if let Some(alert) = self.evaluate_budget(&budget).await? {
                created.push(alert);
            }
        }
        Ok(created)
    }

    /// Spend, deduplication and insert run under the budget's lock, so
    /// concurrent evaluations of one budget see each other's alerts.
    async fn evaluate_budget(&self, budget: &Budget) -> ResultEngine<Option<BudgetAlert>> {
        let _guard = self
            .budget_locks
            .acquire(&[budget.id], self.settings.lock_timeout)
            .await?;

        let spent = spent_in_window(&self.database, budget).await?;
        let percentage = spent_percentage(spent, budget.amount_minor);
        if percentage < f64::from(budget.alert_threshold) {
            return Ok(None);
        }

        let unread: Vec<f64> = budget_alerts::Entity::find()
            .select_only()
            .column(budget_alerts::Column::Percentage)
            .filter(budget_alerts::Column::BudgetId.eq(budget.id))
            .filter(budget_alerts::Column::IsRead.eq(false))
            .into_tuple::<f64>()
            .all(&self.database)
            .await?;
        if !self
            .settings
            .dedup
            .should_emit(&unread, percentage, budget.alert_threshold)
        {
            tracing::debug!(
                budget_id = %budget.id,
                percentage,
                "budget alert suppressed by a recent unread alert"
            );
            return Ok(None);
        }

        let category = categories::Entity::find_by_id(budget.category_id)
            .one(&self.database)
            .await?
            .map(|model| model.name)
            .ok_or_else(|| EngineError::CategoryNotFound(budget.category_id.to_string()))?;

        let alert = BudgetAlert::new(
            budget.id,
            budget.user_id.clone(),
            percentage,
            spent,
            alert_message(
                &category,
                percentage,
                spent,
                budget.amount_minor,
                budget.currency,
            ),
        );
        budget_alerts::ActiveModel::from(&alert)
            .insert(&self.database)
            .await?;
        tracing::info!(
            budget_id = %budget.id,
            user_id = %budget.user_id,
            percentage,
            "{}",
            alert.message
        );
        Ok(Some(alert))
    }

    /// Runs the budget evaluation after a committed write. Failures are logged
    /// and swallowed: the write that triggered it already succeeded.
    pub(super) async fn evaluate_budgets_best_effort(&self, user_id: &str) {
        if let Err(err) = self.check_budget_alerts(user_id).await {
            tracing::warn!(
                user_id,
                code = err.code(),
                error = %err,
                "budget evaluation failed"
            );
        }
    }

    /// Alerts of a user, newest first.
    pub async fn list_alerts(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> ResultEngine<Vec<BudgetAlert>> {
        let mut query = budget_alerts::Entity::find()
            .filter(budget_alerts::Column::UserId.eq(user_id.to_string()))
            .order_by_desc(budget_alerts::Column::CreatedAt)
            .order_by_desc(budget_alerts::Column::Id);
        if unread_only {
            query = query.filter(budget_alerts::Column::IsRead.eq(false));
        }
        Ok(query
            .all(&self.database)
            .await?
            .into_iter()
            .map(BudgetAlert::from)
            .collect())
    }

    /// Acknowledge one alert. Marking an already read alert is a no-op.
    pub async fn mark_alert_read(&self, alert_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = budget_alerts::Entity::find_by_id(alert_id)
                .filter(budget_alerts::Column::UserId.eq(user_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("alert {alert_id}")))?;
            if !model.is_read {
                budget_alerts::ActiveModel {
                    id: ActiveValue::Set(alert_id),
                    is_read: ActiveValue::Set(true),
                    ..Default::default()
                }
                .update(&db_tx)
                .await?;
            }
            Ok(())
        })
    }

    /// Acknowledge every unread alert of a user. Returns how many were marked.
    pub async fn mark_all_alerts_read(&self, user_id: &str) -> ResultEngine<u64> {
        let result = budget_alerts::Entity::update_many()
            .col_expr(budget_alerts::Column::IsRead, Expr::value(true))
            .filter(budget_alerts::Column::UserId.eq(user_id.to_string()))
            .filter(budget_alerts::Column::IsRead.eq(false))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}
