//! Budgets: spending ceilings for one category over a period.

use chrono::{DateTime, Months, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, util::model_currency};

pub const DEFAULT_ALERT_THRESHOLD: u8 = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// End of a period starting at `start`. Month arithmetic clamps to the
    /// last day of the target month (Jan 31 + 1 month = Feb 28/29).
    pub fn end_from(self, start: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
        let months = match self {
            Self::Monthly => Months::new(1),
            Self::Yearly => Months::new(12),
        };
        start.checked_add_months(months).ok_or_else(|| {
            EngineError::InvalidPeriod("budget end date out of range".to_string())
        })
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::InvalidPeriod(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

/// Read-side classification of a budget. Never persisted: it is recomputed
/// from `(spent, amount, alert_threshold)` on every read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Safe,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    pub fn classify(percentage: f64, alert_threshold: u8) -> Self {
        if percentage >= 100.0 {
            Self::Exceeded
        } else if percentage >= f64::from(alert_threshold) {
            Self::Warning
        } else {
            Self::Safe
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Exceeded => "exceeded",
        }
    }
}

/// Percentage of `amount_minor` consumed by `spent_minor`.
pub fn spent_percentage(spent_minor: i64, amount_minor: i64) -> f64 {
    if amount_minor <= 0 {
        return 0.0;
    }
    spent_minor as f64 * 100.0 / amount_minor as f64
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Uuid,
    /// When set, only expenses against this asset count toward the budget.
    pub asset_id: Option<Uuid>,
    pub amount_minor: i64,
    /// Only expenses of assets in this currency are counted.
    pub currency: Currency,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Percentage (1..=100) at which the first alert is raised.
    pub alert_threshold: u8,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        user_id: String,
        category_id: Uuid,
        asset_id: Option<Uuid>,
        amount_minor: i64,
        currency: Currency,
        period: BudgetPeriod,
        start_date: DateTime<Utc>,
        alert_threshold: Option<u8>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "budget amount_minor must be > 0".to_string(),
            ));
        }
        let alert_threshold = alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD);
        if !(1..=100).contains(&alert_threshold) {
            return Err(EngineError::InvalidThreshold(format!(
                "alert threshold must be within 1..=100, got {alert_threshold}"
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            category_id,
            asset_id,
            amount_minor,
            currency,
            period,
            start_date,
            end_date: period.end_from(start_date)?,
            is_active: true,
            alert_threshold,
            created_at: Utc::now(),
        })
    }

    pub fn status(&self, spent_minor: i64) -> BudgetStatus {
        BudgetStatus::classify(
            spent_percentage(spent_minor, self.amount_minor),
            self.alert_threshold,
        )
    }
}

/// A budget together with its spend over the budget window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget: Budget,
    pub spent_minor: i64,
    pub percentage: f64,
    pub status: BudgetStatus,
}

impl BudgetSummary {
    pub fn new(budget: Budget, spent_minor: i64) -> Self {
        let percentage = spent_percentage(spent_minor, budget.amount_minor);
        let status = BudgetStatus::classify(percentage, budget.alert_threshold);
        Self {
            budget,
            spent_minor,
            percentage,
            status,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub amount_minor: i64,
    pub currency: String,
    pub period: String,
    pub start_date: DateTimeUtc,
    pub end_date: DateTimeUtc,
    pub is_active: bool,
    pub alert_threshold: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
    #[sea_orm(has_many = "super::budget_alerts::Entity")]
    Alerts,
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl Related<super::budget_alerts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alerts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(value: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id.clone()),
            category_id: ActiveValue::Set(value.category_id),
            asset_id: ActiveValue::Set(value.asset_id),
            amount_minor: ActiveValue::Set(value.amount_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            period: ActiveValue::Set(value.period.as_str().to_string()),
            start_date: ActiveValue::Set(value.start_date),
            end_date: ActiveValue::Set(value.end_date),
            is_active: ActiveValue::Set(value.is_active),
            alert_threshold: ActiveValue::Set(i32::from(value.alert_threshold)),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let alert_threshold = u8::try_from(model.alert_threshold).map_err(|_| {
            EngineError::InvalidThreshold(format!(
                "stored alert threshold out of range: {}",
                model.alert_threshold
            ))
        })?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            category_id: model.category_id,
            asset_id: model.asset_id,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            period: BudgetPeriod::try_from(model.period.as_str())?,
            start_date: model.start_date,
            end_date: model.end_date,
            is_active: model.is_active,
            alert_threshold,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn classification_bands() {
        assert_eq!(BudgetStatus::classify(0.0, 80), BudgetStatus::Safe);
        assert_eq!(BudgetStatus::classify(79.99, 80), BudgetStatus::Safe);
        assert_eq!(BudgetStatus::classify(80.0, 80), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::classify(99.9, 80), BudgetStatus::Warning);
        assert_eq!(BudgetStatus::classify(100.0, 80), BudgetStatus::Exceeded);
        assert_eq!(BudgetStatus::classify(100.0, 100), BudgetStatus::Exceeded);
        assert_eq!(BudgetStatus::classify(99.0, 100), BudgetStatus::Safe);
    }

    #[test]
    fn classification_is_pure() {
        let budget = Budget::new(
            "alice".to_string(),
            Uuid::new_v4(),
            None,
            1000,
            Currency::Eur,
            BudgetPeriod::Monthly,
            Utc::now(),
            None,
        )
        .unwrap();
        let first = budget.status(850);
        for _ in 0..10 {
            assert_eq!(budget.status(850), first);
        }
        assert_eq!(first, BudgetStatus::Warning);
    }

    #[test]
    fn period_end_clamps_month_end() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 10, 0, 0).unwrap();
        let end = BudgetPeriod::Monthly.end_from(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0).unwrap());
        let end = BudgetPeriod::Yearly.end_from(start).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2027, 1, 31, 10, 0, 0).unwrap());
    }

    #[test]
    fn new_validates_amount_and_threshold() {
        let make = |amount, threshold| {
            Budget::new(
                "alice".to_string(),
                Uuid::new_v4(),
                None,
                amount,
                Currency::Eur,
                BudgetPeriod::Yearly,
                Utc::now(),
                threshold,
            )
        };
        assert!(make(0, None).is_err());
        assert!(make(100, Some(0)).is_err());
        assert!(make(100, Some(101)).is_err());
        assert_eq!(make(100, None).unwrap().alert_threshold, 80);
    }

    #[test]
    fn percentage_handles_zero_amount() {
        assert_eq!(spent_percentage(10, 0), 0.0);
        assert_eq!(spent_percentage(820, 1000), 82.0);
    }
}
