//! Alerts raised when a budget crosses its threshold.
//!
//! Rows are immutable apart from `is_read`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub user_id: String,
    /// Spent percentage of the budget when the alert fired.
    pub percentage: f64,
    pub spent_minor: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl BudgetAlert {
    pub fn new(
        budget_id: Uuid,
        user_id: String,
        percentage: f64,
        spent_minor: i64,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            budget_id,
            user_id,
            percentage,
            spent_minor,
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub budget_id: Uuid,
    pub user_id: String,
    pub percentage: f64,
    pub spent_minor: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Budgets,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BudgetAlert> for ActiveModel {
    fn from(value: &BudgetAlert) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            budget_id: ActiveValue::Set(value.budget_id),
            user_id: ActiveValue::Set(value.user_id.clone()),
            percentage: ActiveValue::Set(value.percentage),
            spent_minor: ActiveValue::Set(value.spent_minor),
            message: ActiveValue::Set(value.message.clone()),
            is_read: ActiveValue::Set(value.is_read),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for BudgetAlert {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            budget_id: model.budget_id,
            user_id: model.user_id,
            percentage: model.percentage,
            spent_minor: model.spent_minor,
            message: model.message,
            is_read: model.is_read,
            created_at: model.created_at,
        }
    }
}
