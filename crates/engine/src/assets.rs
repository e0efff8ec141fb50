//! The module contains `Asset` struct and its implementation.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, Direction, EngineError, MoneyCents, ResultEngine, util::model_currency};

/// What kind of store of value an asset is. Only used as a display tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Bank,
    #[default]
    Cash,
    Card,
    Savings,
    Investment,
    Other,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Savings => "savings",
            Self::Investment => "investment",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AssetKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bank" => Ok(Self::Bank),
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "savings" => Ok(Self::Savings),
            "investment" => Ok(Self::Investment),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidName(format!(
                "invalid asset kind: {other}"
            ))),
        }
    }
}

/// An asset.
///
/// An asset is a bank account, a wallet or anything else where money is kept.
/// Its `balance` is denormalized: it always equals the signed sum of the
/// transactions referencing it (income adds, expense subtracts), and it is
/// only ever mutated by the transaction write path under the asset lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: AssetKind,
    /// Balance in minor units of `currency`.
    pub balance: i64,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(user_id: String, name: String, kind: AssetKind, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind,
            balance: 0,
            currency,
            created_at: Utc::now(),
        }
    }

    /// Fails with `InsufficientBalance` when an expense of `amount_minor`
    /// would take the balance below zero. Income is always accepted.
    pub fn ensure_covers(&self, direction: Direction, amount_minor: i64) -> ResultEngine<()> {
        if direction == Direction::Expense && self.balance < amount_minor {
            return Err(EngineError::InsufficientBalance(format!(
                "asset '{}' has {} {}, expense needs {}",
                self.name,
                MoneyCents::new(self.balance).format(self.currency),
                self.currency,
                MoneyCents::new(amount_minor).format(self.currency),
            )));
        }
        Ok(())
    }

    /// Applies the effect of a transaction to the balance.
    pub fn apply(&mut self, direction: Direction, amount_minor: i64) -> ResultEngine<()> {
        let effect = MoneyCents::new(direction.signed(amount_minor));
        self.balance = MoneyCents::new(self.balance)
            .checked_add(effect)
            .ok_or_else(balance_overflow)?
            .minor();
        Ok(())
    }

    /// Removes the effect of a transaction from the balance. Never checks for
    /// sufficient funds: undoing history must always be possible.
    pub fn revert(&mut self, direction: Direction, amount_minor: i64) -> ResultEngine<()> {
        let effect = MoneyCents::new(direction.signed(amount_minor));
        self.balance = MoneyCents::new(self.balance)
            .checked_sub(effect)
            .ok_or_else(balance_overflow)?
            .minor();
        Ok(())
    }
}

fn balance_overflow() -> EngineError {
    EngineError::InvalidAmount("balance overflow".to_string())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub balance_minor: i64,
    pub currency: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Asset> for ActiveModel {
    fn from(value: &Asset) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            balance_minor: ActiveValue::Set(value.balance),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Asset {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: AssetKind::try_from(model.kind.as_str())?,
            balance: model.balance_minor,
            currency: model_currency(&model.currency)?,
            created_at: model.created_at,
        })
    }
}
