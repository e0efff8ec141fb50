//! Command structs for engine operations.
//!
//! These types group parameters for the ledger write operations
//! (create/update/delete transaction, new budget), keeping call sites readable
//! and avoiding long argument lists.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{BudgetPeriod, Currency, Direction};

/// Record an income or expense against one asset.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub category_id: Uuid,
    pub asset_id: Uuid,
    pub amount_minor: i64,
    pub direction: Direction,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    /// Overrides the engine's default lock wait for this call.
    pub lock_timeout: Option<Duration>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category_id: Uuid,
        asset_id: Uuid,
        amount_minor: i64,
        direction: Direction,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category_id,
            asset_id,
            amount_minor,
            direction,
            occurred_at,
            description: None,
            lock_timeout: None,
        }
    }

    #[must_use]
    pub fn income(
        user_id: impl Into<String>,
        category_id: Uuid,
        asset_id: Uuid,
        amount_minor: i64,
    ) -> Self {
        Self::new(
            user_id,
            category_id,
            asset_id,
            amount_minor,
            Direction::Income,
            Utc::now(),
        )
    }

    #[must_use]
    pub fn expense(
        user_id: impl Into<String>,
        category_id: Uuid,
        asset_id: Uuid,
        amount_minor: i64,
    ) -> Self {
        Self::new(
            user_id,
            category_id,
            asset_id,
            amount_minor,
            Direction::Expense,
            Utc::now(),
        )
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

/// Partial update of an existing transaction.
///
/// Fields left as `None` keep their stored value. An empty `description`
/// clears it.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub amount_minor: Option<i64>,
    pub direction: Option<Direction>,
    pub category_id: Option<Uuid>,
    pub asset_id: Option<Uuid>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub lock_timeout: Option<Duration>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(transaction_id: Uuid, user_id: impl Into<String>) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            amount_minor: None,
            direction: None,
            category_id: None,
            asset_id: None,
            occurred_at: None,
            description: None,
            lock_timeout: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn asset_id(mut self, asset_id: Uuid) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.amount_minor.is_none()
            && self.direction.is_none()
            && self.category_id.is_none()
            && self.asset_id.is_none()
            && self.occurred_at.is_none()
            && self.description.is_none()
    }
}

/// Create a budget for one category.
#[derive(Clone, Debug)]
pub struct NewBudgetCmd {
    pub user_id: String,
    pub category_id: Uuid,
    /// Restricts the budget to expenses of one asset.
    pub asset_id: Option<Uuid>,
    pub amount_minor: i64,
    /// Defaults to the asset's currency, or the default currency when the
    /// budget spans all assets.
    pub currency: Option<Currency>,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub alert_threshold: Option<u8>,
}

impl NewBudgetCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        category_id: Uuid,
        amount_minor: i64,
        period: BudgetPeriod,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            category_id,
            asset_id: None,
            amount_minor,
            currency: None,
            period,
            start_date: Utc::now(),
            alert_threshold: None,
        }
    }

    #[must_use]
    pub fn asset_id(mut self, asset_id: Uuid) -> Self {
        self.asset_id = Some(asset_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = start_date;
        self
    }

    #[must_use]
    pub fn alert_threshold(mut self, threshold: u8) -> Self {
        self.alert_threshold = Some(threshold);
        self
    }
}
