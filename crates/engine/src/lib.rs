//! Ledger engine: asset balances kept in lockstep with their transactions,
//! plus budget evaluation and threshold alerts.

pub use alert_policy::{AlertDeduplicator, DEFAULT_DEDUP_WINDOW, alert_message};
pub use assets::{Asset, AssetKind};
pub use budget_alerts::BudgetAlert;
pub use budgets::{Budget, BudgetPeriod, BudgetStatus, BudgetSummary, DEFAULT_ALERT_THRESHOLD};
pub use categories::Category;
pub use commands::{CreateTransactionCmd, NewBudgetCmd, UpdateTransactionCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use locks::{KeyedLockGuard, KeyedLocks};
pub use money::MoneyCents;
pub use ops::{BalanceCheck, DEFAULT_LOCK_TIMEOUT, Engine, EngineBuilder, EngineSettings, Page};
pub use transactions::{Direction, Transaction};

mod alert_policy;
mod assets;
mod budget_alerts;
mod budgets;
mod categories;
mod commands;
mod currency;
mod error;
mod locks;
mod money;
mod ops;
mod transactions;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
