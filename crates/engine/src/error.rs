//! The module contains the error the engine can throw.
//!
//! Errors fall into five groups:
//!
//! - validation: [`InvalidAmount`], [`InvalidName`], [`InvalidPeriod`],
//!   [`InvalidThreshold`], [`InvalidPage`], [`InvalidCurrency`],
//!   [`CategoryNotFound`]. Raised before any asset lock is taken.
//! - ownership: [`AssetNotFound`], [`AssetOwnershipMismatch`],
//!   [`TransactionNotFound`]. Raised after lookup, nothing is mutated.
//! - business rules: [`InsufficientBalance`], [`AssetInUse`], [`ExistingKey`],
//!   [`CurrencyMismatch`] (amounts of different currencies never mix).
//! - concurrency: [`LockTimeout`], [`Conflict`]. Transient, the caller may
//!   retry.
//! - infrastructure: [`Database`]. The surrounding database transaction is
//!   rolled back so the ledger never ends up half written.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidName`]: EngineError::InvalidName
//!  [`InvalidPeriod`]: EngineError::InvalidPeriod
//!  [`InvalidThreshold`]: EngineError::InvalidThreshold
//!  [`InvalidPage`]: EngineError::InvalidPage
//!  [`InvalidCurrency`]: EngineError::InvalidCurrency
//!  [`CategoryNotFound`]: EngineError::CategoryNotFound
//!  [`AssetNotFound`]: EngineError::AssetNotFound
//!  [`AssetOwnershipMismatch`]: EngineError::AssetOwnershipMismatch
//!  [`TransactionNotFound`]: EngineError::TransactionNotFound
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`AssetInUse`]: EngineError::AssetInUse
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`CurrencyMismatch`]: EngineError::CurrencyMismatch
//!  [`LockTimeout`]: EngineError::LockTimeout
//!  [`Conflict`]: EngineError::Conflict
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid alert threshold: {0}")]
    InvalidThreshold(String),
    #[error("Invalid page: {0}")]
    InvalidPage(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Asset not found: {0}")]
    AssetNotFound(String),
    #[error("Asset not owned by user: {0}")]
    AssetOwnershipMismatch(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Asset in use: {0}")]
    AssetInUse(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Timed out waiting for asset lock: {0}")]
    LockTimeout(String),
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable machine readable code, used by callers to render a specific
    /// message per failure (e.g. "insufficient balance" vs "not your asset").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidName(_) => "invalid_name",
            Self::InvalidPeriod(_) => "invalid_period",
            Self::InvalidThreshold(_) => "invalid_threshold",
            Self::InvalidPage(_) => "invalid_page",
            Self::InvalidCurrency(_) => "invalid_currency",
            Self::CategoryNotFound(_) => "category_not_found",
            Self::AssetNotFound(_) => "asset_not_found",
            Self::AssetOwnershipMismatch(_) => "asset_ownership_mismatch",
            Self::TransactionNotFound(_) => "transaction_not_found",
            Self::InsufficientBalance(_) => "insufficient_balance",
            Self::AssetInUse(_) => "asset_in_use",
            Self::KeyNotFound(_) => "not_found",
            Self::ExistingKey(_) => "already_exists",
            Self::CurrencyMismatch(_) => "currency_mismatch",
            Self::LockTimeout(_) => "lock_timeout",
            Self::Conflict(_) => "conflict",
            Self::Database(_) => "database",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout(_) | Self::Conflict(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (Self::Database(_), _) | (_, Self::Database(_)) => false,
            (a, b) => a.code() == b.code() && a.to_string() == b.to_string(),
        }
    }
}
