use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    Input(String),
}

impl AppError {
    /// Code printed as `error[<code>]`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Database(_) => "database",
            Self::Engine(err) => err.code(),
            Self::Json(_) => "json",
            Self::Input(_) => "invalid_input",
        }
    }

    /// Process exit status: 75 (EX_TEMPFAIL) for retryable failures, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Engine(err) if err.is_retryable() => 75,
            _ => 1,
        }
    }
}
