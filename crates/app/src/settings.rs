//! Handles settings for the application. Configuration is read from an
//! optional `saldo.toml` and `SALDO__*` environment variables, e.g.
//! `SALDO__ENGINE__LOCK_TIMEOUT_MS=2000`.

use std::{path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "saldo";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `database = "memory"` or `[database] sqlite = "./saldo.db"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./saldo.db".to_string())
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub lock_timeout_ms: u64,
    pub alert_dedup_window: f64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            lock_timeout_ms: engine::DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
            alert_dedup_window: engine::DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl EngineSection {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub engine: EngineSection,
}

impl Settings {
    /// Loads `path` when given (it must exist), otherwise `saldo.toml` from the
    /// working directory when present.
    pub fn new(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("SALDO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(raw: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_file_uses_defaults() {
        let settings = from_toml("");
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.database, Database::Sqlite("./saldo.db".to_string()));
        assert_eq!(settings.engine.lock_timeout(), Duration::from_secs(5));
        assert_eq!(settings.engine.alert_dedup_window, 5.0);
    }

    #[test]
    fn sections_override_defaults() {
        let settings = from_toml(
            r#"
            database = "memory"

            [app]
            level = "debug"

            [engine]
            lock_timeout_ms = 250
            alert_dedup_window = 2.5
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.database.url(), "sqlite::memory:");
        assert_eq!(settings.engine.lock_timeout(), Duration::from_millis(250));
        assert_eq!(settings.engine.alert_dedup_window, 2.5);
    }

    #[test]
    fn sqlite_path_builds_url() {
        let settings = from_toml(
            r#"
            [database]
            sqlite = "/tmp/ledger.db"
            "#,
        );
        assert_eq!(settings.database.url(), "sqlite:/tmp/ledger.db?mode=rwc");
    }
}
