use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{AssetKind, BudgetPeriod, Currency, Direction};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "saldo")]
#[command(about = "Personal ledger: assets, transactions, budgets and alerts")]
pub struct Cli {
    /// Optional config file path (TOML). Defaults to `./saldo.toml` if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database connection string, overrides the configured database.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Acting user.
    #[arg(long, short, env = "SALDO_USER", global = true, default_value = "")]
    pub user: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage users.
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Manage categories.
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Manage assets and their balances.
    Asset {
        #[command(subcommand)]
        command: AssetCommand,
    },
    /// Record and amend transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommand,
    },
    /// Manage budgets.
    Budget {
        #[command(subcommand)]
        command: BudgetCommand,
    },
    /// Read and acknowledge budget alerts.
    Alert {
        #[command(subcommand)]
        command: AlertCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    Create { username: String },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Create { name: String },
    List,
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    Create(AssetCreateArgs),
    List,
    Show { id: Uuid },
    Delete { id: Uuid },
    /// Compare the stored balance with the transaction history.
    Verify { id: Uuid },
    /// Rewrite the stored balance from the transaction history.
    Recompute { id: Uuid },
}

#[derive(Args, Debug)]
pub struct AssetCreateArgs {
    pub name: String,
    #[arg(long, value_enum, default_value_t = KindArg::Cash)]
    pub kind: KindArg,
    #[arg(long, default_value = "EUR", value_parser = parse_currency)]
    pub currency: Currency,
}

#[derive(Subcommand, Debug)]
pub enum TxCommand {
    Create(TxCreateArgs),
    Update(TxUpdateArgs),
    Delete {
        id: Uuid,
        #[arg(long)]
        lock_timeout_ms: Option<u64>,
    },
    Show {
        id: Uuid,
    },
    /// List the transactions of an asset, newest first.
    List {
        asset: Uuid,
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 20)]
        page_size: u64,
    },
}

#[derive(Args, Debug)]
pub struct TxCreateArgs {
    #[arg(long)]
    pub asset: Uuid,
    #[arg(long)]
    pub category: Uuid,
    #[arg(value_enum)]
    pub direction: DirectionArg,
    /// Amount in major units, e.g. `12.50`.
    pub amount: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`. Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct TxUpdateArgs {
    pub id: Uuid,
    #[arg(long)]
    pub amount: Option<String>,
    #[arg(long, value_enum)]
    pub direction: Option<DirectionArg>,
    #[arg(long)]
    pub category: Option<Uuid>,
    #[arg(long)]
    pub asset: Option<Uuid>,
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
    /// Empty string clears the description.
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum BudgetCommand {
    Create(BudgetCreateArgs),
    List {
        #[arg(long)]
        all: bool,
    },
    Show {
        id: Uuid,
    },
    Deactivate {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct BudgetCreateArgs {
    #[arg(long)]
    pub category: Uuid,
    /// Only count expenses of this asset.
    #[arg(long)]
    pub asset: Option<Uuid>,
    /// Amount in major units of `--currency`.
    pub amount: String,
    #[arg(long, value_enum, default_value_t = PeriodArg::Monthly)]
    pub period: PeriodArg,
    #[arg(long, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub threshold: Option<u8>,
    /// Defaults to the asset's currency, or EUR for budgets over all assets.
    #[arg(long, value_parser = parse_currency)]
    pub currency: Option<Currency>,
}

#[derive(Subcommand, Debug)]
pub enum AlertCommand {
    List {
        #[arg(long)]
        unread: bool,
    },
    Read {
        id: Uuid,
    },
    ReadAll,
    /// Evaluate budgets now and print the alerts created.
    Check,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DirectionArg {
    Income,
    Expense,
}

impl From<DirectionArg> for Direction {
    fn from(value: DirectionArg) -> Self {
        match value {
            DirectionArg::Income => Direction::Income,
            DirectionArg::Expense => Direction::Expense,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PeriodArg {
    Monthly,
    Yearly,
}

impl From<PeriodArg> for BudgetPeriod {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Monthly => BudgetPeriod::Monthly,
            PeriodArg::Yearly => BudgetPeriod::Yearly,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum KindArg {
    Bank,
    Cash,
    Card,
    Savings,
    Investment,
    Other,
}

impl From<KindArg> for AssetKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Bank => AssetKind::Bank,
            KindArg::Cash => AssetKind::Cash,
            KindArg::Card => AssetKind::Card,
            KindArg::Savings => AssetKind::Savings,
            KindArg::Investment => AssetKind::Investment,
            KindArg::Other => AssetKind::Other,
        }
    }
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{raw}', expected RFC 3339 or YYYY-MM-DD"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        assert_eq!(
            parse_timestamp("2026-03-01").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_timestamp("2026-03-01T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn parses_transaction_create() {
        let asset = Uuid::new_v4();
        let category = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "saldo",
            "--user",
            "alice",
            "tx",
            "create",
            "--asset",
            &asset.to_string(),
            "--category",
            &category.to_string(),
            "expense",
            "12,50",
        ])
        .unwrap();
        let Command::Tx {
            command: TxCommand::Create(args),
        } = cli.command
        else {
            panic!("expected tx create");
        };
        assert_eq!(cli.user, "alice");
        assert_eq!(args.asset, asset);
        assert_eq!(args.amount, "12,50");
        assert!(matches!(args.direction, DirectionArg::Expense));
    }
}
