use std::{process::ExitCode, time::Duration};

use clap::Parser;
use engine::{
    CreateTransactionCmd, Currency, Engine, MoneyCents, NewBudgetCmd, UpdateTransactionCmd,
};
use migration::{Migrator, MigratorTrait};
use serde::Serialize;

use cli::{
    AlertCommand, AssetCommand, BudgetCommand, CategoryCommand, Cli, Command, TxCommand,
    UserCommand,
};
use error::{AppError, Result};
use settings::Settings;

mod cli;
mod error;
mod render;
mod settings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.code());
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "saldo={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;
    let engine = Engine::builder()
        .database(db)
        .lock_timeout(settings.engine.lock_timeout())
        .alert_dedup_window(settings.engine.alert_dedup_window)
        .build()
        .await?;
    tracing::debug!(%url, "engine ready");

    let out = Output { json: cli.json };
    let user = cli.user.trim();
    match cli.command {
        Command::User {
            command: UserCommand::Create { username },
        } => {
            engine.new_user(&username).await?;
            out.message(&format!("created user: {username}"))
        }
        Command::Category { command } => category(&engine, &out, acting(user)?, command).await,
        Command::Asset { command } => asset(&engine, &out, acting(user)?, command).await,
        Command::Tx { command } => tx(&engine, &out, acting(user)?, command).await,
        Command::Budget { command } => budget(&engine, &out, acting(user)?, command).await,
        Command::Alert { command } => alert(&engine, &out, acting(user)?, command).await,
    }
}

async fn connect_db(database_url: &str) -> Result<sea_orm::DatabaseConnection> {
    let db = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

fn acting(user: &str) -> Result<&str> {
    if user.is_empty() {
        return Err(AppError::Input(
            "--user (or SALDO_USER) is required".to_string(),
        ));
    }
    Ok(user)
}

fn lock_timeout(ms: Option<u64>) -> Option<Duration> {
    ms.map(Duration::from_millis)
}

struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text(value));
        }
        Ok(())
    }

    fn list<T: Serialize>(&self, values: &[T], line: impl Fn(&T) -> String) -> Result<()> {
        self.emit(&values, |values| {
            if values.is_empty() {
                return "(none)".to_string();
            }
            values.iter().map(&line).collect::<Vec<_>>().join("\n")
        })
    }

    fn message(&self, text: &str) -> Result<()> {
        self.emit(&serde_json::json!({ "message": text }), |_| text.to_string())
    }
}

async fn category(
    engine: &Engine,
    out: &Output,
    user: &str,
    command: CategoryCommand,
) -> Result<()> {
    match command {
        CategoryCommand::Create { name } => {
            let category = engine.new_category(user, &name).await?;
            out.emit(&category, render::category)
        }
        CategoryCommand::List => out.list(&engine.categories(user).await?, render::category),
    }
}

async fn asset(engine: &Engine, out: &Output, user: &str, command: AssetCommand) -> Result<()> {
    match command {
        AssetCommand::Create(args) => {
            let asset = engine
                .new_asset(user, &args.name, args.kind.into(), args.currency)
                .await?;
            out.emit(&asset, render::asset)
        }
        AssetCommand::List => out.list(&engine.assets(user).await?, render::asset),
        AssetCommand::Show { id } => out.emit(&engine.asset(id, user).await?, render::asset),
        AssetCommand::Delete { id } => {
            engine.delete_asset(id, user).await?;
            out.message(&format!("deleted asset {id}"))
        }
        AssetCommand::Verify { id } => out.emit(
            &engine.verify_asset_balance(id, user).await?,
            render::balance_check,
        ),
        AssetCommand::Recompute { id } => {
            let before = engine.recompute_asset_balance(id, user).await?;
            out.emit(&before, |check| {
                format!("{} (before recompute)", render::balance_check(check))
            })
        }
    }
}

async fn tx(engine: &Engine, out: &Output, user: &str, command: TxCommand) -> Result<()> {
    match command {
        TxCommand::Create(args) => {
            let currency = engine.asset(args.asset, user).await?.currency;
            let amount = MoneyCents::parse(&args.amount, currency)?;
            let mut cmd = CreateTransactionCmd::new(
                user,
                args.category,
                args.asset,
                amount.minor(),
                args.direction.into(),
                args.at.unwrap_or_else(chrono::Utc::now),
            );
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if let Some(timeout) = lock_timeout(args.lock_timeout_ms) {
                cmd = cmd.lock_timeout(timeout);
            }
            let created = engine.create_transaction(cmd).await?;
            out.emit(&created, |tx| render::transaction(tx, currency))
        }
        TxCommand::Update(args) => {
            let existing = engine.transaction(args.id, user).await?;
            let currency = engine
                .asset(args.asset.unwrap_or(existing.asset_id), user)
                .await?
                .currency;

            let mut cmd = UpdateTransactionCmd::new(args.id, user);
            if let Some(amount) = args.amount.as_deref() {
                cmd = cmd.amount_minor(MoneyCents::parse(amount, currency)?.minor());
            }
            if let Some(direction) = args.direction {
                cmd = cmd.direction(direction.into());
            }
            if let Some(category) = args.category {
                cmd = cmd.category_id(category);
            }
            if let Some(asset) = args.asset {
                cmd = cmd.asset_id(asset);
            }
            if let Some(at) = args.at {
                cmd = cmd.occurred_at(at);
            }
            if let Some(description) = args.description {
                cmd = cmd.description(description);
            }
            if let Some(timeout) = lock_timeout(args.lock_timeout_ms) {
                cmd = cmd.lock_timeout(timeout);
            }
            let updated = engine.update_transaction(cmd).await?;
            out.emit(&updated, |tx| render::transaction(tx, currency))
        }
        TxCommand::Delete {
            id,
            lock_timeout_ms,
        } => {
            engine
                .delete_transaction_with_timeout(id, user, lock_timeout(lock_timeout_ms))
                .await?;
            out.message(&format!("deleted transaction {id}"))
        }
        TxCommand::Show { id } => {
            let found = engine.transaction(id, user).await?;
            let currency = engine.asset(found.asset_id, user).await?.currency;
            out.emit(&found, |tx| render::transaction(tx, currency))
        }
        TxCommand::List {
            asset,
            page,
            page_size,
        } => {
            let currency = engine.asset(asset, user).await?.currency;
            let page = engine
                .list_transactions_by_asset(asset, user, page, page_size)
                .await?;
            out.emit(&page, |page| render::transactions(page, currency))
        }
    }
}

async fn budget(
    engine: &Engine,
    out: &Output,
    user: &str,
    command: BudgetCommand,
) -> Result<()> {
    match command {
        BudgetCommand::Create(args) => {
            let currency = match (args.asset, args.currency) {
                (_, Some(currency)) => currency,
                (Some(asset), None) => engine.asset(asset, user).await?.currency,
                (None, None) => Currency::default(),
            };
            let amount = MoneyCents::parse(&args.amount, currency)?;
            let mut cmd =
                NewBudgetCmd::new(user, args.category, amount.minor(), args.period.into())
                    .currency(currency);
            if let Some(asset) = args.asset {
                cmd = cmd.asset_id(asset);
            }
            if let Some(start) = args.start {
                cmd = cmd.start_date(start);
            }
            if let Some(threshold) = args.threshold {
                cmd = cmd.alert_threshold(threshold);
            }
            let created = engine.new_budget(cmd).await?;
            out.emit(&created, render::budget)
        }
        BudgetCommand::List { all } => {
            out.list(&engine.budgets(user, all).await?, render::budget_summary)
        }
        BudgetCommand::Show { id } => {
            out.emit(&engine.budget(id, user).await?, render::budget_summary)
        }
        BudgetCommand::Deactivate { id } => {
            engine.deactivate_budget(id, user).await?;
            out.message(&format!("deactivated budget {id}"))
        }
        BudgetCommand::Delete { id } => {
            engine.delete_budget(id, user).await?;
            out.message(&format!("deleted budget {id}"))
        }
    }
}

async fn alert(engine: &Engine, out: &Output, user: &str, command: AlertCommand) -> Result<()> {
    match command {
        AlertCommand::List { unread } => {
            out.list(&engine.list_alerts(user, unread).await?, render::alert)
        }
        AlertCommand::Read { id } => {
            engine.mark_alert_read(id, user).await?;
            out.message(&format!("alert {id} marked as read"))
        }
        AlertCommand::ReadAll => {
            let marked = engine.mark_all_alerts_read(user).await?;
            out.message(&format!("{marked} alert(s) marked as read"))
        }
        AlertCommand::Check => {
            out.list(&engine.check_budget_alerts(user).await?, render::alert)
        }
    }
}
