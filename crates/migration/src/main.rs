use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./saldo.db?mode=rwc";

fn usage() -> ! {
    eprintln!("Usage: migration [up [STEPS]|down [STEPS]|fresh|status]");
    eprintln!("The database is read from DATABASE_URL (default: {DEFAULT_DATABASE_URL}).");
    std::process::exit(2);
}

fn parse_steps(raw: Option<String>) -> Option<u32> {
    match raw {
        None => None,
        Some(value) => match value.parse::<u32>() {
            Ok(steps) => Some(steps),
            Err(_) => usage(),
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let steps = parse_steps(args.next());

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, steps).await?,
        "down" => migration::Migrator::down(&db, steps.or(Some(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        _ => usage(),
    }

    Ok(())
}
