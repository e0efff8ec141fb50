use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AssetKind, BudgetPeriod, BudgetStatus, CreateTransactionCmd, Currency, Direction, Engine,
    NewBudgetCmd, UpdateTransactionCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

struct Fixture {
    engine: Engine,
    db: DatabaseConnection,
    groceries: Uuid,
    checking: Uuid,
}

async fn fixture_with_window(window: Option<f64>) -> Fixture {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let mut builder = Engine::builder().database(db.clone());
    if let Some(window) = window {
        builder = builder.alert_dedup_window(window);
    }
    let engine = builder.build().await.unwrap();

    engine.new_user("alice").await.unwrap();
    let groceries = engine.new_category("alice", "Groceries").await.unwrap().id;
    let checking = engine
        .new_asset("alice", "Checking", AssetKind::Bank, Currency::Eur)
        .await
        .unwrap()
        .id;
    engine
        .create_transaction(CreateTransactionCmd::income(
            "alice", groceries, checking, 10_000_00,
        ))
        .await
        .unwrap();

    Fixture {
        engine,
        db,
        groceries,
        checking,
    }
}

async fn fixture() -> Fixture {
    fixture_with_window(None).await
}

impl Fixture {
    /// Monthly budget of 1000.00 that started yesterday.
    async fn budget(&self) -> Uuid {
        self.engine
            .new_budget(
                NewBudgetCmd::new("alice", self.groceries, 1000_00, BudgetPeriod::Monthly)
                    .start_date(Utc::now() - Duration::days(1)),
            )
            .await
            .unwrap()
            .id
    }

    async fn spend(&self, amount: i64) -> Uuid {
        self.engine
            .create_transaction(CreateTransactionCmd::expense(
                "alice",
                self.groceries,
                self.checking,
                amount,
            ))
            .await
            .unwrap()
            .id
    }

    async fn alerts(&self) -> Vec<engine::BudgetAlert> {
        self.engine.list_alerts("alice", false).await.unwrap()
    }
}

#[tokio::test]
async fn alert_is_raised_at_threshold_and_deduplicated() {
    let fx = fixture().await;
    let budget = fx.budget().await;

    fx.spend(500_00).await;
    assert!(fx.alerts().await.is_empty());

    fx.spend(320_00).await;
    let alerts = fx.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].budget_id, budget);
    assert_eq!(alerts[0].percentage, 82.0);
    assert_eq!(alerts[0].spent_minor, 820_00);
    assert_eq!(
        alerts[0].message,
        "Budget for 'Groceries' has reached 82.0% (820.00 of 1000.00 EUR)"
    );

    // 85% is within the window of the unread 82% alert.
    fx.spend(30_00).await;
    assert_eq!(fx.alerts().await.len(), 1);

    // Crossing into exceeded is always reported.
    fx.spend(160_00).await;
    let alerts = fx.alerts().await;
    assert_eq!(alerts.len(), 2);
    assert!(
        alerts
            .iter()
            .any(|a| a.percentage == 101.0 && a.message.contains("has exceeded 101.0%"))
    );
}

#[tokio::test]
async fn read_alerts_do_not_suppress_new_ones() {
    let fx = fixture().await;
    fx.budget().await;

    fx.spend(820_00).await;
    let first = fx.alerts().await.remove(0);
    fx.engine.mark_alert_read(first.id, "alice").await.unwrap();
    assert!(
        fx.engine
            .list_alerts("alice", true)
            .await
            .unwrap()
            .is_empty()
    );

    fx.spend(30_00).await;
    let unread = fx.engine.list_alerts("alice", true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].percentage, 85.0);
    assert_eq!(fx.alerts().await.len(), 2);
}

#[tokio::test]
async fn zero_window_emits_on_every_change() {
    let fx = fixture_with_window(Some(0.0)).await;
    assert_eq!(fx.engine.settings().dedup.window(), 0.0);
    fx.budget().await;

    fx.spend(820_00).await;
    fx.spend(30_00).await;
    assert_eq!(fx.alerts().await.len(), 2);

    // A recomputation at the same level is still a duplicate.
    let created = fx.engine.check_budget_alerts("alice").await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn invalid_dedup_window_is_rejected_by_builder() {
    let err = Engine::builder()
        .alert_dedup_window(-1.0)
        .build()
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_threshold");
}

#[tokio::test]
async fn mark_all_alerts_read_only_touches_unread() {
    let fx = fixture_with_window(Some(0.0)).await;
    fx.budget().await;
    fx.spend(820_00).await;
    fx.spend(50_00).await;
    fx.spend(50_00).await;
    assert_eq!(fx.alerts().await.len(), 3);

    assert_eq!(fx.engine.mark_all_alerts_read("alice").await.unwrap(), 3);
    assert_eq!(fx.engine.mark_all_alerts_read("alice").await.unwrap(), 0);
    assert!(fx.alerts().await.iter().all(|a| a.is_read));
}

#[tokio::test]
async fn alerts_are_private_to_their_user() {
    let fx = fixture().await;
    fx.engine.new_user("bob").await.unwrap();
    fx.budget().await;
    fx.spend(900_00).await;
    let alert = fx.alerts().await.remove(0);

    assert!(fx.engine.list_alerts("bob", false).await.unwrap().is_empty());
    let err = fx
        .engine
        .mark_alert_read(alert.id, "bob")
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
    assert_eq!(fx.engine.mark_all_alerts_read("bob").await.unwrap(), 0);
    assert!(!fx.alerts().await[0].is_read);
}

#[tokio::test]
async fn status_is_recomputed_on_read() {
    let fx = fixture().await;
    let budget = fx.budget().await;

    let summary = fx.engine.budget(budget, "alice").await.unwrap();
    assert_eq!(summary.status, BudgetStatus::Safe);
    assert_eq!(summary.spent_minor, 0);

    fx.spend(850_00).await;
    let first = fx.engine.budget(budget, "alice").await.unwrap();
    let second = fx.engine.budget(budget, "alice").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.status, BudgetStatus::Warning);
    assert_eq!(first.percentage, 85.0);

    fx.spend(150_00).await;
    let listed = fx.engine.budgets("alice", false).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, BudgetStatus::Exceeded);
}

#[tokio::test]
async fn evaluator_failure_does_not_fail_the_transaction() {
    let fx = fixture().await;
    fx.budget().await;
    fx.db
        .execute(Statement::from_string(
            fx.db.get_database_backend(),
            "CREATE TRIGGER fail_alert_insert BEFORE INSERT ON budget_alerts \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        ))
        .await
        .unwrap();

    let tx = fx.spend(900_00).await;
    let stored = fx.engine.transaction(tx, "alice").await.unwrap();
    assert_eq!(stored.amount_minor, 900_00);
    assert_eq!(
        fx.engine.asset(fx.checking, "alice").await.unwrap().balance,
        10_000_00 - 900_00
    );
    assert!(fx.alerts().await.is_empty());

    let err = fx.engine.check_budget_alerts("alice").await.unwrap_err();
    assert_eq!(err.code(), "database");
}

#[tokio::test]
async fn update_and_delete_trigger_reevaluation() {
    let fx = fixture().await;
    fx.budget().await;

    let tx = fx.spend(700_00).await;
    assert!(fx.alerts().await.is_empty());

    fx.engine
        .update_transaction(UpdateTransactionCmd::new(tx, "alice").amount_minor(900_00))
        .await
        .unwrap();
    let alerts = fx.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].percentage, 90.0);

    // An income turned into an expense counts as well.
    let refund = fx
        .engine
        .create_transaction(CreateTransactionCmd::income(
            "alice",
            fx.groceries,
            fx.checking,
            200_00,
        ))
        .await
        .unwrap()
        .id;
    fx.engine
        .update_transaction(
            UpdateTransactionCmd::new(refund, "alice").direction(Direction::Expense),
        )
        .await
        .unwrap();
    assert_eq!(fx.alerts().await.len(), 2);

    fx.engine.delete_transaction(tx, "alice").await.unwrap();
    fx.engine.delete_transaction(refund, "alice").await.unwrap();
    assert_eq!(fx.alerts().await.len(), 2);
    let summary = fx.engine.budgets("alice", false).await.unwrap().remove(0);
    assert_eq!(summary.spent_minor, 0);
}

#[tokio::test]
async fn asset_scoped_budget_ignores_other_assets() {
    let fx = fixture().await;
    let savings = fx
        .engine
        .new_asset("alice", "Savings", AssetKind::Savings, Currency::Usd)
        .await
        .unwrap()
        .id;
    fx.engine
        .create_transaction(CreateTransactionCmd::income(
            "alice",
            fx.groceries,
            savings,
            10_000_00,
        ))
        .await
        .unwrap();
    let budget = fx
        .engine
        .new_budget(
            NewBudgetCmd::new("alice", fx.groceries, 100_00, BudgetPeriod::Yearly)
                .asset_id(savings)
                .start_date(Utc::now() - Duration::days(1)),
        )
        .await
        .unwrap();
    assert_eq!(budget.asset_id, Some(savings));
    assert_eq!(budget.currency, Currency::Usd);

    fx.spend(500_00).await;
    assert!(fx.alerts().await.is_empty());

    fx.engine
        .create_transaction(CreateTransactionCmd::expense(
            "alice",
            fx.groceries,
            savings,
            95_00,
        ))
        .await
        .unwrap();
    let alerts = fx.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "Budget for 'Groceries' has reached 95.0% (95.00 of 100.00 USD)"
    );
}

#[tokio::test]
async fn expenses_outside_the_window_are_not_counted() {
    let fx = fixture().await;
    let budget = fx.budget().await;

    fx.engine
        .create_transaction(
            CreateTransactionCmd::expense("alice", fx.groceries, fx.checking, 900_00)
                .occurred_at(Utc::now() - Duration::days(40)),
        )
        .await
        .unwrap();

    let summary = fx.engine.budget(budget, "alice").await.unwrap();
    assert_eq!(summary.spent_minor, 0);
    assert!(fx.alerts().await.is_empty());
}

#[tokio::test]
async fn inactive_and_deleted_budgets_stop_alerting() {
    let fx = fixture().await;
    let budget = fx.budget().await;
    fx.spend(850_00).await;
    assert_eq!(fx.alerts().await.len(), 1);

    fx.engine.deactivate_budget(budget, "alice").await.unwrap();
    fx.spend(150_00).await;
    assert_eq!(fx.alerts().await.len(), 1);
    assert!(fx.engine.budgets("alice", false).await.unwrap().is_empty());
    assert_eq!(fx.engine.budgets("alice", true).await.unwrap().len(), 1);

    fx.engine.delete_budget(budget, "alice").await.unwrap();
    assert!(fx.alerts().await.is_empty());
    let err = fx.engine.budget(budget, "alice").await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn new_budget_validates_input() {
    let fx = fixture().await;
    fx.engine.new_user("bob").await.unwrap();
    let bob_category = fx.engine.new_category("bob", "Fun").await.unwrap().id;

    let err = fx
        .engine
        .new_budget(NewBudgetCmd::new("alice", fx.groceries, 0, BudgetPeriod::Monthly))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_amount");

    let err = fx
        .engine
        .new_budget(
            NewBudgetCmd::new("alice", fx.groceries, 100, BudgetPeriod::Monthly)
                .alert_threshold(0),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_threshold");

    let err = fx
        .engine
        .new_budget(NewBudgetCmd::new("alice", bob_category, 100, BudgetPeriod::Monthly))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "category_not_found");

    let budget = fx
        .engine
        .new_budget(NewBudgetCmd::new("alice", fx.groceries, 100, BudgetPeriod::Yearly))
        .await
        .unwrap();
    assert_eq!(budget.alert_threshold, 80);
    assert!(budget.is_active);
    assert_eq!(
        budget.end_date,
        BudgetPeriod::Yearly.end_from(budget.start_date).unwrap()
    );
}

#[tokio::test]
async fn spend_only_counts_assets_in_the_budget_currency() {
    let fx = fixture().await;
    let yen = fx
        .engine
        .new_asset("alice", "Tokyo", AssetKind::Cash, Currency::Jpy)
        .await
        .unwrap()
        .id;
    fx.engine
        .create_transaction(CreateTransactionCmd::income(
            "alice",
            fx.groceries,
            yen,
            1_000_000,
        ))
        .await
        .unwrap();
    let budget = fx.budget().await;

    fx.spend(100_00).await;
    fx.engine
        .create_transaction(CreateTransactionCmd::expense(
            "alice",
            fx.groceries,
            yen,
            900_000,
        ))
        .await
        .unwrap();

    let summary = fx.engine.budget(budget, "alice").await.unwrap();
    assert_eq!(summary.budget.currency, Currency::Eur);
    assert_eq!(summary.spent_minor, 100_00);
    assert!(fx.alerts().await.is_empty());
}

#[tokio::test]
async fn asset_scoped_budget_must_match_the_asset_currency() {
    let fx = fixture().await;
    let yen = fx
        .engine
        .new_asset("alice", "Tokyo", AssetKind::Cash, Currency::Jpy)
        .await
        .unwrap()
        .id;

    let err = fx
        .engine
        .new_budget(
            NewBudgetCmd::new("alice", fx.groceries, 10_000, BudgetPeriod::Monthly)
                .asset_id(yen)
                .currency(Currency::Eur),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "currency_mismatch");
    assert!(fx.engine.budgets("alice", true).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_expenses_raise_a_single_alert() {
    let root =
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();
    let path = root.join(format!("budgets_{}.db", Uuid::new_v4()));
    let db = Database::connect(format!("sqlite:{}?mode=rwc", path.display()))
        .await
        .unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(Engine::builder().database(db).build().await.unwrap());

    engine.new_user("alice").await.unwrap();
    let groceries = engine.new_category("alice", "Groceries").await.unwrap().id;
    let mut assets = Vec::new();
    for name in ["A", "B"] {
        let asset = engine
            .new_asset("alice", name, AssetKind::Bank, Currency::Eur)
            .await
            .unwrap()
            .id;
        engine
            .create_transaction(CreateTransactionCmd::income(
                "alice", groceries, asset, 1000_00,
            ))
            .await
            .unwrap();
        assets.push(asset);
    }
    engine
        .new_budget(
            NewBudgetCmd::new("alice", groceries, 1000_00, BudgetPeriod::Monthly)
                .start_date(Utc::now() - Duration::days(1)),
        )
        .await
        .unwrap();

    engine
        .create_transaction(CreateTransactionCmd::expense(
            "alice", groceries, assets[0], 805_00,
        ))
        .await
        .unwrap();
    engine.mark_all_alerts_read("alice").await.unwrap();

    let mut tasks = Vec::new();
    for asset in [assets[0], assets[1], assets[0], assets[1]] {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine
                .create_transaction(CreateTransactionCmd::expense(
                    "alice", groceries, asset, 1,
                ))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let unread = engine.list_alerts("alice", true).await.unwrap();
    assert_eq!(unread.len(), 1);
    assert!(unread[0].spent_minor > 805_00);

    drop(engine);
    let _ = std::fs::remove_file(&path);
}
