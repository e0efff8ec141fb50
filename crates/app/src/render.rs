//! Plain text rendering of engine results.

use engine::{
    Asset, BalanceCheck, Budget, BudgetAlert, BudgetSummary, Category, Currency, MoneyCents,
    Page, Transaction,
};

pub fn asset(asset: &Asset) -> String {
    format!(
        "{}  {:<20} {:<10} {:>12} {}",
        asset.id,
        asset.name,
        asset.kind.as_str(),
        MoneyCents::new(asset.balance).format(asset.currency),
        asset.currency
    )
}

pub fn category(category: &Category) -> String {
    format!("{}  {}", category.id, category.name)
}

pub fn transaction(tx: &Transaction, currency: Currency) -> String {
    format!(
        "{}  {}  {:<7} {:>12}  {}",
        tx.id,
        tx.occurred_at.format("%Y-%m-%d %H:%M"),
        tx.direction.as_str(),
        MoneyCents::new(tx.signed_amount()).format(currency),
        tx.description.as_deref().unwrap_or("")
    )
}

pub fn transactions(page: &Page<Transaction>, currency: Currency) -> String {
    let mut out: Vec<String> = page
        .items
        .iter()
        .map(|tx| transaction(tx, currency))
        .collect();
    out.push(format!(
        "page {}/{} ({} transactions)",
        page.page,
        page.total_pages().max(1),
        page.total
    ));
    out.join("\n")
}

pub fn budget(budget: &Budget) -> String {
    format!(
        "{}  {} {} {} from {} to {}, alert at {}%{}",
        budget.id,
        MoneyCents::new(budget.amount_minor).format(budget.currency),
        budget.currency,
        budget.period.as_str(),
        budget.start_date.format("%Y-%m-%d"),
        budget.end_date.format("%Y-%m-%d"),
        budget.alert_threshold,
        if budget.is_active { "" } else { " (inactive)" }
    )
}

pub fn budget_summary(summary: &BudgetSummary) -> String {
    format!(
        "{}\n    spent {} ({:.1}%) {}",
        budget(&summary.budget),
        MoneyCents::new(summary.spent_minor).format(summary.budget.currency),
        summary.percentage,
        summary.status.as_str()
    )
}

pub fn alert(alert: &BudgetAlert) -> String {
    format!(
        "{} {}  {}  {}",
        if alert.is_read { " " } else { "*" },
        alert.id,
        alert.created_at.format("%Y-%m-%d %H:%M"),
        alert.message
    )
}

pub fn balance_check(check: &BalanceCheck) -> String {
    if check.is_consistent() {
        format!("{}  consistent ({})", check.asset_id, check.stored_minor)
    } else {
        format!(
            "{}  stored {} != ledger {} (drift {})",
            check.asset_id,
            check.stored_minor,
            check.ledger_minor,
            check.drift_minor()
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use engine::{AssetKind, Direction};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn transaction_line_shows_signed_amount() {
        let tx = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1250,
            Direction::Expense,
            Utc::now(),
            Some("lunch".to_string()),
        )
        .unwrap();
        let line = transaction(&tx, Currency::Eur);
        assert!(line.contains("-12.50"));
        assert!(line.ends_with("lunch"));
    }

    #[test]
    fn asset_line_formats_balance_in_currency() {
        let mut asset_value = Asset::new(
            "alice".to_string(),
            "Wallet".to_string(),
            AssetKind::Cash,
            Currency::Jpy,
        );
        asset_value.balance = 1500;
        let line = asset(&asset_value);
        assert!(line.contains("1500 JPY"));
    }
}
