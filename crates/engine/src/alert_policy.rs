//! Decides whether a budget evaluation turns into a persisted alert.

use crate::{BudgetStatus, Currency, EngineError, MoneyCents, ResultEngine};

/// Default width, in percentage points, of the deduplication window.
pub const DEFAULT_DEDUP_WINDOW: f64 = 5.0;

/// Heuristic that suppresses near-duplicate alerts for the same budget.
///
/// A new alert is dropped when an unread alert of the same budget was recorded
/// within `window` percentage points of the new percentage **and** both fall in
/// the same [`BudgetStatus`] band. It absorbs re-triggers caused by many small
/// expenses around the threshold, while a move from `Warning` into `Exceeded`
/// is always reported.
///
/// This is not an exact-match rule: with the default window of 5 points an
/// unread alert at 82% swallows a recomputation at 85%, but not one at 88%.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlertDeduplicator {
    window: f64,
}

impl Default for AlertDeduplicator {
    fn default() -> Self {
        Self {
            window: DEFAULT_DEDUP_WINDOW,
        }
    }
}

impl AlertDeduplicator {
    pub fn new(window: f64) -> ResultEngine<Self> {
        if !window.is_finite() || window < 0.0 {
            return Err(EngineError::InvalidThreshold(format!(
                "dedup window must be a non-negative number, got {window}"
            )));
        }
        Ok(Self { window })
    }

    #[must_use]
    pub fn window(&self) -> f64 {
        self.window
    }

    /// `unread` holds the percentages of the budget's unread alerts.
    pub fn should_emit(&self, unread: &[f64], percentage: f64, alert_threshold: u8) -> bool {
        let status = BudgetStatus::classify(percentage, alert_threshold);
        !unread.iter().any(|&previous| {
            (previous - percentage).abs() <= self.window
                && BudgetStatus::classify(previous, alert_threshold) == status
        })
    }
}

/// Human readable alert text: "reached" below 100%, "exceeded" from 100% on.
pub fn alert_message(
    category: &str,
    percentage: f64,
    spent_minor: i64,
    amount_minor: i64,
    currency: Currency,
) -> String {
    let verb = if percentage >= 100.0 {
        "exceeded"
    } else {
        "reached"
    };
    format!(
        "Budget for '{category}' has {verb} {percentage:.1}% ({} of {} {currency})",
        MoneyCents::new(spent_minor).format(currency),
        MoneyCents::new(amount_minor).format(currency),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_unread_alert_suppresses() {
        let dedup = AlertDeduplicator::default();
        assert!(!dedup.should_emit(&[82.0], 85.0, 80));
        assert!(!dedup.should_emit(&[82.0], 87.0, 80));
        assert!(dedup.should_emit(&[82.0], 87.5, 80));
    }

    #[test]
    fn no_unread_alerts_emits() {
        assert!(AlertDeduplicator::default().should_emit(&[], 81.0, 80));
    }

    #[test]
    fn crossing_into_exceeded_always_emits() {
        let dedup = AlertDeduplicator::default();
        assert!(dedup.should_emit(&[82.0], 101.0, 80));
        assert!(dedup.should_emit(&[97.0], 100.0, 80));
        assert!(!dedup.should_emit(&[101.0], 104.0, 80));
    }

    #[test]
    fn zero_window_only_blocks_exact_repeats() {
        let dedup = AlertDeduplicator::new(0.0).unwrap();
        assert!(!dedup.should_emit(&[90.0], 90.0, 80));
        assert!(dedup.should_emit(&[90.0], 90.5, 80));
    }

    #[test]
    fn rejects_invalid_window() {
        assert!(AlertDeduplicator::new(-1.0).is_err());
        assert!(AlertDeduplicator::new(f64::NAN).is_err());
    }

    #[test]
    fn message_wording_follows_percentage() {
        let reached = alert_message("Groceries", 82.0, 82_000, 100_000, Currency::Eur);
        assert_eq!(
            reached,
            "Budget for 'Groceries' has reached 82.0% (820.00 of 1000.00 EUR)"
        );
        let exceeded = alert_message("Groceries", 100.0, 100_000, 100_000, Currency::Eur);
        assert!(exceeded.contains("has exceeded 100.0%"));
    }
}
