use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use moneta_core::{BudgetEntry, BudgetId, EntryType, Frequency, Money, UserId};
use moneta_storage::DbPool;

use crate::error::EngineError;

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSummary {
    pub budget_id: BudgetId,
    pub total_monthly_income: Money,
    pub total_annual_income: Money,
    pub total_monthly_expenses: Money,
    pub total_annual_expenses: Money,
    pub monthly_surplus_deficit: Money,
    pub annual_surplus_deficit: Money,
    pub income_entries_count: u32,
    pub expense_entries_count: u32,
}

/// Converts an entry amount to its monthly equivalent. One-off entries
/// contribute nothing to a recurring monthly budget.
pub fn monthly_equivalent(amount: Money, frequency: Frequency) -> Money {
    match frequency {
        Frequency::OnceOff => Money::zero(),
        // Average days and weeks per month.
        Frequency::Daily => amount.times(Decimal::new(3044, 2)),
        Frequency::Weekly => amount.times(Decimal::new(433, 2)),
        Frequency::Fortnightly => amount.times(Decimal::new(217, 2)),
        Frequency::Monthly => amount,
        Frequency::Annually => amount.divided_by(12),
    }
}

/// Rolls active entries up into monthly and annual totals.
pub fn budget_summary(budget_id: BudgetId, entries: &[BudgetEntry]) -> BudgetSummary {
    let mut summary = BudgetSummary {
        budget_id,
        total_monthly_income: Money::zero(),
        total_annual_income: Money::zero(),
        total_monthly_expenses: Money::zero(),
        total_annual_expenses: Money::zero(),
        monthly_surplus_deficit: Money::zero(),
        annual_surplus_deficit: Money::zero(),
        income_entries_count: 0,
        expense_entries_count: 0,
    };

    for entry in entries.iter().filter(|e| e.is_active) {
        let monthly = monthly_equivalent(entry.amount, entry.frequency);
        let annual = monthly.times(Decimal::from(12));

        match entry.entry_type {
            EntryType::Income => {
                summary.total_monthly_income = summary.total_monthly_income + monthly;
                summary.total_annual_income = summary.total_annual_income + annual;
                summary.income_entries_count += 1;
            }
            EntryType::Expense => {
                summary.total_monthly_expenses = summary.total_monthly_expenses + monthly;
                summary.total_annual_expenses = summary.total_annual_expenses + annual;
                summary.expense_entries_count += 1;
            }
        }
    }

    summary.monthly_surplus_deficit = summary.total_monthly_income - summary.total_monthly_expenses;
    summary.annual_surplus_deficit = summary.total_annual_income - summary.total_annual_expenses;
    summary
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetHealth {
    pub score: u32,
    pub status: &'static str,
    pub message: &'static str,
    pub color: &'static str,
}

/// Health score with a display bucket. Break-even sits at 50; saving half
/// the income reaches 100, spending double the income bottoms out at 0.
pub fn budget_health(summary: &BudgetSummary) -> BudgetHealth {
    let score = health_score(summary);
    let (status, message, color) = match score {
        80..=100 => (
            "excellent",
            "Your budget is in excellent shape! You're saving well.",
            "#10B981",
        ),
        60..=79 => (
            "good",
            "Your budget looks good. You have a healthy surplus.",
            "#3B82F6",
        ),
        40..=59 => (
            "fair",
            "Your budget is balanced, but there's room for improvement.",
            "#F59E0B",
        ),
        20..=39 => (
            "poor",
            "Your expenses are close to or exceeding your income. Consider adjustments.",
            "#EF4444",
        ),
        _ => (
            "critical",
            "Your expenses significantly exceed your income. Immediate action needed.",
            "#DC2626",
        ),
    };

    BudgetHealth {
        score,
        status,
        message,
        color,
    }
}

fn health_score(summary: &BudgetSummary) -> u32 {
    // An empty budget is neither healthy nor unhealthy.
    if summary.income_entries_count == 0 && summary.expense_entries_count == 0 {
        return 50;
    }
    if summary.total_monthly_income.is_zero() {
        return 0;
    }

    let ratio = summary.monthly_surplus_deficit.as_decimal()
        / summary.total_monthly_income.as_decimal();
    let score = Decimal::from(50) + ratio * Decimal::from(100);
    score
        .clamp(Decimal::ZERO, Decimal::from(100))
        .to_u32()
        .unwrap_or(0)
}

pub async fn summary_for_budget(
    pool: &DbPool,
    budget_id: BudgetId,
    user_id: UserId,
) -> Result<BudgetSummary, EngineError> {
    let budget = moneta_storage::get_budget(pool, budget_id, user_id)
        .await?
        .ok_or(EngineError::BudgetNotFound(budget_id))?;
    let entries = moneta_storage::get_active_entries(pool, budget.id, user_id).await?;
    Ok(budget_summary(budget.id, &entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use moneta_core::EntryId;

    fn entry(cents: i64, entry_type: EntryType, frequency: Frequency) -> BudgetEntry {
        BudgetEntry {
            id: EntryId(1),
            budget_id: BudgetId(1),
            category_id: None,
            name: "Entry".to_string(),
            description: None,
            amount: Money::from_cents(cents),
            entry_type,
            frequency,
            day_of_month: None,
            day_of_week: None,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            matching_rules: None,
            is_active: true,
        }
    }

    #[test]
    fn monthly_equivalents_per_frequency() {
        let hundred = Money::from_cents(10_000);
        assert_eq!(monthly_equivalent(hundred, Frequency::OnceOff), Money::zero());
        assert_eq!(
            monthly_equivalent(hundred, Frequency::Daily),
            Money::from_cents(304_400)
        );
        assert_eq!(
            monthly_equivalent(hundred, Frequency::Weekly),
            Money::from_cents(43_300)
        );
        assert_eq!(
            monthly_equivalent(hundred, Frequency::Fortnightly),
            Money::from_cents(21_700)
        );
        assert_eq!(monthly_equivalent(hundred, Frequency::Monthly), hundred);
        assert_eq!(
            monthly_equivalent(Money::from_cents(120_000), Frequency::Annually),
            Money::from_cents(10_000)
        );
    }

    #[test]
    fn summary_totals_and_counts() {
        let entries = vec![
            entry(500_000, EntryType::Income, Frequency::Monthly),
            entry(120_000, EntryType::Expense, Frequency::Monthly),
            entry(1599, EntryType::Expense, Frequency::Monthly),
        ];
        let summary = budget_summary(BudgetId(1), &entries);

        assert_eq!(summary.income_entries_count, 1);
        assert_eq!(summary.expense_entries_count, 2);
        assert_eq!(summary.total_monthly_income, Money::from_cents(500_000));
        assert_eq!(summary.total_monthly_expenses, Money::from_cents(121_599));
        assert_eq!(summary.monthly_surplus_deficit, Money::from_cents(378_401));
        assert_eq!(summary.total_annual_income, Money::from_cents(6_000_000));
    }

    #[test]
    fn summary_ignores_inactive_entries() {
        let mut inactive = entry(999_999, EntryType::Expense, Frequency::Monthly);
        inactive.is_active = false;
        let summary = budget_summary(BudgetId(1), &[inactive]);
        assert_eq!(summary.expense_entries_count, 0);
        assert!(summary.total_monthly_expenses.is_zero());
    }

    #[test]
    fn once_off_entries_count_but_add_nothing() {
        let entries = vec![entry(50_000, EntryType::Expense, Frequency::OnceOff)];
        let summary = budget_summary(BudgetId(1), &entries);
        assert_eq!(summary.expense_entries_count, 1);
        assert!(summary.total_monthly_expenses.is_zero());
    }

    #[test]
    fn empty_budget_is_neutral_health() {
        let summary = budget_summary(BudgetId(1), &[]);
        let health = budget_health(&summary);
        assert_eq!(health.score, 50);
        assert_eq!(health.status, "fair");
    }

    #[test]
    fn no_income_is_critical() {
        let entries = vec![entry(120_000, EntryType::Expense, Frequency::Monthly)];
        let health = budget_health(&budget_summary(BudgetId(1), &entries));
        assert_eq!(health.score, 0);
        assert_eq!(health.status, "critical");
    }

    #[test]
    fn break_even_scores_fifty() {
        let entries = vec![
            entry(100_000, EntryType::Income, Frequency::Monthly),
            entry(100_000, EntryType::Expense, Frequency::Monthly),
        ];
        let health = budget_health(&budget_summary(BudgetId(1), &entries));
        assert_eq!(health.score, 50);
    }

    #[test]
    fn saving_half_the_income_is_excellent() {
        let entries = vec![
            entry(100_000, EntryType::Income, Frequency::Monthly),
            entry(50_000, EntryType::Expense, Frequency::Monthly),
        ];
        let health = budget_health(&budget_summary(BudgetId(1), &entries));
        assert_eq!(health.score, 100);
        assert_eq!(health.status, "excellent");
    }

    #[test]
    fn overspending_clamps_to_zero() {
        let entries = vec![
            entry(100_000, EntryType::Income, Frequency::Monthly),
            entry(300_000, EntryType::Expense, Frequency::Monthly),
        ];
        let health = budget_health(&budget_summary(BudgetId(1), &entries));
        assert_eq!(health.score, 0);
    }
}
