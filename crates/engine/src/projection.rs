use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use moneta_core::{occurrences, occurs_on, BudgetEntry, BudgetId, DateRange, EntryType, Money, UserId};
use moneta_storage::DbPool;

use crate::error::EngineError;

pub const MAX_PROJECTION_DAYS: i64 = 365;
pub const DEFAULT_PROJECTION_DAYS: i64 = 90;

/// Resolves a caller-supplied projection horizon. Missing or out-of-range
/// values, including anything over a year, fall back to the default.
pub fn projection_days(requested: Option<i64>) -> u32 {
    match requested {
        Some(days) if (1..=MAX_PROJECTION_DAYS).contains(&days) => days as u32,
        _ => DEFAULT_PROJECTION_DAYS as u32,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyProjection {
    pub date: NaiveDate,
    pub balance: Money,
    pub daily_income: Money,
    pub daily_expenses: Money,
    pub daily_net: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBreakdown {
    /// Calendar month key, e.g. "2025-01".
    pub month: String,
    pub income: Money,
    pub expenses: Money,
    pub net: Money,
    pub ending_balance: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowProjection {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub starting_balance: Money,
    pub ending_balance: Money,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_cash_flow: Money,
    pub daily_projections: Vec<DailyProjection>,
    pub monthly_breakdown: Vec<MonthlyBreakdown>,
}

/// Walks the balance forward one day at a time, applying every entry that
/// falls due. Recurrence is evaluated fresh for each day; months come out
/// in calendar order.
pub fn project_cash_flow(
    entries: &[BudgetEntry],
    starting_balance: Money,
    start: NaiveDate,
    days: u32,
) -> CashFlowProjection {
    let end = start + Days::new(u64::from(days.saturating_sub(1)));
    let range = DateRange::new(start, end);

    let mut balance = starting_balance;
    let mut total_income = Money::zero();
    let mut total_expenses = Money::zero();
    let mut daily_projections = Vec::with_capacity(days as usize);
    let mut months: BTreeMap<String, MonthlyBreakdown> = BTreeMap::new();

    for date in range.days() {
        let mut daily_income = Money::zero();
        let mut daily_expenses = Money::zero();

        for entry in entries.iter().filter(|e| e.is_active) {
            if occurs_on(entry, date) {
                match entry.entry_type {
                    EntryType::Income => daily_income = daily_income + entry.amount,
                    EntryType::Expense => daily_expenses = daily_expenses + entry.amount,
                }
            }
        }

        let daily_net = daily_income - daily_expenses;
        balance = balance + daily_net;

        daily_projections.push(DailyProjection {
            date,
            balance,
            daily_income,
            daily_expenses,
            daily_net,
        });

        let key = format!("{:04}-{:02}", date.year(), date.month());
        let month = months.entry(key.clone()).or_insert_with(|| MonthlyBreakdown {
            month: key,
            income: Money::zero(),
            expenses: Money::zero(),
            net: Money::zero(),
            ending_balance: balance,
        });
        month.income = month.income + daily_income;
        month.expenses = month.expenses + daily_expenses;
        month.net = month.net + daily_net;
        month.ending_balance = balance;

        total_income = total_income + daily_income;
        total_expenses = total_expenses + daily_expenses;
    }

    CashFlowProjection {
        start_date: start,
        end_date: end,
        starting_balance,
        ending_balance: balance,
        total_income,
        total_expenses,
        net_cash_flow: total_income - total_expenses,
        daily_projections,
        monthly_breakdown: months.into_values().collect(),
    }
}

/// Active expense entries due in the window, as (date, entry) pairs ordered
/// by date. Entries sharing a date keep their input order.
pub fn upcoming_entries<'a>(
    entries: &'a [BudgetEntry],
    from: NaiveDate,
    days: u32,
) -> Vec<(NaiveDate, &'a BudgetEntry)> {
    let end = from + Days::new(u64::from(days.saturating_sub(1)));
    let range = DateRange::new(from, end);

    let mut upcoming: Vec<(NaiveDate, &BudgetEntry)> = entries
        .iter()
        .filter(|e| e.is_active && e.entry_type == EntryType::Expense)
        .flat_map(|entry| occurrences(entry, range).into_iter().map(move |d| (d, entry)))
        .collect();
    upcoming.sort_by_key(|(date, _)| *date);
    upcoming
}

pub async fn project_for_budget(
    pool: &DbPool,
    budget_id: BudgetId,
    user_id: UserId,
    starting_balance: Money,
    start: NaiveDate,
    requested_days: Option<i64>,
) -> Result<CashFlowProjection, EngineError> {
    let budget = moneta_storage::get_budget(pool, budget_id, user_id)
        .await?
        .ok_or(EngineError::BudgetNotFound(budget_id))?;
    let entries = moneta_storage::get_active_entries(pool, budget.id, user_id).await?;
    Ok(project_cash_flow(
        &entries,
        starting_balance,
        start,
        projection_days(requested_days),
    ))
}
