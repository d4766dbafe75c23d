use chrono::{Datelike, NaiveDate};

use crate::budget::{BudgetEntry, Frequency};
use crate::period::DateRange;

/// Whether a planned entry falls due on `date`.
///
/// Dates outside the entry's `[start_date, end_date]` window never occur.
/// Monthly entries anchor to a day-of-month with no end-of-month clamping:
/// an anchor of 31 never occurs in a month with fewer days.
pub fn occurs_on(entry: &BudgetEntry, date: NaiveDate) -> bool {
    if date < entry.start_date {
        return false;
    }
    if entry.end_date.is_some_and(|end| date > end) {
        return false;
    }

    match entry.frequency {
        Frequency::OnceOff => date == entry.start_date,
        Frequency::Daily => true,
        Frequency::Weekly => date.weekday().num_days_from_sunday() == entry.anchor_weekday(),
        Frequency::Fortnightly => {
            // Even-numbered weeks since the start date, on the anchor weekday.
            // With no explicit weekday anchor this is exactly every 14 days.
            let days_since = (date - entry.start_date).num_days();
            (days_since / 7) % 2 == 0
                && date.weekday().num_days_from_sunday() == entry.anchor_weekday()
        }
        Frequency::Monthly => date.day() == entry.anchor_day_of_month(),
        Frequency::Annually => {
            (date.month(), date.day()) == (entry.start_date.month(), entry.start_date.day())
        }
    }
}

/// All occurrence dates of `entry` within `range`, in order.
///
/// Recomputed from scratch on every call; there is deliberately no cached
/// schedule state to invalidate when entries change. Cost is linear in the
/// range length, which callers keep bounded.
pub fn occurrences(entry: &BudgetEntry, range: DateRange) -> Vec<NaiveDate> {
    range.days().filter(|date| occurs_on(entry, *date)).collect()
}
