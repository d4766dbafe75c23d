use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ids::{BudgetId, CategoryId, EntryId, UserId};
use crate::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Income,
    Expense,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Income => "income",
            EntryType::Expense => "expense",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(EntryType::Income),
            "expense" => Ok(EntryType::Expense),
            other => Err(format!("unknown entry type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    OnceOff,
    Daily,
    Weekly,
    Fortnightly,
    Monthly,
    Annually,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::OnceOff => "once_off",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Fortnightly => "fortnightly",
            Frequency::Monthly => "monthly",
            Frequency::Annually => "annually",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once_off" => Ok(Frequency::OnceOff),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "fortnightly" => Ok(Frequency::Fortnightly),
            "monthly" => Ok(Frequency::Monthly),
            "annually" => Ok(Frequency::Annually),
            other => Err(format!("unknown frequency: '{other}'")),
        }
    }
}

/// Per-entry matching parameters, stored as JSON on the entry. Field names
/// match the persisted wire format; updates replace the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description_contains: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_tolerance: Option<Money>,
}

impl MatchingRules {
    pub fn is_empty(&self) -> bool {
        self.description_contains.is_empty()
            && self.merchant_name.is_none()
            && self.amount_tolerance.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: EntryId,
    pub budget_id: BudgetId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub amount: Money,
    pub entry_type: EntryType,
    pub frequency: Frequency,
    pub day_of_month: Option<u32>,
    pub day_of_week: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub matching_rules: Option<MatchingRules>,
    pub is_active: bool,
}

impl BudgetEntry {
    /// Weekday anchor, 0 = Sunday. Falls back to the start date's weekday.
    pub fn anchor_weekday(&self) -> u32 {
        self.day_of_week
            .unwrap_or_else(|| self.start_date.weekday().num_days_from_sunday())
    }

    /// Day-of-month anchor. Falls back to the start date's day.
    pub fn anchor_day_of_month(&self) -> u32 {
        self.day_of_month.unwrap_or_else(|| self.start_date.day())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ScheduleError {
    #[error("day_of_month must be between 1 and 31, got {0}")]
    DayOfMonthOutOfRange(u32),
    #[error("day_of_week must be between 0 and 6, got {0}")]
    DayOfWeekOutOfRange(u32),
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

/// Checks the anchor fields and date window of a planned schedule.
/// Unset anchors are always valid; they fall back to the start date.
pub fn validate_schedule(
    day_of_month: Option<u32>,
    day_of_week: Option<u32>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(), ScheduleError> {
    if let Some(day) = day_of_month {
        if !(1..=31).contains(&day) {
            return Err(ScheduleError::DayOfMonthOutOfRange(day));
        }
    }
    if let Some(day) = day_of_week {
        if day > 6 {
            return Err(ScheduleError::DayOfWeekOutOfRange(day));
        }
    }
    if let Some(end) = end_date {
        if end < start_date {
            return Err(ScheduleError::EndBeforeStart { start: start_date, end });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(frequency: Frequency, start: NaiveDate) -> BudgetEntry {
        BudgetEntry {
            id: EntryId(1),
            budget_id: BudgetId(1),
            category_id: None,
            name: "Rent".to_string(),
            description: None,
            amount: Money::from_cents(120_000),
            entry_type: EntryType::Expense,
            frequency,
            day_of_month: None,
            day_of_week: None,
            start_date: start,
            end_date: None,
            matching_rules: None,
            is_active: true,
        }
    }

    #[test]
    fn frequency_round_trips_through_strings() {
        for freq in [
            Frequency::OnceOff,
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Fortnightly,
            Frequency::Monthly,
            Frequency::Annually,
        ] {
            assert_eq!(freq.as_str().parse::<Frequency>().unwrap(), freq);
        }
    }

    #[test]
    fn unknown_frequency_string_is_rejected() {
        assert!("biweekly".parse::<Frequency>().is_err());
        assert!("".parse::<Frequency>().is_err());
    }

    #[test]
    fn anchor_weekday_falls_back_to_start_date() {
        // 2024-01-01 is a Monday
        let e = entry(Frequency::Weekly, date(2024, 1, 1));
        assert_eq!(e.anchor_weekday(), 1);

        let mut pinned = entry(Frequency::Weekly, date(2024, 1, 1));
        pinned.day_of_week = Some(5);
        assert_eq!(pinned.anchor_weekday(), 5);
    }

    #[test]
    fn anchor_day_of_month_falls_back_to_start_date() {
        let e = entry(Frequency::Monthly, date(2024, 1, 17));
        assert_eq!(e.anchor_day_of_month(), 17);

        let mut pinned = entry(Frequency::Monthly, date(2024, 1, 17));
        pinned.day_of_month = Some(5);
        assert_eq!(pinned.anchor_day_of_month(), 5);
    }

    #[test]
    fn validate_schedule_accepts_unset_anchors() {
        assert!(validate_schedule(None, None, date(2024, 1, 1), None).is_ok());
    }

    #[test]
    fn validate_schedule_rejects_bad_anchors() {
        assert!(matches!(
            validate_schedule(Some(0), None, date(2024, 1, 1), None),
            Err(ScheduleError::DayOfMonthOutOfRange(0))
        ));
        assert!(matches!(
            validate_schedule(Some(32), None, date(2024, 1, 1), None),
            Err(ScheduleError::DayOfMonthOutOfRange(32))
        ));
        assert!(matches!(
            validate_schedule(None, Some(7), date(2024, 1, 1), None),
            Err(ScheduleError::DayOfWeekOutOfRange(7))
        ));
    }

    #[test]
    fn validate_schedule_rejects_inverted_window() {
        assert!(matches!(
            validate_schedule(None, None, date(2024, 6, 1), Some(date(2024, 5, 1))),
            Err(ScheduleError::EndBeforeStart { .. })
        ));
    }

    #[test]
    fn matching_rules_wire_field_names() {
        let rules = MatchingRules {
            description_contains: vec!["Amazon Prime 4.99".to_string()],
            merchant_name: None,
            amount_tolerance: Some(Money::from_cents(200)),
        };
        let json = serde_json::to_value(&rules).unwrap();
        assert_eq!(json["description_contains"][0], "Amazon Prime 4.99");
        assert!(json.get("amount_tolerance").is_some());
        assert!(json.get("merchant_name").is_none());

        let back: MatchingRules = serde_json::from_value(json).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn matching_rules_tolerate_missing_fields() {
        let rules: MatchingRules = serde_json::from_str(r#"{"merchant_name":"netflix"}"#).unwrap();
        assert!(rules.description_contains.is_empty());
        assert_eq!(rules.merchant_name.as_deref(), Some("netflix"));
        assert!(!rules.is_empty());
        assert!(MatchingRules::default().is_empty());
    }
}
