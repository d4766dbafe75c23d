use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use moneta_core::{BudgetEntry, Frequency, MatchConfidence, MatchingRules, Money, Transaction};

/// Scores at or above this auto-link as `auto_high`.
pub const AUTO_HIGH_THRESHOLD: u32 = 70;

/// One heuristic's contribution to a match score.
#[derive(Debug, Clone, PartialEq)]
struct Signal {
    points: u32,
    reason: String,
}

impl Signal {
    fn new(points: u32, reason: impl Into<String>) -> Self {
        Signal {
            points,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchScore {
    pub points: u32,
    pub reasons: Vec<String>,
}

/// Scores a (transaction, entry) pair: independent heuristics each
/// contribute points and a reason, summed and clamped to [0, 100].
///
/// Deterministic and side-effect free. The caller is responsible for only
/// scoring entries of the transaction's type; this function does not check.
pub fn score_match(tx: &Transaction, entry: &BudgetEntry) -> MatchScore {
    let mut signals = Vec::new();

    if let Some(rules) = &entry.matching_rules {
        signals.extend(rule_signals(tx, entry, rules));
    }
    if let Some(description) = tx.description.as_deref().filter(|d| !d.is_empty()) {
        signals.extend(description_signal(description, &entry.name));
    }
    signals.extend(amount_signal(tx.amount, entry.amount));
    signals.extend(category_signal(tx, entry));
    if entry.frequency != Frequency::OnceOff {
        signals.extend(timing_signal(tx.transaction_date, entry));
    }

    let points: u32 = signals.iter().map(|s| s.points).sum();
    MatchScore {
        points: points.min(100),
        reasons: signals.into_iter().map(|s| s.reason).collect(),
    }
}

pub fn confidence_level(points: u32) -> MatchConfidence {
    if points >= AUTO_HIGH_THRESHOLD {
        MatchConfidence::AutoHigh
    } else {
        MatchConfidence::AutoLow
    }
}

/// Per-entry matching rules: +30 for the first description pattern hit,
/// +25 for a merchant-name hit, +20 for an amount inside the tolerance.
fn rule_signals(tx: &Transaction, entry: &BudgetEntry, rules: &MatchingRules) -> Vec<Signal> {
    let mut signals = Vec::new();

    if let Some(description) = tx.description.as_deref().filter(|d| !d.is_empty()) {
        let haystack = description.to_lowercase();

        for pattern in &rules.description_contains {
            if haystack.contains(&pattern.to_lowercase()) {
                signals.push(Signal::new(30, format!("Description contains '{pattern}'")));
                break;
            }
        }
        if let Some(merchant) = &rules.merchant_name {
            if haystack.contains(&merchant.to_lowercase()) {
                signals.push(Signal::new(25, format!("Merchant name: {merchant}")));
            }
        }
    }
    if let Some(tolerance) = rules.amount_tolerance {
        if tx.amount.abs_diff(entry.amount) <= tolerance {
            signals.push(Signal::new(20, format!("Amount within {tolerance}")));
        }
    }

    signals
}

/// Description against entry name: exact (40) beats substring (25) beats
/// shared words (15). Only the first satisfied tier contributes.
fn description_signal(description: &str, entry_name: &str) -> Option<Signal> {
    let description = description.to_lowercase();
    let name = entry_name.to_lowercase();

    if description == name {
        return Some(Signal::new(40, "Exact description match"));
    }
    if description.contains(&name) || name.contains(&description) {
        return Some(Signal::new(25, "Partial description match"));
    }

    // Words longer than 3 characters shared between the two strings.
    let name_words: Vec<&str> = name.split_whitespace().collect();
    let shared: usize = description
        .split_whitespace()
        .filter(|word| word.len() > 3)
        .map(|word| name_words.iter().filter(|&&n| n == word).count())
        .sum();
    if shared >= 2 {
        return Some(Signal::new(15, format!("{shared} common words")));
    }

    None
}

/// Amount proximity cascade; the first satisfied tier wins.
fn amount_signal(amount: Money, entry_amount: Money) -> Option<Signal> {
    let diff = amount.abs_diff(entry_amount);

    if diff < Money::from_cents(1) {
        return Some(Signal::new(30, "Exact amount match"));
    }
    if diff <= Money::from_cents(200) {
        return Some(Signal::new(20, format!("Amount within {diff}")));
    }
    if diff <= entry_amount.times(Decimal::new(5, 2)) {
        return Some(Signal::new(15, "Amount within 5%"));
    }
    if diff <= Money::from_cents(1000) {
        return Some(Signal::new(5, "Amount within $10"));
    }

    None
}

fn category_signal(tx: &Transaction, entry: &BudgetEntry) -> Option<Signal> {
    match (tx.category_id, entry.category_id) {
        (Some(a), Some(b)) if a == b => Some(Signal::new(20, "Same category")),
        _ => None,
    }
}

/// Whether the transaction date lines up with the entry's recurrence
/// anchor. Monthly entries get partial credit within 3 calendar days of
/// the anchor; nothing scores outside the entry's date window.
fn timing_signal(date: NaiveDate, entry: &BudgetEntry) -> Option<Signal> {
    if date < entry.start_date {
        return None;
    }
    if entry.end_date.is_some_and(|end| date > end) {
        return None;
    }

    match entry.frequency {
        Frequency::Monthly => {
            let anchor = entry.anchor_day_of_month();
            if date.day() == anchor {
                Some(Signal::new(15, "Matches monthly schedule"))
            } else if (i64::from(date.day()) - i64::from(anchor)).abs() <= 3 {
                Some(Signal::new(10, "Close to monthly schedule"))
            } else {
                None
            }
        }
        Frequency::Weekly => (date.weekday().num_days_from_sunday() == entry.anchor_weekday())
            .then(|| Signal::new(15, "Matches weekly schedule")),
        Frequency::Fortnightly => {
            let weeks_since = (date - entry.start_date).num_days() / 7;
            (weeks_since % 2 == 0
                && date.weekday().num_days_from_sunday() == entry.anchor_weekday())
            .then(|| Signal::new(15, "Matches fortnightly schedule"))
        }
        Frequency::Annually => {
            ((date.month(), date.day()) == (entry.start_date.month(), entry.start_date.day()))
                .then(|| Signal::new(15, "Matches annual schedule"))
        }
        Frequency::Daily | Frequency::OnceOff => None,
    }
}
