use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::budget::EntryType;
use crate::ids::{AccountId, CategoryId, EntryId, TransactionId, UserId};
use crate::money::Money;

/// How a transaction came to be linked to a budget entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Unmatched,
    AutoLow,
    AutoHigh,
    Manual,
}

impl MatchConfidence {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchConfidence::Unmatched => "unmatched",
            MatchConfidence::AutoLow => "auto_low",
            MatchConfidence::AutoHigh => "auto_high",
            MatchConfidence::Manual => "manual",
        }
    }
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchConfidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unmatched" => Ok(MatchConfidence::Unmatched),
            "auto_low" => Ok(MatchConfidence::AutoLow),
            "auto_high" => Ok(MatchConfidence::AutoHigh),
            "manual" => Ok(MatchConfidence::Manual),
            other => Err(format!("unknown match confidence: '{other}'")),
        }
    }
}

/// An observed cash-flow event. `budget_entry_id` is set exactly when
/// `match_confidence` is something other than `Unmatched`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub budget_entry_id: Option<EntryId>,
    pub amount: Money,
    pub transaction_type: EntryType,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
    pub match_confidence: MatchConfidence,
}

impl Transaction {
    pub fn is_matched(&self) -> bool {
        self.budget_entry_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_round_trips_through_strings() {
        for level in [
            MatchConfidence::Unmatched,
            MatchConfidence::AutoLow,
            MatchConfidence::AutoHigh,
            MatchConfidence::Manual,
        ] {
            assert_eq!(level.as_str().parse::<MatchConfidence>().unwrap(), level);
        }
        assert!("auto".parse::<MatchConfidence>().is_err());
    }

    #[test]
    fn confidence_wire_names() {
        let json = serde_json::to_string(&MatchConfidence::AutoHigh).unwrap();
        assert_eq!(json, r#""auto_high""#);
    }
}
