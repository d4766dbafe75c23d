pub mod budget;
pub mod ids;
pub mod money;
pub mod period;
pub mod recurrence;
pub mod transaction;

pub use budget::{Budget, BudgetEntry, EntryType, Frequency, MatchingRules, ScheduleError};
pub use ids::{AccountId, BudgetId, CategoryId, EntryId, TransactionId, UserId};
pub use money::Money;
pub use period::DateRange;
pub use recurrence::{occurrences, occurs_on};
pub use transaction::{MatchConfidence, Transaction};
