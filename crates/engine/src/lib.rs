pub mod automatch;
pub mod error;
pub mod projection;
pub mod score;
pub mod suggest;
pub mod summary;
pub mod teach;

pub use automatch::{auto_match_transaction, bulk_auto_match};
pub use error::EngineError;
pub use projection::{
    project_cash_flow, project_for_budget, projection_days, upcoming_entries, CashFlowProjection,
    DailyProjection, MonthlyBreakdown, DEFAULT_PROJECTION_DAYS, MAX_PROJECTION_DAYS,
};
pub use score::{confidence_level, score_match, MatchScore, AUTO_HIGH_THRESHOLD};
pub use suggest::{
    rank_candidates, suggest_matches, suggestions_for_transaction, MatchSuggestion,
};
pub use summary::{
    budget_health, budget_summary, monthly_equivalent, summary_for_budget, BudgetHealth,
    BudgetSummary,
};
pub use teach::teach_match;
