use serde::Serialize;

use moneta_core::{BudgetEntry, MatchConfidence, Transaction, TransactionId, UserId};
use moneta_storage::DbPool;

use crate::error::EngineError;
use crate::score::{confidence_level, score_match};

/// A candidate link between a transaction and a budget entry. Ephemeral:
/// produced per request, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSuggestion {
    pub budget_entry: BudgetEntry,
    pub confidence_score: u32,
    pub confidence_level: MatchConfidence,
    pub match_reasons: Vec<String>,
}

/// Scores active entries of the transaction's type and ranks them by
/// descending score. Zero scores are dropped; ties keep candidate order.
pub fn rank_candidates(tx: &Transaction, entries: &[BudgetEntry]) -> Vec<MatchSuggestion> {
    let mut suggestions: Vec<MatchSuggestion> = entries
        .iter()
        .filter(|e| e.is_active && e.entry_type == tx.transaction_type)
        .filter_map(|entry| {
            let score = score_match(tx, entry);
            if score.points == 0 {
                return None;
            }
            Some(MatchSuggestion {
                budget_entry: entry.clone(),
                confidence_score: score.points,
                confidence_level: confidence_level(score.points),
                match_reasons: score.reasons,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| b.confidence_score.cmp(&a.confidence_score));
    suggestions
}

/// Ranked suggestions for a transaction against the user's active budget.
/// A user without an active budget gets an empty list, not an error.
pub async fn suggest_matches(
    pool: &DbPool,
    tx: &Transaction,
    user_id: UserId,
) -> Result<Vec<MatchSuggestion>, EngineError> {
    let Some(budget) = moneta_storage::get_active_budget(pool, user_id).await? else {
        return Ok(Vec::new());
    };
    let entries = moneta_storage::get_active_entries(pool, budget.id, user_id).await?;
    Ok(rank_candidates(tx, &entries))
}

/// Looks a transaction up by id and returns it with its ranked
/// suggestions. A missing or foreign transaction is an error, never an
/// empty result.
pub async fn suggestions_for_transaction(
    pool: &DbPool,
    transaction_id: TransactionId,
    user_id: UserId,
) -> Result<(Transaction, Vec<MatchSuggestion>), EngineError> {
    let tx = moneta_storage::get_transaction(pool, transaction_id, user_id)
        .await?
        .ok_or(EngineError::TransactionNotFound(transaction_id))?;
    let suggestions = suggest_matches(pool, &tx, user_id).await?;
    Ok((tx, suggestions))
}
