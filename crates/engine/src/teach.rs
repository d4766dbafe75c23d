use moneta_core::{EntryId, MatchConfidence, MatchingRules, Money, Transaction, TransactionId, UserId};
use moneta_storage::DbPool;

use crate::error::EngineError;

/// Tolerance written onto taught rules when the caller does not supply one.
pub const DEFAULT_TAUGHT_TOLERANCE_CENTS: i64 = 200;

/// Records a user-confirmed match: the transaction is always linked to the
/// given entry as `manual`, overriding whatever the scorer would say.
///
/// With `create_rules`, and when the transaction carries a description, the
/// entry's matching rules are replaced with a rule derived from the
/// transaction so future scoring favors this entry. Failing to persist the
/// derived rules is logged and swallowed; the link itself still stands.
pub async fn teach_match(
    pool: &DbPool,
    transaction_id: TransactionId,
    entry_id: EntryId,
    user_id: UserId,
    create_rules: bool,
    amount_tolerance: Option<Money>,
) -> Result<Transaction, EngineError> {
    let tx = moneta_storage::get_transaction(pool, transaction_id, user_id)
        .await?
        .ok_or(EngineError::TransactionNotFound(transaction_id))?;

    if moneta_storage::get_entry(pool, entry_id, user_id).await?.is_none() {
        return Err(EngineError::EntryNotFound(entry_id));
    }

    let linked = moneta_storage::link_transaction(
        pool,
        transaction_id,
        user_id,
        entry_id,
        MatchConfidence::Manual,
    )
    .await?
    .ok_or(EngineError::TransactionNotFound(transaction_id))?;

    if create_rules {
        if let Some(description) = tx.description.filter(|d| !d.is_empty()) {
            let tolerance = amount_tolerance
                .filter(|t| *t > Money::zero())
                .unwrap_or_else(|| Money::from_cents(DEFAULT_TAUGHT_TOLERANCE_CENTS));
            let rules = MatchingRules {
                description_contains: vec![description],
                merchant_name: None,
                amount_tolerance: Some(tolerance),
            };

            match moneta_storage::update_matching_rules(pool, entry_id, user_id, &rules).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(entry = %entry_id, "taught rules not persisted, entry gone");
                }
                Err(err) => {
                    tracing::warn!(entry = %entry_id, error = %err, "failed to persist taught rules");
                }
            }
        }
    }

    Ok(linked)
}
