use moneta_core::{MatchConfidence, Transaction, TransactionId, UserId};
use moneta_storage::DbPool;

use crate::error::EngineError;
use crate::score::AUTO_HIGH_THRESHOLD;
use crate::suggest::suggest_matches;

/// Links the transaction to its top suggestion when that suggestion is
/// high-confidence; otherwise leaves it unmatched. Transactions that are
/// already linked, or were matched manually, are returned untouched.
pub async fn auto_match_transaction(
    pool: &DbPool,
    transaction_id: TransactionId,
    user_id: UserId,
) -> Result<Transaction, EngineError> {
    let tx = moneta_storage::get_transaction(pool, transaction_id, user_id)
        .await?
        .ok_or(EngineError::TransactionNotFound(transaction_id))?;

    if tx.match_confidence == MatchConfidence::Manual || tx.budget_entry_id.is_some() {
        return Ok(tx);
    }

    let suggestions = suggest_matches(pool, &tx, user_id).await?;
    match suggestions.first() {
        Some(top) if top.confidence_score >= AUTO_HIGH_THRESHOLD => {
            moneta_storage::link_transaction(
                pool,
                transaction_id,
                user_id,
                top.budget_entry.id,
                MatchConfidence::AutoHigh,
            )
            .await?
            .ok_or(EngineError::TransactionNotFound(transaction_id))
        }
        _ => Ok(tx),
    }
}

/// Runs [`auto_match_transaction`] over every unmatched transaction the
/// user has, sequentially. A failure on one transaction is logged and
/// skipped; the batch always runs to completion. Returns how many
/// transactions ended up linked.
pub async fn bulk_auto_match(pool: &DbPool, user_id: UserId) -> Result<usize, EngineError> {
    let unmatched = moneta_storage::get_unmatched_transactions(pool, user_id).await?;

    let mut linked = 0;
    for tx in unmatched {
        match auto_match_transaction(pool, tx.id, user_id).await {
            Ok(matched) if matched.budget_entry_id.is_some() => linked += 1,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(transaction = %tx.id, error = %err, "auto-match failed, skipping");
            }
        }
    }

    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use moneta_core::{AccountId, BudgetId, EntryType, Frequency, Money};
    use moneta_storage::{NewBudgetEntry, NewTransaction};
    use tempfile::TempDir;

    async fn test_pool() -> (TempDir, DbPool) {
        let dir = TempDir::new().unwrap();
        let pool = moneta_storage::create_db(&dir.path().join("test.db"))
            .await
            .unwrap();
        (dir, pool)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry_draft(budget_id: BudgetId, name: &str, cents: i64) -> NewBudgetEntry {
        NewBudgetEntry {
            budget_id,
            category_id: None,
            name: name.to_string(),
            description: None,
            amount: Money::from_cents(cents),
            entry_type: EntryType::Expense,
            frequency: Frequency::Monthly,
            day_of_month: Some(5),
            day_of_week: None,
            start_date: date(2024, 1, 5),
            end_date: None,
            matching_rules: None,
        }
    }

    fn tx_draft(
        user_id: UserId,
        account_id: AccountId,
        description: &str,
        cents: i64,
        on: NaiveDate,
    ) -> NewTransaction {
        NewTransaction {
            user_id,
            account_id,
            category_id: None,
            amount: Money::from_cents(cents),
            transaction_type: EntryType::Expense,
            description: Some(description.to_string()),
            transaction_date: on,
            notes: None,
        }
    }

    #[tokio::test]
    async fn links_high_confidence_match() {
        let (_dir, pool) = test_pool().await;
        let user = UserId(1);
        let account = moneta_storage::create_account(&pool, user, "Checking").await.unwrap();
        let budget = moneta_storage::create_budget(&pool, user, "2024", None, true).await.unwrap();
        let netflix = moneta_storage::create_entry(&pool, user, entry_draft(budget.id, "Netflix", 1599))
            .await
            .unwrap();
        let tx = moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "NETFLIX.COM", 1599, date(2024, 3, 5)),
        )
        .await
        .unwrap();

        let matched = auto_match_transaction(&pool, tx.id, user).await.unwrap();
        assert_eq!(matched.budget_entry_id, Some(netflix.id));
        assert_eq!(matched.match_confidence, MatchConfidence::AutoHigh);
    }

    #[tokio::test]
    async fn leaves_low_confidence_unmatched() {
        let (_dir, pool) = test_pool().await;
        let user = UserId(1);
        let account = moneta_storage::create_account(&pool, user, "Checking").await.unwrap();
        let budget = moneta_storage::create_budget(&pool, user, "2024", None, true).await.unwrap();
        moneta_storage::create_entry(&pool, user, entry_draft(budget.id, "Netflix", 1599))
            .await
            .unwrap();
        // Wrong description and amount, only near-anchor timing scores.
        let tx = moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "Grocery Store", 5210, date(2024, 3, 6)),
        )
        .await
        .unwrap();

        let result = auto_match_transaction(&pool, tx.id, user).await.unwrap();
        assert!(result.budget_entry_id.is_none());
        assert_eq!(result.match_confidence, MatchConfidence::Unmatched);
    }

    #[tokio::test]
    async fn does_not_touch_manual_or_linked_transactions() {
        let (_dir, pool) = test_pool().await;
        let user = UserId(1);
        let account = moneta_storage::create_account(&pool, user, "Checking").await.unwrap();
        let budget = moneta_storage::create_budget(&pool, user, "2024", None, true).await.unwrap();
        let rent = moneta_storage::create_entry(&pool, user, entry_draft(budget.id, "Rent", 120_000))
            .await
            .unwrap();
        moneta_storage::create_entry(&pool, user, entry_draft(budget.id, "Netflix", 1599))
            .await
            .unwrap();

        // User insists this Netflix-looking transaction is rent.
        let tx = moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "NETFLIX.COM", 1599, date(2024, 3, 5)),
        )
        .await
        .unwrap();
        moneta_storage::link_transaction(&pool, tx.id, user, rent.id, MatchConfidence::Manual)
            .await
            .unwrap();

        let result = auto_match_transaction(&pool, tx.id, user).await.unwrap();
        assert_eq!(result.budget_entry_id, Some(rent.id));
        assert_eq!(result.match_confidence, MatchConfidence::Manual);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let (_dir, pool) = test_pool().await;
        let result = auto_match_transaction(&pool, TransactionId(999), UserId(1)).await;
        assert!(matches!(result, Err(EngineError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn no_active_budget_means_no_link() {
        let (_dir, pool) = test_pool().await;
        let user = UserId(1);
        let account = moneta_storage::create_account(&pool, user, "Checking").await.unwrap();
        let tx = moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "NETFLIX.COM", 1599, date(2024, 3, 5)),
        )
        .await
        .unwrap();

        let result = auto_match_transaction(&pool, tx.id, user).await.unwrap();
        assert!(result.budget_entry_id.is_none());
    }

    #[tokio::test]
    async fn bulk_counts_only_newly_linked() {
        let (_dir, pool) = test_pool().await;
        let user = UserId(1);
        let account = moneta_storage::create_account(&pool, user, "Checking").await.unwrap();
        let budget = moneta_storage::create_budget(&pool, user, "2024", None, true).await.unwrap();
        moneta_storage::create_entry(&pool, user, entry_draft(budget.id, "Netflix", 1599))
            .await
            .unwrap();

        // One clear hit, two that score under the auto-link threshold.
        moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "NETFLIX.COM", 1599, date(2024, 3, 5)),
        )
        .await
        .unwrap();
        moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "Grocery Store", 5210, date(2024, 3, 12)),
        )
        .await
        .unwrap();
        moneta_storage::insert_transaction(
            &pool,
            tx_draft(user, account, "Coffee", 450, date(2024, 3, 4)),
        )
        .await
        .unwrap();

        assert_eq!(bulk_auto_match(&pool, user).await.unwrap(), 1);

        let unmatched = moneta_storage::get_unmatched_transactions(&pool, user).await.unwrap();
        assert_eq!(unmatched.len(), 2);
    }

    #[tokio::test]
    async fn bulk_on_empty_set_returns_zero() {
        let (_dir, pool) = test_pool().await;
        assert_eq!(bulk_auto_match(&pool, UserId(1)).await.unwrap(), 0);
    }
}
