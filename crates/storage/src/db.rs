use std::path::Path;

use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;

use moneta_core::{
    AccountId, Budget, BudgetEntry, BudgetId, CategoryId, EntryId, EntryType, Frequency,
    MatchConfidence, MatchingRules, Money, ScheduleError, Transaction, TransactionId, UserId,
};

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    InvalidSchedule(#[from] ScheduleError),
    #[error("failed to encode matching rules: {0}")]
    Rules(#[from] serde_json::Error),
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS budgets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS budget_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL,
            category_id INTEGER,
            name TEXT NOT NULL,
            description TEXT,
            amount_cents INTEGER NOT NULL,
            entry_type TEXT NOT NULL,
            frequency TEXT NOT NULL,
            day_of_month INTEGER,
            day_of_week INTEGER,
            start_date TEXT NOT NULL,
            end_date TEXT,
            matching_rules TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
            FOREIGN KEY (category_id) REFERENCES categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            category_id INTEGER,
            budget_entry_id INTEGER,
            amount_cents INTEGER NOT NULL,
            transaction_type TEXT NOT NULL,
            description TEXT,
            transaction_date TEXT NOT NULL,
            notes TEXT,
            match_confidence TEXT NOT NULL DEFAULT 'unmatched',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (account_id) REFERENCES accounts(id),
            FOREIGN KEY (category_id) REFERENCES categories(id),
            FOREIGN KEY (budget_entry_id) REFERENCES budget_entries(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Accounts & categories
// ---------------------------------------------------------------------------

pub async fn create_account(
    pool: &DbPool,
    user_id: UserId,
    name: &str,
) -> Result<AccountId, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("INSERT INTO accounts (user_id, name) VALUES (?, ?) RETURNING id")
        .bind(user_id.0)
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(AccountId(row.0))
}

pub async fn create_category(
    pool: &DbPool,
    user_id: UserId,
    name: &str,
) -> Result<CategoryId, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("INSERT INTO categories (user_id, name) VALUES (?, ?) RETURNING id")
            .bind(user_id.0)
            .bind(name)
            .fetch_one(pool)
            .await?;
    Ok(CategoryId(row.0))
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

type BudgetRow = (i64, i64, String, Option<String>, i64);

fn budget_from_row(row: BudgetRow) -> Budget {
    Budget {
        id: BudgetId(row.0),
        user_id: UserId(row.1),
        name: row.2,
        description: row.3,
        is_active: row.4 != 0,
    }
}

/// Creates a budget. Activating it deactivates any other budget the user
/// has, keeping at most one active budget per user.
pub async fn create_budget(
    pool: &DbPool,
    user_id: UserId,
    name: &str,
    description: Option<&str>,
    is_active: bool,
) -> Result<Budget, sqlx::Error> {
    if is_active {
        sqlx::query("UPDATE budgets SET is_active = 0 WHERE user_id = ?")
            .bind(user_id.0)
            .execute(pool)
            .await?;
    }

    let row: BudgetRow = sqlx::query_as(
        "INSERT INTO budgets (user_id, name, description, is_active) VALUES (?, ?, ?, ?)
         RETURNING id, user_id, name, description, is_active",
    )
    .bind(user_id.0)
    .bind(name)
    .bind(description)
    .bind(is_active)
    .fetch_one(pool)
    .await?;

    Ok(budget_from_row(row))
}

pub async fn get_budget(
    pool: &DbPool,
    id: BudgetId,
    user_id: UserId,
) -> Result<Option<Budget>, sqlx::Error> {
    let row: Option<BudgetRow> = sqlx::query_as(
        "SELECT id, user_id, name, description, is_active FROM budgets WHERE id = ? AND user_id = ?",
    )
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(budget_from_row))
}

pub async fn get_active_budget(
    pool: &DbPool,
    user_id: UserId,
) -> Result<Option<Budget>, sqlx::Error> {
    let row: Option<BudgetRow> = sqlx::query_as(
        "SELECT id, user_id, name, description, is_active FROM budgets
         WHERE user_id = ? AND is_active = 1
         ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(budget_from_row))
}

// ---------------------------------------------------------------------------
// Budget entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewBudgetEntry {
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
}

type EntryRow = (
    i64,
    i64,
    Option<i64>,
    String,
    Option<String>,
    i64,
    String,
    String,
    Option<i64>,
    Option<i64>,
    String,
    Option<String>,
    Option<String>,
    i64,
);

const ENTRY_COLUMNS: &str = "id, budget_id, category_id, name, description, amount_cents, \
     entry_type, frequency, day_of_month, day_of_week, start_date, end_date, \
     matching_rules, is_active";

/// Decodes an entry row. Rows with an unreadable type, frequency, or date
/// fail closed: they are dropped from results with a warning rather than
/// aborting the query. Unreadable matching rules degrade to no rules.
fn entry_from_row(row: EntryRow) -> Option<BudgetEntry> {
    let (
        id,
        budget_id,
        category_id,
        name,
        description,
        amount_cents,
        entry_type,
        frequency,
        day_of_month,
        day_of_week,
        start_date,
        end_date,
        rules_json,
        is_active,
    ) = row;

    let entry_type: EntryType = match entry_type.parse() {
        Ok(t) => t,
        Err(err) => {
            tracing::warn!(entry = id, error = %err, "skipping unreadable budget entry");
            return None;
        }
    };
    let frequency: Frequency = match frequency.parse() {
        Ok(f) => f,
        Err(err) => {
            tracing::warn!(entry = id, error = %err, "skipping unreadable budget entry");
            return None;
        }
    };
    let start_date = match NaiveDate::parse_from_str(&start_date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(err) => {
            tracing::warn!(entry = id, error = %err, "skipping budget entry with bad start date");
            return None;
        }
    };
    let end_date = match end_date {
        None => None,
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(err) => {
                tracing::warn!(entry = id, error = %err, "skipping budget entry with bad end date");
                return None;
            }
        },
    };
    let matching_rules = rules_json.and_then(|raw| match serde_json::from_str(&raw) {
        Ok(rules) => Some(rules),
        Err(err) => {
            tracing::warn!(entry = id, error = %err, "ignoring unreadable matching rules");
            None
        }
    });

    Some(BudgetEntry {
        id: EntryId(id),
        budget_id: BudgetId(budget_id),
        category_id: category_id.map(CategoryId),
        name,
        description,
        amount: Money::from_cents(amount_cents),
        entry_type,
        frequency,
        day_of_month: day_of_month.map(|d| d as u32),
        day_of_week: day_of_week.map(|d| d as u32),
        start_date,
        end_date,
        matching_rules,
        is_active: is_active != 0,
    })
}

pub async fn create_entry(
    pool: &DbPool,
    user_id: UserId,
    new: NewBudgetEntry,
) -> Result<BudgetEntry, StorageError> {
    moneta_core::budget::validate_schedule(
        new.day_of_month,
        new.day_of_week,
        new.start_date,
        new.end_date,
    )?;

    if get_budget(pool, new.budget_id, user_id).await?.is_none() {
        return Err(StorageError::Db(sqlx::Error::RowNotFound));
    }

    let rules_json = match &new.matching_rules {
        Some(rules) => Some(serde_json::to_string(rules)?),
        None => None,
    };

    let row: EntryRow = sqlx::query_as(&format!(
        "INSERT INTO budget_entries
             (budget_id, category_id, name, description, amount_cents, entry_type,
              frequency, day_of_month, day_of_week, start_date, end_date, matching_rules)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING {ENTRY_COLUMNS}"
    ))
    .bind(new.budget_id.0)
    .bind(new.category_id.map(|c| c.0))
    .bind(&new.name)
    .bind(&new.description)
    .bind(new.amount.to_cents())
    .bind(new.entry_type.as_str())
    .bind(new.frequency.as_str())
    .bind(new.day_of_month.map(i64::from))
    .bind(new.day_of_week.map(i64::from))
    .bind(new.start_date.to_string())
    .bind(new.end_date.map(|d| d.to_string()))
    .bind(rules_json)
    .fetch_one(pool)
    .await
    .map_err(StorageError::Db)?;

    entry_from_row(row).ok_or(StorageError::Db(sqlx::Error::RowNotFound))
}

pub async fn get_entry(
    pool: &DbPool,
    id: EntryId,
    user_id: UserId,
) -> Result<Option<BudgetEntry>, sqlx::Error> {
    let row: Option<EntryRow> = sqlx::query_as(&format!(
        "SELECT {ENTRY_COLUMNS} FROM budget_entries
         WHERE id = ? AND budget_id IN (SELECT id FROM budgets WHERE user_id = ?)"
    ))
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(entry_from_row))
}

/// Active entries of a budget the user owns, in creation order.
pub async fn get_active_entries(
    pool: &DbPool,
    budget_id: BudgetId,
    user_id: UserId,
) -> Result<Vec<BudgetEntry>, sqlx::Error> {
    let rows: Vec<EntryRow> = sqlx::query_as(&format!(
        "SELECT {ENTRY_COLUMNS} FROM budget_entries
         WHERE budget_id = ? AND is_active = 1
           AND budget_id IN (SELECT id FROM budgets WHERE user_id = ?)
         ORDER BY id"
    ))
    .bind(budget_id.0)
    .bind(user_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(entry_from_row).collect())
}

/// Replaces the entry's matching rules wholesale.
pub async fn update_matching_rules(
    pool: &DbPool,
    id: EntryId,
    user_id: UserId,
    rules: &MatchingRules,
) -> Result<Option<BudgetEntry>, StorageError> {
    let rules_json = serde_json::to_string(rules)?;

    let row: Option<EntryRow> = sqlx::query_as(&format!(
        "UPDATE budget_entries SET matching_rules = ?
         WHERE id = ? AND budget_id IN (SELECT id FROM budgets WHERE user_id = ?)
         RETURNING {ENTRY_COLUMNS}"
    ))
    .bind(rules_json)
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await
    .map_err(StorageError::Db)?;

    Ok(row.and_then(entry_from_row))
}

/// Soft delete: clears the active flag, the entry row is preserved.
pub async fn deactivate_entry(
    pool: &DbPool,
    id: EntryId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE budget_entries SET is_active = 0
         WHERE id = ? AND budget_id IN (SELECT id FROM budgets WHERE user_id = ?)",
    )
    .bind(id.0)
    .bind(user_id.0)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub amount: Money,
    pub transaction_type: EntryType,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub notes: Option<String>,
}

type TransactionRow = (
    i64,
    i64,
    i64,
    Option<i64>,
    Option<i64>,
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    String,
);

const TRANSACTION_COLUMNS: &str = "id, user_id, account_id, category_id, budget_entry_id, \
     amount_cents, transaction_type, description, transaction_date, notes, match_confidence";

fn transaction_from_row(row: TransactionRow) -> Option<Transaction> {
    let (
        id,
        user_id,
        account_id,
        category_id,
        budget_entry_id,
        amount_cents,
        transaction_type,
        description,
        transaction_date,
        notes,
        match_confidence,
    ) = row;

    let transaction_type: EntryType = match transaction_type.parse() {
        Ok(t) => t,
        Err(err) => {
            tracing::warn!(transaction = id, error = %err, "skipping unreadable transaction");
            return None;
        }
    };
    let transaction_date = match NaiveDate::parse_from_str(&transaction_date, "%Y-%m-%d") {
        Ok(d) => d,
        Err(err) => {
            tracing::warn!(transaction = id, error = %err, "skipping transaction with bad date");
            return None;
        }
    };
    let match_confidence: MatchConfidence = match match_confidence.parse() {
        Ok(c) => c,
        Err(err) => {
            tracing::warn!(transaction = id, error = %err, "skipping unreadable transaction");
            return None;
        }
    };

    Some(Transaction {
        id: TransactionId(id),
        user_id: UserId(user_id),
        account_id: AccountId(account_id),
        category_id: category_id.map(CategoryId),
        budget_entry_id: budget_entry_id.map(EntryId),
        amount: Money::from_cents(amount_cents),
        transaction_type,
        description,
        transaction_date,
        notes,
        match_confidence,
    })
}

pub async fn insert_transaction(
    pool: &DbPool,
    new: NewTransaction,
) -> Result<Transaction, sqlx::Error> {
    let row: TransactionRow = sqlx::query_as(&format!(
        "INSERT INTO transactions
             (user_id, account_id, category_id, amount_cents, transaction_type,
              description, transaction_date, notes, match_confidence)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'unmatched')
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(new.user_id.0)
    .bind(new.account_id.0)
    .bind(new.category_id.map(|c| c.0))
    .bind(new.amount.to_cents())
    .bind(new.transaction_type.as_str())
    .bind(&new.description)
    .bind(new.transaction_date.to_string())
    .bind(&new.notes)
    .fetch_one(pool)
    .await?;

    transaction_from_row(row).ok_or(sqlx::Error::RowNotFound)
}

pub async fn get_transaction(
    pool: &DbPool,
    id: TransactionId,
    user_id: UserId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ? AND user_id = ?"
    ))
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(transaction_from_row))
}

pub async fn get_unmatched_transactions(
    pool: &DbPool,
    user_id: UserId,
) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE user_id = ? AND match_confidence = 'unmatched'
         ORDER BY transaction_date, id"
    ))
    .bind(user_id.0)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(transaction_from_row).collect())
}

/// Links a transaction to a budget entry. `confidence` records how the link
/// was made and must not be `Unmatched`; use [`unlink_transaction`] to clear
/// a link.
pub async fn link_transaction(
    pool: &DbPool,
    id: TransactionId,
    user_id: UserId,
    entry_id: EntryId,
    confidence: MatchConfidence,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "UPDATE transactions SET budget_entry_id = ?, match_confidence = ?
         WHERE id = ? AND user_id = ?
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(entry_id.0)
    .bind(confidence.as_str())
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(transaction_from_row))
}

pub async fn unlink_transaction(
    pool: &DbPool,
    id: TransactionId,
    user_id: UserId,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "UPDATE transactions SET budget_entry_id = NULL, match_confidence = 'unmatched'
         WHERE id = ? AND user_id = ?
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(transaction_from_row))
}

pub async fn set_transaction_category(
    pool: &DbPool,
    id: TransactionId,
    user_id: UserId,
    category_id: Option<CategoryId>,
) -> Result<Option<Transaction>, sqlx::Error> {
    let row: Option<TransactionRow> = sqlx::query_as(&format!(
        "UPDATE transactions SET category_id = ?
         WHERE id = ? AND user_id = ?
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(category_id.map(|c| c.0))
    .bind(id.0)
    .bind(user_id.0)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(transaction_from_row))
}

/// Hard delete, unlike the soft delete used for budget entries.
pub async fn delete_transaction(
    pool: &DbPool,
    id: TransactionId,
    user_id: UserId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
        .bind(id.0)
        .bind(user_id.0)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
