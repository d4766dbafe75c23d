use thiserror::Error;

use moneta_core::{BudgetId, EntryId, TransactionId};
use moneta_storage::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),
    #[error("budget entry {0} not found")]
    EntryNotFound(EntryId),
    #[error("budget {0} not found")]
    BudgetNotFound(BudgetId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(StorageError::Db(err))
    }
}
