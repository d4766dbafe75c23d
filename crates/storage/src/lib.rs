pub mod db;

pub use db::{
    create_account, create_budget, create_category, create_db, create_entry,
    deactivate_entry, delete_transaction, get_active_budget, get_active_entries,
    get_budget, get_entry, get_transaction, get_unmatched_transactions,
    insert_transaction, link_transaction, set_transaction_category, unlink_transaction,
    update_matching_rules, DbPool, NewBudgetEntry, NewTransaction, StorageError,
};
