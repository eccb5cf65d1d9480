//! Income and expense transactions.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model, amount parsing, and database functions
//! - The page listing and filtering the user's transactions
//! - The pages and endpoints for creating, editing, and deleting
//!   transactions

mod core;
mod create;
mod delete;
mod edit;
mod transactions_page;

pub use core::{
    Transaction, TransactionFilter, TransactionId, TransactionKind, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, get_transactions,
    parse_amount, update_transaction,
};
pub use create::{create_transaction_endpoint, get_new_transaction_page};
pub use delete::delete_transaction_endpoint;
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use transactions_page::get_transactions_page;
