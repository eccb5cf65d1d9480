//! Database initialization.

use rusqlite::Connection;

use crate::{
    Error,
    category::create_category_table,
    transaction::{TransactionKind, create_transaction_table},
    user::create_user_table,
};

/// The global categories seeded into a fresh database.
///
/// These are owned by no user, so every account can use them.
const DEFAULT_CATEGORIES: [(&str, TransactionKind); 6] = [
    ("Salary", TransactionKind::Income),
    ("Bonus", TransactionKind::Income),
    ("Groceries", TransactionKind::Expense),
    ("Rent", TransactionKind::Expense),
    ("Transport", TransactionKind::Expense),
    ("Utilities", TransactionKind::Expense),
];

/// Initialize the database schema and seed the default global categories.
///
/// Safe to call on every start-up: tables are only created when missing and
/// the default categories are only inserted into an empty category table.
///
/// # Errors
///
/// This function will return an error if the SQL queries fail.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    create_user_table(connection)?;
    create_category_table(connection)?;
    create_transaction_table(connection)?;

    seed_default_categories(connection)?;

    Ok(())
}

fn seed_default_categories(connection: &Connection) -> Result<(), Error> {
    let global_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE user_id IS NULL",
        [],
        |row| row.get(0),
    )?;

    if global_count > 0 {
        return Ok(());
    }

    let mut statement =
        connection.prepare("INSERT INTO category (name, kind, user_id) VALUES (?1, ?2, NULL)")?;

    for (name, kind) in DEFAULT_CATEGORIES {
        statement.execute((name, kind.as_str()))?;
    }

    Ok(())
}
