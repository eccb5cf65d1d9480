//! The core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::{CategoryId, get_category},
    database_id::DatabaseId,
    summary::YearMonth,
    user::UserId,
};

/// The ID of a transaction row.
pub type TransactionId = DatabaseId;

/// Whether money was received or spent.
///
/// Categories carry the same kind: a category typed as income should only
/// ever be referenced by income transactions. That pairing is enforced when
/// transactions are written, not when they are read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The string stored in the database for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Parse a kind from its stored string form.
    ///
    /// Returns `None` for anything other than "income" or "expense".
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned, always non-negative. The
    /// direction is given by `kind`.
    pub amount: Decimal,
    /// Whether this transaction is income or an expense.
    pub kind: TransactionKind,
    /// The calendar date when the transaction happened.
    pub date: Date,
    /// An optional free-text note.
    pub note: Option<String>,
    /// The ID of the category the transaction belongs to.
    pub category_id: CategoryId,
    /// The ID of the user who owns the transaction.
    pub user_id: UserId,
}

/// Parse a user-submitted amount string into an exact decimal.
///
/// Amounts must be non-negative and have at most two decimal places.
/// Binary floating point is never involved, so values such as "10.55" are
/// represented exactly.
///
/// # Errors
///
/// Returns [Error::InvalidAmount] if the string is not a number or violates
/// the constraints above.
pub fn parse_amount(raw: &str) -> Result<Decimal, Error> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| Error::InvalidAmount(raw.to_string()))?;

    if amount.is_sign_negative() || amount.scale() > 2 {
        return Err(Error::InvalidAmount(raw.to_string()));
    }

    Ok(amount)
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
                date TEXT NOT NULL,
                note TEXT,
                category_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id),
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Covers the dashboard and transactions page queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, date)",
        (),
    )?;

    Ok(())
}

/// Convert a database row into a [Transaction].
///
/// Expects the columns `id, amount, kind, date, note, category_id, user_id`
/// in that order.
///
/// # Errors
/// Returns an error if the amount text is not a decimal number or the kind
/// column holds an unknown value.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_amount: String = row.get(1)?;
    let amount = Decimal::from_str(&raw_amount).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("\"{raw_amount}\" is not a decimal amount").into(),
        )
    })?;

    let raw_kind: String = row.get(2)?;
    let kind = TransactionKind::from_str(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("\"{raw_kind}\" is not a transaction kind").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        amount,
        kind,
        date: row.get(3)?,
        note: row.get(4)?,
        category_id: row.get(5)?,
        user_id: UserId::new(row.get(6)?),
    })
}

/// Convert row-mapping failures into the data-integrity error, instead of
/// reporting them as generic SQL errors.
fn into_record_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            Error::InvalidTransactionRecord(source.to_string())
        }
        error => error.into(),
    }
}

const TRANSACTION_COLUMNS: &str = "id, amount, kind, date, note, category_id, user_id";

/// Create a new transaction in the database.
///
/// The category must be visible to the user (their own or a global one) and
/// its kind must match the transaction's kind.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if `category_id` does not refer to a category
///   visible to `user_id`, or the category's kind does not match `kind`,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    amount: Decimal,
    kind: TransactionKind,
    date: Date,
    note: Option<&str>,
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let category = get_category(category_id, user_id, connection).map_err(|error| match error {
        // A 'not found' error does not make sense on an insert function, so
        // we instead indicate that the category id (a foreign key) is
        // invalid.
        Error::NotFound => Error::InvalidCategory(Some(category_id)),
        error => error,
    })?;

    if category.kind != kind {
        return Err(Error::InvalidCategory(Some(category_id)));
    }

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (amount, kind, date, note, category_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_one(
            (
                amount.to_string(),
                kind.as_str(),
                date,
                note,
                category_id,
                user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(into_record_error)
}

/// Retrieve a transaction owned by `user_id` from the database by its `id`.
///
/// Transactions owned by other users are reported as not found.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by the
///   user,
/// - [Error::InvalidTransactionRecord] if the stored record is malformed,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE id = :id AND user_id = :user_id"
        ))?
        .query_one(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_transaction_row,
        )
        .map_err(into_record_error)
}

/// Optional filters applied when listing transactions.
///
/// All filtering happens in the store query. The monthly summary aggregator
/// never re-filters: it trusts that the rows handed to it have already been
/// restricted to one user and one month.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    /// Keep only transactions whose date falls within this month.
    pub month: Option<YearMonth>,
    /// Keep only transactions of this kind.
    pub kind: Option<TransactionKind>,
    /// Keep only transactions belonging to this category.
    pub category_id: Option<CategoryId>,
    /// Keep only transactions whose note contains this text.
    pub search: Option<String>,
}

/// Retrieve the transactions owned by `user_id` that match `filter`,
/// ordered by date descending (newest first) and then by ID descending so
/// the order stays stable within a day.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidTransactionRecord] if a stored record is malformed,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_transactions(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE user_id = ?1");
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id.as_i64())];

    if let Some(month) = &filter.month {
        // Month membership means the date's year and month both equal the
        // requested ones, the same rule as `YearMonth::contains`.
        sql.push_str(&format!(
            " AND strftime('%Y-%m', date) = ?{}",
            params.len() + 1
        ));
        params.push(Box::new(month.to_string()));
    }
    if let Some(kind) = filter.kind {
        sql.push_str(&format!(" AND kind = ?{}", params.len() + 1));
        params.push(Box::new(kind.as_str()));
    }
    if let Some(category_id) = filter.category_id {
        sql.push_str(&format!(" AND category_id = ?{}", params.len() + 1));
        params.push(Box::new(category_id));
    }
    if let Some(search) = &filter.search {
        sql.push_str(&format!(" AND note LIKE ?{} ESCAPE '\\'", params.len() + 1));
        let escaped = search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        params.push(Box::new(format!("%{escaped}%")));
    }

    sql.push_str(" ORDER BY date DESC, id DESC");

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|param| param.as_ref()).collect();

    connection
        .prepare(&sql)?
        .query_map(params_ref.as_slice(), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(into_record_error))
        .collect()
}

/// Update the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::UpdateMissingTransaction] if `id` does not refer to a
///   transaction owned by the user,
/// - [Error::InvalidCategory] if the new category is not visible to the
///   user or its kind does not match,
/// - [Error::SqlError] if there is some other SQL error.
#[allow(clippy::too_many_arguments)]
pub fn update_transaction(
    id: TransactionId,
    amount: Decimal,
    kind: TransactionKind,
    date: Date,
    note: Option<&str>,
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let category = get_category(category_id, user_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory(Some(category_id)),
        error => error,
    })?;

    if category.kind != kind {
        return Err(Error::InvalidCategory(Some(category_id)));
    }

    let rows_updated = connection.execute(
        "UPDATE \"transaction\"
         SET amount = ?1, kind = ?2, date = ?3, note = ?4, category_id = ?5
         WHERE id = ?6 AND user_id = ?7",
        (
            amount.to_string(),
            kind.as_str(),
            date,
            note,
            category_id,
            id,
            user_id.as_i64(),
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete the transaction `id` owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingTransaction] if `id` does not refer to a
///   transaction owned by the user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}


#[cfg(test)]
mod parse_amount_tests {
    use rust_decimal_macros::dec;

    use crate::Error;

    use super::parse_amount;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(parse_amount("100"), Ok(dec!(100)));
        assert_eq!(parse_amount("10.55"), Ok(dec!(10.55)));
        assert_eq!(parse_amount(" 0.01 "), Ok(dec!(0.01)));
        assert_eq!(parse_amount("0"), Ok(dec!(0)));
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(matches!(parse_amount("-1"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn rejects_more_than_two_decimal_places() {
        assert!(matches!(parse_amount("1.005"), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn rejects_non_numeric_input() {
        assert!(matches!(
            parse_amount("ten dollars"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(parse_amount(""), Err(Error::InvalidAmount(_))));
    }
}

#[cfg(test)]
mod transaction_db_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        category::{Category, create_category},
        db::initialize,
        email::Email,
        password::PasswordHash,
        summary::YearMonth,
        user::{Role, User, create_user},
    };

    use super::{
        TransactionFilter, TransactionKind, create_transaction, delete_transaction,
        get_transaction, get_transactions, update_transaction,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn insert_user_and_categories(conn: &Connection) -> (User, Category, Category) {
        let user = create_user(
            "Alice",
            Email::new_unchecked("alice@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            conn,
        )
        .unwrap();

        let salary =
            create_category("Salary", TransactionKind::Income, Some(user.id), conn).unwrap();
        let food = create_category("Food", TransactionKind::Expense, Some(user.id), conn).unwrap();

        (user, salary, food)
    }

    #[test]
    fn create_transaction_succeeds() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);

        let transaction = create_transaction(
            dec!(1500.00),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            Some("May salary"),
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.amount, dec!(1500.00));
        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.note.as_deref(), Some("May salary"));
        assert_eq!(transaction.user_id, user.id);
    }

    #[test]
    fn create_transaction_fails_with_unknown_category() {
        let conn = get_test_connection();
        let (user, _, _) = insert_user_and_categories(&conn);

        let result = create_transaction(
            dec!(10),
            TransactionKind::Expense,
            date!(2024 - 05 - 01),
            None,
            1337,
            user.id,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(1337))));
    }

    #[test]
    fn create_transaction_fails_with_someone_elses_category() {
        let conn = get_test_connection();
        let (_, salary, _) = insert_user_and_categories(&conn);

        let other_user = create_user(
            "Bob",
            Email::new_unchecked("bob@example.com"),
            PasswordHash::new_unchecked("hunter3"),
            Role::User,
            &conn,
        )
        .unwrap();

        let result = create_transaction(
            dec!(10),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            other_user.id,
            &conn,
        );

        // The error must not reveal that the category exists and belongs to
        // someone else.
        assert_eq!(result, Err(Error::InvalidCategory(Some(salary.id))));
    }

    #[test]
    fn create_transaction_fails_with_mismatched_kind() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);

        let result = create_transaction(
            dec!(10),
            TransactionKind::Expense,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            user.id,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(salary.id))));
    }

    #[test]
    fn get_transaction_scopes_by_owner() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);
        let transaction = create_transaction(
            dec!(42),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();

        let other_user = create_user(
            "Bob",
            Email::new_unchecked("bob@example.com"),
            PasswordHash::new_unchecked("hunter3"),
            Role::User,
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transaction(transaction.id, user.id, &conn).unwrap(),
            transaction
        );
        assert_eq!(
            get_transaction(transaction.id, other_user.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_transactions_applies_filters() {
        let conn = get_test_connection();
        let (user, salary, food) = insert_user_and_categories(&conn);

        create_transaction(
            dec!(1500),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            Some("May salary"),
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();
        create_transaction(
            dec!(20.50),
            TransactionKind::Expense,
            date!(2024 - 05 - 02),
            Some("groceries"),
            food.id,
            user.id,
            &conn,
        )
        .unwrap();
        create_transaction(
            dec!(18),
            TransactionKind::Expense,
            date!(2024 - 06 - 02),
            Some("more groceries"),
            food.id,
            user.id,
            &conn,
        )
        .unwrap();

        let may = YearMonth::parse("2024-05").unwrap();

        let in_may = get_transactions(
            user.id,
            &TransactionFilter {
                month: Some(may),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(in_may.len(), 2);

        let expenses_in_may = get_transactions(
            user.id,
            &TransactionFilter {
                month: Some(may),
                kind: Some(TransactionKind::Expense),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(expenses_in_may.len(), 1);
        assert_eq!(expenses_in_may[0].amount, dec!(20.50));

        let by_category = get_transactions(
            user.id,
            &TransactionFilter {
                category_id: Some(food.id),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(by_category.len(), 2);

        let by_search = get_transactions(
            user.id,
            &TransactionFilter {
                search: Some("grocer".to_string()),
                ..Default::default()
            },
            &conn,
        )
        .unwrap();
        assert_eq!(by_search.len(), 2);
    }

    #[test]
    fn get_transactions_orders_newest_first() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);

        for day in [1, 3, 2] {
            create_transaction(
                dec!(1),
                TransactionKind::Income,
                date!(2024 - 05 - 01).replace_day(day).unwrap(),
                None,
                salary.id,
                user.id,
                &conn,
            )
            .unwrap();
        }

        let transactions = get_transactions(user.id, &TransactionFilter::default(), &conn).unwrap();
        let days: Vec<u8> = transactions
            .iter()
            .map(|transaction| transaction.date.day())
            .collect();

        assert_eq!(days, vec![3, 2, 1]);
    }

    #[test]
    fn update_transaction_changes_fields() {
        let conn = get_test_connection();
        let (user, salary, food) = insert_user_and_categories(&conn);
        let transaction = create_transaction(
            dec!(42),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();

        update_transaction(
            transaction.id,
            dec!(13.37),
            TransactionKind::Expense,
            date!(2024 - 05 - 02),
            Some("corrected"),
            food.id,
            user.id,
            &conn,
        )
        .unwrap();

        let updated = get_transaction(transaction.id, user.id, &conn).unwrap();
        assert_eq!(updated.amount, dec!(13.37));
        assert_eq!(updated.kind, TransactionKind::Expense);
        assert_eq!(updated.note.as_deref(), Some("corrected"));
        assert_eq!(updated.category_id, food.id);
    }

    #[test]
    fn update_transaction_fails_for_missing_row() {
        let conn = get_test_connection();
        let (user, _, food) = insert_user_and_categories(&conn);

        let result = update_transaction(
            1337,
            dec!(1),
            TransactionKind::Expense,
            date!(2024 - 05 - 01),
            None,
            food.id,
            user.id,
            &conn,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_transaction_removes_row() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);
        let transaction = create_transaction(
            dec!(42),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();

        delete_transaction(transaction.id, user.id, &conn).unwrap();

        assert_eq!(
            get_transaction(transaction.id, user.id, &conn),
            Err(Error::NotFound)
        );
        assert_eq!(
            delete_transaction(transaction.id, user.id, &conn),
            Err(Error::DeleteMissingTransaction)
        );
    }

    #[test]
    fn malformed_stored_amount_is_reported() {
        let conn = get_test_connection();
        let (user, salary, _) = insert_user_and_categories(&conn);
        let transaction = create_transaction(
            dec!(42),
            TransactionKind::Income,
            date!(2024 - 05 - 01),
            None,
            salary.id,
            user.id,
            &conn,
        )
        .unwrap();

        // Corrupt the stored amount behind the domain layer's back.
        conn.execute(
            "UPDATE \"transaction\" SET amount = 'not a number' WHERE id = ?1",
            (transaction.id,),
        )
        .unwrap();

        let result = get_transaction(transaction.id, user.id, &conn);

        assert!(matches!(result, Err(Error::InvalidTransactionRecord(_))));
    }
}
