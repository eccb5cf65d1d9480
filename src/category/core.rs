//! The core data model and database queries for categories.
//!
//! Categories come in two flavours: rows owned by a user, and global rows
//! with no owner that every account can use. Users can read global
//! categories but only administrators manage them.

use rusqlite::{Connection, Row, types::Type};

use crate::{Error, database_id::DatabaseId, transaction::TransactionKind, user::UserId};

/// The ID of a category row.
pub type CategoryId = DatabaseId;

/// A label that transactions are grouped under, such as "Groceries".
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The display name of the category.
    pub name: String,
    /// The kind of transactions this category applies to.
    pub kind: TransactionKind,
    /// The user who owns the category, or `None` for a global category.
    pub user_id: Option<UserId>,
}

impl Category {
    /// Whether this category is available to every account.
    pub fn is_global(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Create the category table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL
/// error.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('income', 'expense')),
                user_id INTEGER,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_kind: String = row.get(2)?;
    let kind = TransactionKind::from_str(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("\"{raw_kind}\" is not a transaction kind").into(),
        )
    })?;

    let user_id: Option<i64> = row.get(3)?;

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        user_id: user_id.map(UserId::new),
    })
}

const CATEGORY_COLUMNS: &str = "id, name, kind, user_id";

/// Create a category in the database.
///
/// Pass `owner: None` to create a global category available to everyone.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategoryName] if `name` is empty or all whitespace,
/// - [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    name: &str,
    kind: TransactionKind,
    owner: Option<UserId>,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyCategoryName);
    }

    connection
        .prepare(&format!(
            "INSERT INTO category (name, kind, user_id) VALUES (?1, ?2, ?3)
             RETURNING {CATEGORY_COLUMNS}"
        ))?
        .query_one(
            (name, kind.as_str(), owner.map(|user_id| user_id.as_i64())),
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the category `id` if it is visible to `user_id`, meaning the
/// user owns it or it is global.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a category visible to the
///   user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn get_category(
    id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category
             WHERE id = :id AND (user_id = :user_id OR user_id IS NULL)"
        ))?
        .query_one(
            &[(":id", &id), (":user_id", &user_id.as_i64())],
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve the categories visible to `user_id`: their own plus the global
/// ones, optionally restricted to one kind, ordered by name.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_categories(
    user_id: UserId,
    kind: Option<TransactionKind>,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let mut sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM category
         WHERE (user_id = ?1 OR user_id IS NULL)"
    );
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(user_id.as_i64())];

    if let Some(kind) = kind {
        sql.push_str(&format!(" AND kind = ?{}", params.len() + 1));
        params.push(Box::new(kind.as_str()));
    }

    sql.push_str(" ORDER BY name ASC");

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|param| param.as_ref()).collect();

    connection
        .prepare(&sql)?
        .query_map(params_ref.as_slice(), map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update the name and kind of the category `id` owned by `user_id`.
///
/// Global categories cannot be edited through this function.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategoryName] if `name` is empty or all whitespace,
/// - [Error::UpdateMissingCategory] if `id` does not refer to a category
///   owned by the user,
/// - [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    id: CategoryId,
    name: &str,
    kind: TransactionKind,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyCategoryName);
    }

    let rows_updated = connection.execute(
        "UPDATE category SET name = ?1, kind = ?2 WHERE id = ?3 AND user_id = ?4",
        (name, kind.as_str(), id, user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete the category `id` owned by `user_id`.
///
/// Global categories cannot be deleted through this function.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingCategory] if `id` does not refer to a category
///   owned by the user,
/// - [Error::CategoryInUse] if transactions still reference the category,
/// - [Error::SqlError] if there is some other SQL error.
pub fn delete_category(
    id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection
        .execute(
            "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::CategoryInUse
            }
            error => error.into(),
        })?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}
