//! The user model and database functions for user accounts.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, email::Email, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors, and more flexible generics that can have
/// distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a user account, which controls access to the admin pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular user who can only see their own data.
    User,
    /// An administrator who can additionally manage user accounts.
    Admin,
}

impl Role {
    /// The string stored in the database for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from its stored string form.
    ///
    /// Returns `None` for anything other than "user" or "admin".
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address, unique across all accounts.
    pub email: Email,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's role.
    pub role: Role,
    /// The file name of the user's uploaded avatar image, if any.
    pub avatar: Option<String>,
}

impl User {
    /// Whether this user may access the admin pages.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK(role IN ('user', 'admin')),
                avatar TEXT,
                otp TEXT,
                otp_expires_at TEXT
                )",
        (),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_role: String = row.get(4)?;
    let role = Role::from_str(&raw_role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown role \"{raw_role}\"").into(),
        )
    })?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        email: Email::new_unchecked(&row.get::<_, String>(2)?),
        password_hash: PasswordHash::new_unchecked(&row.get::<_, String>(3)?),
        role,
        avatar: row.get(5)?,
    })
}

const USER_COLUMNS: &str = "id, name, email, password, role, avatar";

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns [Error::EmailTaken] if the email address is already registered,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    name: &str,
    email: Email,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    let user = connection
        .prepare(&format!(
            "INSERT INTO user (name, email, password, role) VALUES (?1, ?2, ?3, ?4)
             RETURNING {USER_COLUMNS}"
        ))?
        .query_one(
            (name, email.as_ref(), password_hash.as_ref(), role.as_str()),
            map_user_row,
        )?;

    Ok(user)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_one(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with the given email address.
///
/// # Errors
///
/// This function will return an error if:
/// - no registered user has the email address,
/// - there was an error trying to access the database.
pub fn get_user_by_email(email: &Email, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE email = :email"))?
        .query_one(&[(":email", &email.as_ref())], map_user_row)
        .map_err(|error| error.into())
}

/// Get every user account, ordered by ID.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn get_all_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user ORDER BY id ASC"))?
        .query_map([], map_user_row)?
        .map(|maybe_user| maybe_user.map_err(|error| error.into()))
        .collect()
}

/// Update the name and email of the user `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::UpdateMissingUser] if `user_id` does not refer to a user,
/// - [Error::EmailTaken] if another account already uses `email`,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn update_profile(
    user_id: UserId,
    name: &str,
    email: &Email,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET name = ?1, email = ?2 WHERE id = ?3",
        (name, email.as_ref(), user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Set the avatar file name for the user `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if `user_id` does not refer to a user,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn set_avatar(user_id: UserId, file_name: &str, connection: &Connection) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET avatar = ?1 WHERE id = ?2",
        (file_name, user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Update the name, email, and role of the user `user_id` (admin operation).
///
/// # Errors
///
/// Returns:
/// - [Error::UpdateMissingUser] if `user_id` does not refer to a user,
/// - [Error::EmailTaken] if another account already uses `email`,
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn update_user(
    user_id: UserId,
    name: &str,
    email: &Email,
    role: Role,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET name = ?1, email = ?2, role = ?3 WHERE id = ?4",
        (name, email.as_ref(), role.as_str(), user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Delete the user `user_id` along with their categories and transactions.
///
/// # Errors
///
/// Returns [Error::DeleteMissingUser] if `user_id` does not refer to a user,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn delete_user(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_deleted =
        connection.execute("DELETE FROM user WHERE id = ?1", (user_id.as_i64(),))?;

    if rows_deleted == 0 {
        return Err(Error::DeleteMissingUser);
    }

    Ok(())
}

/// Replace the password hash of the user `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if `user_id` does not refer to a user,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn set_password(
    user_id: UserId,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Store a password reset code and its expiry time for the user `user_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingUser] if `user_id` does not refer to a user,
/// or [Error::SqlError] if some other SQL related error occurred.
pub fn set_otp(
    user_id: UserId,
    otp: &str,
    expires_at: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_updated = connection.execute(
        "UPDATE user SET otp = ?1, otp_expires_at = ?2 WHERE id = ?3",
        (otp, expires_at, user_id.as_i64()),
    )?;

    if rows_updated == 0 {
        return Err(Error::UpdateMissingUser);
    }

    Ok(())
}

/// Remove the stored password reset code for the user `user_id`, if any.
///
/// # Errors
///
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn clear_otp(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE user SET otp = NULL, otp_expires_at = NULL WHERE id = ?1",
        (user_id.as_i64(),),
    )?;

    Ok(())
}

/// Check a submitted password reset code against the stored one for the user
/// `user_id`.
///
/// `now` is passed in rather than read from the clock so that expiry
/// behaviour can be tested deterministically.
///
/// # Errors
///
/// Returns:
/// - [Error::OtpMissing] if no reset code has been stored,
/// - [Error::OtpExpired] if the stored code has passed its expiry,
/// - [Error::OtpMismatch] if `submitted_otp` does not match the stored code,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn verify_otp(
    user_id: UserId,
    submitted_otp: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<(), Error> {
    let (otp, expires_at): (Option<String>, Option<OffsetDateTime>) = connection
        .prepare("SELECT otp, otp_expires_at FROM user WHERE id = :id")?
        .query_one(&[(":id", &user_id.as_i64())], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    let (otp, expires_at) = match (otp, expires_at) {
        (Some(otp), Some(expires_at)) => (otp, expires_at),
        _ => return Err(Error::OtpMissing),
    };

    if expires_at < now {
        return Err(Error::OtpExpired);
    }

    if otp != submitted_otp {
        return Err(Error::OtpMismatch);
    }

    Ok(())
}

/// Ensure that an admin account exists, creating one with the given
/// credentials when the database holds no admin user.
///
/// This is called once at server start so that a fresh deployment can be
/// administered immediately.
///
/// # Errors
///
/// Returns an error if the admin count query or insertion failed.
pub fn ensure_admin_user(
    email: Email,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let admin_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM user WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )?;

    if admin_count > 0 {
        return Ok(());
    }

    let admin = create_user("Admin", email, password_hash, Role::Admin, connection)?;
    tracing::info!("created default admin account {} ({})", admin.email, admin.id);

    Ok(())
}
