//! Spendtrack is a web app for tracking personal income and expenses.
//!
//! This library provides an HTTP server that directly serves HTML pages,
//! along with a small JSON API for monthly summaries.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod category;
mod dashboard;
mod database_id;
mod db;
mod email;
mod endpoints;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod password;
mod routing;
mod summary;
mod transaction;
mod user;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use email::{Email, Mailer, TracingMailer};
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use summary::{DailySummary, MonthlySummary, YearMonth, summarize_month};
pub use user::{Role, User, UserId, ensure_admin_user};

use crate::{
    alert::alert_error,
    category::CategoryId,
    internal_server_error::get_internal_server_error_response,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no auth cookie in the cookie jar")]
    CookieMissing,

    /// The auth token cookie could not be parsed.
    #[error("could not parse the auth token: {0}")]
    InvalidAuthToken(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The string used to create an email address was not a valid email.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The email address already belongs to a registered user.
    #[error("the email address is already in use")]
    EmailTaken,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// The category ID used to create or update a transaction did not match
    /// a category visible to the user.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// A category that still has transactions referencing it cannot be
    /// deleted.
    #[error("the category still has transactions attached to it")]
    CategoryInUse,

    /// A stored transaction record could not be read back into the domain
    /// types, e.g. the amount text is not a decimal number or the kind
    /// column holds an unknown value.
    ///
    /// This indicates a data-integrity problem in the database and is
    /// surfaced instead of silently coercing or skipping the record.
    #[error("invalid transaction record: {0}")]
    InvalidTransactionRecord(String),

    /// A string could not be parsed as a year-month in the format `YYYY-MM`.
    #[error("\"{0}\" is not a valid month, expected the format YYYY-MM")]
    InvalidMonth(String),

    /// A transaction amount was negative or had more than two decimal places.
    #[error("\"{0}\" is not a valid amount, expected a non-negative number with at most 2 decimal places")]
    InvalidAmount(String),

    /// No password reset code has been requested for the account.
    #[error("no reset code was requested for this account")]
    OtpMissing,

    /// The password reset code has passed its expiry time.
    #[error("the reset code has expired, request a new one")]
    OtpExpired,

    /// The submitted password reset code does not match the stored one.
    #[error("the reset code is incorrect")]
    OtpMismatch,

    /// The avatar upload could not be read or written to disk.
    #[error("could not save the uploaded file: {0}")]
    UploadError(String),

    /// An error occurred while handing a message to the mailer.
    #[error("could not send email: {0}")]
    MailError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the
    /// parameters (e.g., ID) are correct and that the resource has been
    /// created. Rows owned by other users are reported as not found rather
    /// than forbidden so that IDs cannot be probed.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON.
    #[error("could not serialize as JSON: {0}")]
    JsonSerializationError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to update a transaction that does not exist.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist.
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist.
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a user that does not exist.
    #[error("tried to update a user that is not in the database")]
    UpdateMissingUser,

    /// Tried to delete a user that does not exist.
    #[error("tried to delete a user that is not in the database")]
    DeleteMissingUser,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("user.email") =>
            {
                Error::EmailTaken
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                alert_error("Log in failed", "The email or password is incorrect."),
            )
                .into_response(),
            error => {
                tracing::error!("an error occurred while handling a request: {error}");
                get_internal_server_error_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an htmx alert fragment with an appropriate
    /// status code, for endpoints that swap the error into an alert
    /// container instead of replacing the page.
    pub fn into_alert_response(self) -> Response {
        match self {
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                alert_error("Log in failed", "The email or password is incorrect."),
            )
                .into_response(),
            Error::EmailTaken => (
                StatusCode::CONFLICT,
                alert_error(
                    "Email already in use",
                    "An account with this email address already exists.",
                ),
            )
                .into_response(),
            Error::InvalidCategory(category_id) => (
                StatusCode::BAD_REQUEST,
                alert_error(
                    "Invalid category",
                    &format!("Could not find a category with the ID {category_id:?}."),
                ),
            )
                .into_response(),
            Error::CategoryInUse => (
                StatusCode::CONFLICT,
                alert_error(
                    "Could not delete category",
                    "The category still has transactions attached to it. \
                    Delete or reassign those transactions first.",
                ),
            )
                .into_response(),
            Error::InvalidAmount(amount) => (
                StatusCode::BAD_REQUEST,
                alert_error(
                    "Invalid amount",
                    &format!(
                        "\"{amount}\" is not a valid amount. Amounts must be non-negative \
                        numbers with at most two decimal places."
                    ),
                ),
            )
                .into_response(),
            Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                alert_error(
                    "Transaction not found",
                    "The transaction could not be found. \
                    Try refreshing the page to see if it has already been deleted.",
                ),
            )
                .into_response(),
            Error::UpdateMissingCategory | Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                alert_error(
                    "Category not found",
                    "The category could not be found. \
                    Try refreshing the page to see if it has already been deleted.",
                ),
            )
                .into_response(),
            Error::UpdateMissingUser | Error::DeleteMissingUser => (
                StatusCode::NOT_FOUND,
                alert_error("User not found", "The user account could not be found."),
            )
                .into_response(),
            Error::OtpMissing | Error::OtpExpired | Error::OtpMismatch => (
                StatusCode::BAD_REQUEST,
                alert_error("Could not reset password", &self.to_string()),
            )
                .into_response(),
            error => {
                tracing::error!("an error occurred while handling a request: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    alert_error("Something went wrong", "Try again later."),
                )
                    .into_response()
            }
        }
    }
}
