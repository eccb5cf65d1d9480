//! The JSON endpoint serving monthly summaries.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    summary::{YearMonth, summarize_month},
    transaction::{TransactionFilter, get_transactions},
    user::UserId,
};

/// The state needed to compute monthly summaries.
#[derive(Debug, Clone)]
pub struct SummaryState {
    /// The database connection for retrieving transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SummaryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A handler for `GET /api/summary/{month}` that returns the authenticated
/// user's monthly summary as JSON.
///
/// `month` must be in "YYYY-MM" form; anything else yields a 400 response.
pub async fn get_summary_endpoint(
    State(state): State<SummaryState>,
    Extension(user_id): Extension<UserId>,
    Path(month): Path<String>,
) -> Response {
    let month = match YearMonth::parse(&month) {
        Ok(month) => month,
        Err(error) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response();
        }
    };

    let transactions = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match get_transactions(
            user_id,
            &TransactionFilter {
                month: Some(month),
                ..Default::default()
            },
            &connection,
        ) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        }
    };

    Json(summarize_month(month, transactions)).into_response()
}

#[cfg(test)]
mod get_summary_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use http_body_util::BodyExt;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        category::create_category,
        db::initialize,
        email::Email,
        password::PasswordHash,
        transaction::{TransactionKind, create_transaction},
        user::{Role, User, create_user},
    };

    use super::{SummaryState, get_summary_endpoint};

    fn get_test_state() -> (SummaryState, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let user = create_user(
            "Alice",
            Email::new_unchecked("alice@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            Role::User,
            &conn,
        )
        .unwrap();

        (
            SummaryState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user,
        )
    }

    #[tokio::test]
    async fn returns_summary_for_valid_month() {
        let (state, user) = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let salary =
                create_category("Salary", TransactionKind::Income, Some(user.id), &conn).unwrap();
            create_transaction(
                dec!(1500.00),
                TransactionKind::Income,
                date!(2024 - 05 - 01),
                None,
                salary.id,
                user.id,
                &conn,
            )
            .unwrap();
        }

        let response = get_summary_endpoint(
            State(state),
            Extension(user.id),
            Path("2024-05".to_string()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["month"], "2024-05");
        assert_eq!(json["totalIncome"], "1500.00");
        assert_eq!(json["balance"], "1500.00");
        assert_eq!(json["dailySummary"].as_array().unwrap().len(), 1);
        assert_eq!(json["transactions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn returns_bad_request_for_malformed_month() {
        let (state, user) = get_test_state();

        let response = get_summary_endpoint(
            State(state),
            Extension(user.id),
            Path("not-a-month".to_string()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn excludes_other_months_and_users() {
        let (state, user) = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let food =
                create_category("Food", TransactionKind::Expense, Some(user.id), &conn).unwrap();
            create_transaction(
                dec!(10),
                TransactionKind::Expense,
                date!(2024 - 04 - 30),
                None,
                food.id,
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
            let bobs_food =
                create_category("Food", TransactionKind::Expense, Some(other_user.id), &conn)
                    .unwrap();
            create_transaction(
                dec!(99),
                TransactionKind::Expense,
                date!(2024 - 05 - 01),
                None,
                bobs_food.id,
                other_user.id,
                &conn,
            )
            .unwrap();
        }

        let response = get_summary_endpoint(
            State(state),
            Extension(user.id),
            Path("2024-05".to_string()),
        )
        .await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["totalExpense"], "0");
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }
}
