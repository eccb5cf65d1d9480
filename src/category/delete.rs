//! Category deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, user::UserId};

use super::{CategoryId, delete_category};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle a request to delete a category.
///
/// On success an empty 200 response is returned, which causes htmx to swap
/// out the deleted table row.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryEndpointState>,
    Extension(user_id): Extension<UserId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_category(category_id, user_id, &connection) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::error!("Failed to delete category {category_id}: {error}");

            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        category::{Category, create_category, get_category},
        db::initialize,
        email::Email,
        password::PasswordHash,
        transaction::{TransactionKind, create_transaction},
        user::{Role, User, create_user},
    };

    use super::{DeleteCategoryEndpointState, delete_category_endpoint};

    fn get_test_state() -> (DeleteCategoryEndpointState, User, Category) {
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
        let category =
            create_category("Hobbies", TransactionKind::Expense, Some(user.id), &conn).unwrap();

        (
            DeleteCategoryEndpointState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user,
            category,
        )
    }

    #[tokio::test]
    async fn deletes_unused_category() {
        let (state, user, category) = get_test_state();

        let response =
            delete_category_endpoint(Path(category.id), State(state.clone()), Extension(user.id))
                .await;

        assert_eq!(response.status(), StatusCode::OK);

        let conn = state.db_connection.lock().unwrap();
        assert_eq!(
            get_category(category.id, user.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn refuses_to_delete_category_in_use() {
        let (state, user, category) = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            create_transaction(
                dec!(9.99),
                TransactionKind::Expense,
                date!(2024 - 05 - 01),
                None,
                category.id,
                user.id,
                &conn,
            )
            .unwrap();
        }

        let response =
            delete_category_endpoint(Path(category.id), State(state.clone()), Extension(user.id))
                .await;

        assert_ne!(response.status(), StatusCode::OK);

        let conn = state.db_connection.lock().unwrap();
        assert!(get_category(category.id, user.id, &conn).is_ok());
    }
}
