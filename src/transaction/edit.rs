//! Transaction editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{Category, get_categories},
    endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    transaction::{Transaction, get_transaction, parse_amount, update_transaction},
    user::UserId,
};

use super::{
    TransactionId,
    create::{TransactionFormData, normalize_note, parse_form_date, transaction_form_view},
};

/// The state needed for the edit transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the transaction editing page.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionPageState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, user_id, &connection)?;
    let categories = get_categories(user_id, None, &connection)?;

    Ok(edit_transaction_view(&transaction, &categories).into_response())
}

/// Handle transaction update form submission.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<UpdateTransactionEndpointState>,
    Extension(user_id): Extension<UserId>,
    Form(form_data): Form<TransactionFormData>,
) -> Response {
    let amount = match parse_amount(&form_data.amount) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let date = match parse_form_date(&form_data.date) {
        Ok(date) => date,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_transaction(
        transaction_id,
        amount,
        form_data.kind,
        date,
        normalize_note(form_data.note.as_deref()),
        form_data.category_id,
        user_id,
        &connection,
    ) {
        Ok(()) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update transaction {transaction_id}: {error}");

            error.into_alert_response()
        }
    }
}

fn edit_transaction_view(transaction: &Transaction, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let update_endpoint = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            (transaction_form_view(
                &update_endpoint,
                "put",
                "Save",
                Some(transaction),
                categories,
            ))
        }
    };

    base("Edit Transaction", &[], &content)
}

#[cfg(test)]
mod update_transaction_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        category::create_category,
        db::initialize,
        email::Email,
        password::PasswordHash,
        transaction::{Transaction, TransactionKind, create_transaction, get_transaction},
        user::{Role, User, create_user},
    };

    use super::{TransactionFormData, UpdateTransactionEndpointState, update_transaction_endpoint};

    fn get_test_state() -> (UpdateTransactionEndpointState, User, Transaction) {
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
            create_category("Food", TransactionKind::Expense, Some(user.id), &conn).unwrap();
        let transaction = create_transaction(
            dec!(20.50),
            TransactionKind::Expense,
            date!(2024 - 05 - 02),
            Some("groceries"),
            category.id,
            user.id,
            &conn,
        )
        .unwrap();

        (
            UpdateTransactionEndpointState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user,
            transaction,
        )
    }

    #[tokio::test]
    async fn updates_transaction_and_redirects() {
        let (state, user, transaction) = get_test_state();

        let response = update_transaction_endpoint(
            Path(transaction.id),
            State(state.clone()),
            Extension(user.id),
            Form(TransactionFormData {
                amount: "25.00".to_string(),
                kind: TransactionKind::Expense,
                date: "2024-05-03".to_string(),
                note: Some("groceries and snacks".to_string()),
                category_id: transaction.category_id,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let updated = get_transaction(transaction.id, user.id, &conn).unwrap();
        assert_eq!(updated.amount, dec!(25.00));
        assert_eq!(updated.date, date!(2024 - 05 - 03));
        assert_eq!(updated.note.as_deref(), Some("groceries and snacks"));
    }

    #[tokio::test]
    async fn rejects_update_from_non_owner() {
        let (state, _, transaction) = get_test_state();

        let other_user = {
            let conn = state.db_connection.lock().unwrap();
            create_user(
                "Bob",
                Email::new_unchecked("bob@example.com"),
                PasswordHash::new_unchecked("hunter3"),
                Role::User,
                &conn,
            )
            .unwrap()
        };

        let response = update_transaction_endpoint(
            Path(transaction.id),
            State(state.clone()),
            Extension(other_user.id),
            Form(TransactionFormData {
                amount: "1.00".to_string(),
                kind: TransactionKind::Expense,
                date: "2024-05-03".to_string(),
                note: None,
                category_id: transaction.category_id,
            }),
        )
        .await;

        assert_ne!(response.status(), StatusCode::SEE_OTHER);
    }
}
