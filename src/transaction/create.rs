//! Transaction creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::{
    AppState, Error,
    category::{Category, get_categories},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_SELECT_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    transaction::{TransactionKind, create_transaction, parse_amount},
    user::UserId,
};

/// The form data for creating or updating a transaction.
///
/// The amount and date arrive as text and are validated by the endpoint
/// before anything touches the database.
#[derive(Debug, Deserialize)]
pub struct TransactionFormData {
    pub amount: String,
    pub kind: TransactionKind,
    pub date: String,
    pub note: Option<String>,
    pub category_id: i64,
}

pub(super) fn parse_form_date(raw: &str) -> Result<Date, Error> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidTransactionRecord(format!("\"{raw}\" is not a date")))
}

/// Treat whitespace-only notes as absent.
pub(super) fn normalize_note(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|note| !note.is_empty())
}

/// The state needed for the new transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the transaction creation page.
pub async fn get_new_transaction_page(
    State(state): State<NewTransactionPageState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories(user_id, None, &connection)?;

    Ok(new_transaction_view(&categories).into_response())
}

/// Handle transaction creation form submission.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionEndpointState>,
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

    match create_transaction(
        amount,
        form_data.kind,
        date,
        normalize_note(form_data.note.as_deref()),
        form_data.category_id,
        user_id,
        &connection,
    ) {
        Ok(_) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a transaction: {error}");

            error.into_alert_response()
        }
    }
}

fn new_transaction_view(categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE)
        {
            (transaction_form_view(
                endpoints::TRANSACTIONS_API,
                "post",
                "Create",
                None,
                categories,
            ))
        }
    };

    base("Create Transaction", &[], &content)
}

/// The shared create/edit transaction form.
///
/// `existing` pre-fills the fields when editing.
pub(super) fn transaction_form_view(
    submit_endpoint: &str,
    method: &str,
    submit_label: &str,
    existing: Option<&super::Transaction>,
    categories: &[Category],
) -> Markup {
    let amount_value = existing
        .map(|transaction| transaction.amount.to_string())
        .unwrap_or_default();
    let date_value = existing
        .map(|transaction| transaction.date.to_string())
        .unwrap_or_default();
    let note_value = existing
        .and_then(|transaction| transaction.note.as_deref())
        .unwrap_or_default();
    let kind = existing
        .map(|transaction| transaction.kind)
        .unwrap_or(TransactionKind::Expense);

    html! {
        form
            hx-post=[(method == "post").then_some(submit_endpoint)]
            hx-put=[(method == "put").then_some(submit_endpoint)]
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    step="0.01"
                    min="0"
                    value=(amount_value)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Kind" }

                select id="kind" name="kind" class=(FORM_SELECT_STYLE)
                {
                    option value="expense" selected[kind == TransactionKind::Expense] { "Expense" }
                    option value="income" selected[kind == TransactionKind::Income] { "Income" }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(date_value)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" class=(FORM_SELECT_STYLE)
                {
                    @for category in categories {
                        option
                            value=(category.id)
                            selected[existing.is_some_and(|transaction| transaction.category_id == category.id)]
                        {
                            (category.name) " (" (category.kind) ")"
                        }
                    }
                }
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input
                    id="note"
                    type="text"
                    name="note"
                    value=(note_value)
                    placeholder="Optional note"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_label) }
        }
    }
}
