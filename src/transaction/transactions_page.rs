//! The page listing and filtering the user's transactions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    category::{Category, CategoryId, get_categories},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_SELECT_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    navigation::NavBar,
    summary::YearMonth,
    user::UserId,
};

use super::{Transaction, TransactionFilter, TransactionKind, get_transactions};

/// The query parameters accepted by the transactions page.
///
/// Empty strings are treated as absent so that a submitted filter form with
/// untouched fields does not over-filter.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    month: Option<String>,
    kind: Option<String>,
    category: Option<CategoryId>,
    search: Option<String>,
}

impl TransactionsQuery {
    fn into_filter(self) -> Result<TransactionFilter, Error> {
        let month = match self.month.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(raw) => Some(YearMonth::parse(raw)?),
        };

        // An unrecognised kind in the query string is ignored rather than
        // rejected, the filter form only produces the two known values.
        let kind = self
            .kind
            .as_deref()
            .map(str::trim)
            .and_then(TransactionKind::from_str);

        let search = self
            .search
            .map(|search| search.trim().to_string())
            .filter(|search| !search.is_empty());

        Ok(TransactionFilter {
            month,
            kind,
            category_id: self.category,
            search,
        })
    }
}

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page listing the user's transactions, optionally filtered by
/// month, kind, category, or note text.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let filter = query.into_filter()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = get_transactions(user_id, &filter, &connection)?;
    let categories = get_categories(user_id, None, &connection)?;

    Ok(transactions_view(&transactions, &categories, &filter).into_response())
}

fn transactions_view(
    transactions: &[Transaction],
    categories: &[Category],
    filter: &TransactionFilter,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let category_names: HashMap<CategoryId, &str> = categories
        .iter()
        .map(|category| (category.id, category.name.as_str()))
        .collect();

    let content = html! {
        (nav_bar)
        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="flex items-center justify-between"
            {
                h1 class="text-xl font-bold text-gray-900 dark:text-white" { "Transactions" }

                a
                    href=(endpoints::NEW_TRANSACTION_VIEW)
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "Create Transaction"
                }
            }

            (filter_form_view(categories, filter))

            @if transactions.is_empty() {
                p class="text-gray-500 dark:text-gray-400"
                {
                    "No transactions match the current filters."
                }
            } @else {
                table class="w-full text-left text-sm"
                {
                    thead
                    {
                        tr
                        {
                            th class=(TABLE_HEADER_STYLE) { "Date" }
                            th class=(TABLE_HEADER_STYLE) { "Amount" }
                            th class=(TABLE_HEADER_STYLE) { "Kind" }
                            th class=(TABLE_HEADER_STYLE) { "Category" }
                            th class=(TABLE_HEADER_STYLE) { "Note" }
                            th class=(TABLE_HEADER_STYLE) { "" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            (transaction_row_view(transaction, &category_names))
                        }
                    }
                }
            }
        }
    };

    base("Transactions", &[], &content)
}

fn filter_form_view(categories: &[Category], filter: &TransactionFilter) -> Markup {
    let month_value = filter
        .month
        .map(|month| month.to_string())
        .unwrap_or_default();
    let search_value = filter.search.clone().unwrap_or_default();

    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="flex flex-wrap items-end gap-2"
        {
            input
                type="month"
                name="month"
                value=(month_value)
                class=(FORM_TEXT_INPUT_STYLE);

            select name="kind" class=(FORM_SELECT_STYLE)
            {
                option value="" { "All kinds" }
                option value="income" selected[filter.kind == Some(TransactionKind::Income)] {
                    "Income"
                }
                option value="expense" selected[filter.kind == Some(TransactionKind::Expense)] {
                    "Expense"
                }
            }

            select name="category" class=(FORM_SELECT_STYLE)
            {
                option value="" { "All categories" }
                @for category in categories {
                    option
                        value=(category.id)
                        selected[filter.category_id == Some(category.id)]
                    {
                        (category.name)
                    }
                }
            }

            input
                type="text"
                name="search"
                value=(search_value)
                placeholder="Search notes"
                class=(FORM_TEXT_INPUT_STYLE);

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }
        }
    }
}

fn transaction_row_view(
    transaction: &Transaction,
    category_names: &HashMap<CategoryId, &str>,
) -> Markup {
    let edit_endpoint =
        endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let delete_endpoint = endpoints::format_endpoint(endpoints::TRANSACTION, transaction.id);
    let amount_style = match transaction.kind {
        TransactionKind::Income => "text-green-600 dark:text-green-400",
        TransactionKind::Expense => "text-red-600 dark:text-red-400",
    };

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (transaction.date) }
            td class={ (TABLE_CELL_STYLE) " " (amount_style) }
            {
                (format_currency(transaction.amount))
            }
            td class=(TABLE_CELL_STYLE) { (transaction.kind) }
            td class=(TABLE_CELL_STYLE)
            {
                (category_names.get(&transaction.category_id).copied().unwrap_or("—"))
            }
            td class=(TABLE_CELL_STYLE) { (transaction.note.as_deref().unwrap_or("")) }
            td class=(TABLE_CELL_STYLE)
            {
                a
                    href=(edit_endpoint)
                    class="font-medium text-blue-600 hover:underline dark:text-blue-500"
                {
                    "Edit"
                }

                " "

                button
                    hx-delete=(delete_endpoint)
                    hx-target="closest tr"
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                    hx-confirm="Delete this transaction?"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }
        }
    }
}

#[cfg(test)]
mod transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
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

    use super::{TransactionsPageState, TransactionsQuery, get_transactions_page};

    fn get_test_state() -> (TransactionsPageState, User) {
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
            TransactionsPageState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user,
        )
    }

    async fn page_text(
        state: TransactionsPageState,
        user: &User,
        query: TransactionsQuery,
    ) -> String {
        let response = get_transactions_page(State(state), Extension(user.id), Query(query))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn shows_transactions_with_category_names() {
        let (state, user) = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let category =
                create_category("Food", TransactionKind::Expense, Some(user.id), &conn).unwrap();
            create_transaction(
                dec!(20.50),
                TransactionKind::Expense,
                date!(2024 - 05 - 02),
                Some("groceries"),
                category.id,
                user.id,
                &conn,
            )
            .unwrap();
        }

        let text = page_text(state, &user, TransactionsQuery::default()).await;

        assert!(text.contains("groceries"));
        assert!(text.contains("Food"));
        assert!(text.contains("2024-05-02"));
    }

    #[tokio::test]
    async fn month_filter_hides_other_months() {
        let (state, user) = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            let category =
                create_category("Food", TransactionKind::Expense, Some(user.id), &conn).unwrap();
            for (day_note, date) in [
                ("may purchase", date!(2024 - 05 - 02)),
                ("june purchase", date!(2024 - 06 - 02)),
            ] {
                create_transaction(
                    dec!(5),
                    TransactionKind::Expense,
                    date,
                    Some(day_note),
                    category.id,
                    user.id,
                    &conn,
                )
                .unwrap();
            }
        }

        let text = page_text(
            state,
            &user,
            TransactionsQuery {
                month: Some("2024-05".to_string()),
                ..Default::default()
            },
        )
        .await;

        assert!(text.contains("may purchase"));
        assert!(!text.contains("june purchase"));
    }

    #[tokio::test]
    async fn malformed_month_is_an_error() {
        let (state, user) = get_test_state();

        let result = get_transactions_page(
            State(state),
            Extension(user.id),
            Query(TransactionsQuery {
                month: Some("never".to_string()),
                ..Default::default()
            }),
        )
        .await;

        assert!(result.is_err());
    }
}
