//! Category editing page and endpoint.

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
    AppState, Error, endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    transaction::TransactionKind,
    user::UserId,
};

use super::{
    CategoryId,
    create::{CategoryFormData, kind_select_view},
    get_category, update_category,
};

/// The state needed for the edit category page.
#[derive(Debug, Clone)]
pub struct EditCategoryPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a category.
#[derive(Debug, Clone)]
pub struct UpdateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryPageState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let update_endpoint = endpoints::format_endpoint(endpoints::CATEGORY, category_id);

    match get_category(category_id, user_id, &connection) {
        Ok(category) => Ok(edit_category_view(
            &update_endpoint,
            &category.name,
            category.kind,
            "",
        )
        .into_response()),
        Err(Error::NotFound) => Err(Error::NotFound),
        Err(error) => {
            tracing::error!("Failed to retrieve category {category_id}: {error}");

            Ok(edit_category_view(
                &update_endpoint,
                "",
                TransactionKind::Expense,
                "Failed to load category",
            )
            .into_response())
        }
    }
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<UpdateCategoryEndpointState>,
    Extension(user_id): Extension<UserId>,
    Form(form_data): Form<CategoryFormData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_category(
        category_id,
        &form_data.name,
        form_data.kind,
        user_id,
        &connection,
    ) {
        Ok(()) => (
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Failed to update category {category_id}: {error}");

            error.into_alert_response()
        }
    }
}

fn edit_category_view(
    update_endpoint: &str,
    name: &str,
    kind: TransactionKind,
    error_message: &str,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let form = html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="name"
                    class=(FORM_LABEL_STYLE)
                {
                    "Category Name"
                }

                input
                    id="name"
                    type="text"
                    name="name"
                    value=(name)
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            (kind_select_view(kind))

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400"
                {
                    (error_message)
                }
            }

            button
                type="submit"
                class=(BUTTON_PRIMARY_STYLE)
            {
                "Save"
            }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Category", &[], &content)
}

#[cfg(test)]
mod update_category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        category::{Category, create_category, get_category},
        db::initialize,
        email::Email,
        password::PasswordHash,
        transaction::TransactionKind,
        user::{Role, User, create_user},
    };

    use super::{CategoryFormData, UpdateCategoryEndpointState, update_category_endpoint};

    fn get_test_state() -> (UpdateCategoryEndpointState, User, Category) {
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
            UpdateCategoryEndpointState {
                db_connection: Arc::new(Mutex::new(conn)),
            },
            user,
            category,
        )
    }

    #[tokio::test]
    async fn updates_category_and_redirects() {
        let (state, user, category) = get_test_state();

        let response = update_category_endpoint(
            Path(category.id),
            State(state.clone()),
            Extension(user.id),
            Form(CategoryFormData {
                name: "Games".to_string(),
                kind: TransactionKind::Expense,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let conn = state.db_connection.lock().unwrap();
        let updated = get_category(category.id, user.id, &conn).unwrap();
        assert_eq!(updated.name, "Games");
    }

    #[tokio::test]
    async fn rejects_update_of_unowned_category() {
        let (state, _, category) = get_test_state();

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

        let response = update_category_endpoint(
            Path(category.id),
            State(state),
            Extension(other_user.id),
            Form(CategoryFormData {
                name: "Hijacked".to_string(),
                kind: TransactionKind::Expense,
            }),
        )
        .await;

        assert_ne!(response.status(), StatusCode::SEE_OTHER);
    }
}
